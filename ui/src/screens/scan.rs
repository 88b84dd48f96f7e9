// File: src/screens/scan.rs

use api::attendance::{Event, ScanType};
use api::civil_time;
use dioxus::prelude::*;
use strum::IntoEnumIterator;

use crate::components::pico::{Button, ButtonType, Card, Grid};
use crate::components::scanner_panel::ScannerPanel;

fn event_label(event: &Event) -> String {
    match event.starts_at {
        Some(starts_at) => format!("{} ({})", event.title, civil_time::format_regional(&starts_at)),
        None => event.title.clone(),
    }
}

#[component]
pub fn ScanScreen() -> Element {
    let mut events = use_resource(move || async move { api::active_events().await });
    let mut event_id = use_signal(|| None::<i64>);
    let mut scan_type = use_signal(ScanType::default);

    let event_picker = match &*events.read() {
        None => rsx! {
            p { "aria-busy": "true", "Loading events…" }
        },
        Some(Err(e)) => rsx! {
            p { style: "color: var(--pico-del-color);", "Could not load events: {e}" }
            Button {
                button_type: ButtonType::Secondary,
                outline: true,
                on_click: move |_| events.restart(),
                "Retry"
            }
        },
        Some(Ok(list)) if list.is_empty() => rsx! {
            p { "There are no active events." }
        },
        Some(Ok(list)) => {
            let selected = event_id();
            rsx! {
                label {
                    "Event"
                    select {
                        aria_label: "Select event",
                        onchange: move |evt| event_id.set(evt.value().parse().ok()),
                        option { value: "", selected: selected.is_none(), "Select an event…" }
                        for event in list.iter() {
                            option {
                                key: "{event.id}",
                                value: "{event.id}",
                                selected: selected == Some(event.id),
                                "{event_label(event)}"
                            }
                        }
                    }
                }
            }
        }
    };

    rsx! {
        Card {
            h2 { "Scan Attendance" }
            Grid {
                div { {event_picker} }
                fieldset {
                    legend { "Scan type" }
                    for kind in ScanType::iter() {
                        label {
                            key: "{kind.column()}",
                            input {
                                r#type: "radio",
                                name: "scan-type",
                                checked: scan_type() == kind,
                                onchange: move |_| scan_type.set(kind),
                            }
                            "{kind}"
                        }
                    }
                }
            }
            ScannerPanel { event_id, scan_type }
        }
    }
}
