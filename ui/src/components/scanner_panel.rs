//=============================================================================
// File: src/components/scanner_panel.rs
//=============================================================================
use api::attendance::{AttendanceRecord, ScanType};
use api::civil_time;
use api::identity::ScannedIdentity;
use dioxus::prelude::*;

use crate::app_state::AppState;
use crate::components::pico::{Button, ButtonType, Card};
use crate::scanner::capture::CaptureLoop;
use crate::scanner::decoder::QrDecoder;
use crate::scanner::driver::{ApiRecorder, ScanAction, ScanDriver};
use crate::scanner::platform_camera::PlatformCamera;
use crate::scanner::session::{Notice, Phase, ScanSession};

const VIDEO_ID: &str = "scanner-video";
const CANVAS_ID: &str = "scanner-canvas";

/// The camera view plus everything the operator needs to act on a scan.
///
/// `event_id` and `scan_type` are owned by the parent; changes are forwarded
/// to the running session.
#[component]
pub fn ScannerPanel(event_id: Signal<Option<i64>>, scan_type: Signal<ScanType>) -> Element {
    let prefs = use_context::<AppState>().scanner_prefs.clone();
    let mut view = use_signal(ScanSession::new);

    let scanner = use_coroutine(move |rx: UnboundedReceiver<ScanAction>| {
        let prefs = prefs.clone();
        async move {
            let capture = CaptureLoop::new(PlatformCamera::new(VIDEO_ID, CANVAS_ID), QrDecoder, prefs);
            ScanDriver::new(capture, ApiRecorder)
                .run(rx, move |session| view.set(session.clone()))
                .await;
        }
    });

    use_effect(move || scanner.send(ScanAction::SelectEvent(event_id())));
    use_effect(move || scanner.send(ScanAction::SetScanType(scan_type())));

    let session = view.read().clone();
    let phase = session.phase();

    rsx! {
        div {
            style: "display: flex; flex-direction: column; gap: 1rem; max-width: 500px; margin: auto; width: 100%;",

            div {
                hidden: !phase.is_capturing(),
                style: "position: relative; width: 100%; border-radius: var(--pico-border-radius); overflow: hidden; border: 1px solid var(--pico-form-element-border-color);",
                video {
                    id: VIDEO_ID,
                    style: "width: 100%; display: block;",
                    autoplay: true,
                    playsinline: true,
                    muted: true,
                }
                canvas { id: CANVAS_ID, style: "display: none;" }
            }

            NoticeBanner {
                notice: session.notice().cloned(),
                on_scan_another: move |_| scanner.send(ScanAction::ScanAnother),
            }

            if let (Phase::Confirming, Some(identity)) = (phase, session.pending()) {
                ConfirmCard {
                    identity: identity.clone(),
                    scan_type: session.scan_type(),
                    on_approve: move |_| scanner.send(ScanAction::Approve),
                    on_cancel: move |_| scanner.send(ScanAction::Cancel),
                }
            }

            match phase {
                Phase::Capturing => rsx! {
                    Button {
                        button_type: ButtonType::Secondary,
                        on_click: move |_| scanner.send(ScanAction::Stop),
                        "Stop Scanning"
                    }
                },
                Phase::Idle | Phase::Error => rsx! {
                    Button {
                        disabled: event_id().is_none(),
                        on_click: move |_| scanner.send(ScanAction::Start),
                        "Start Scanning"
                    }
                },
                Phase::Recording => rsx! {
                    Button { busy: true, "Recording…" }
                },
                Phase::Detected | Phase::Confirming => rsx! {},
            }
        }
    }
}

#[component]
fn NoticeBanner(notice: Option<Notice>, on_scan_another: EventHandler<()>) -> Element {
    match notice {
        None => rsx! {},
        Some(Notice::Status(text)) => rsx! {
            p { "aria-busy": text.ends_with('…'), "{text}" }
        },
        Some(Notice::Error(text)) => rsx! {
            p { style: "color: var(--pico-del-color);", "{text}" }
        },
        Some(Notice::Success(text)) => rsx! {
            p { style: "color: var(--pico-ins-color);", "{text}" }
        },
        Some(Notice::Duplicate { record, scan_type }) => rsx! {
            DuplicateCard { record, scan_type, on_scan_another }
        },
    }
}

#[component]
fn ConfirmCard(
    identity: ScannedIdentity,
    scan_type: ScanType,
    on_approve: EventHandler<()>,
    on_cancel: EventHandler<()>,
) -> Element {
    let details = [identity.course(), identity.year_level()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" · ");

    rsx! {
        Card {
            header { strong { "Confirm {scan_type}" } }
            div {
                style: "display: flex; gap: 1rem; align-items: center;",
                if let Some(url) = identity.avatar_url() {
                    img {
                        src: "{url}",
                        alt: "",
                        style: "width: 64px; height: 64px; object-fit: cover; border-radius: 50%;",
                    }
                }
                div {
                    p { style: "margin: 0;", strong { "{identity.full_name()}" } }
                    p { style: "margin: 0;", "Student no. {identity.student_number()}" }
                    if !details.is_empty() {
                        p { style: "margin: 0;", small { "{details}" } }
                    }
                }
            }
            footer {
                style: "display: flex; gap: 0.75rem; justify-content: flex-end;",
                Button {
                    button_type: ButtonType::Secondary,
                    outline: true,
                    on_click: move |_| on_cancel.call(()),
                    "Cancel"
                }
                Button {
                    on_click: move |_| on_approve.call(()),
                    "Record {scan_type}"
                }
            }
        }
    }
}

#[component]
fn DuplicateCard(
    record: AttendanceRecord,
    scan_type: ScanType,
    on_scan_another: EventHandler<()>,
) -> Element {
    let shown = |t: Option<chrono::NaiveDateTime>| {
        t.map(|t| civil_time::format_regional(&t))
            .unwrap_or_else(|| "Not recorded".to_string())
    };
    let time_in = shown(record.time_in);
    let time_out = shown(record.time_out);

    rsx! {
        Card {
            header {
                strong { style: "color: var(--pico-del-color);", "Already recorded" }
            }
            p { "{record.full_name()} already has a {scan_type} for this event." }
            dl {
                dt { "Time in" }
                dd { "{time_in}" }
                dt { "Time out" }
                dd { "{time_out}" }
            }
            footer {
                Button {
                    on_click: move |_| on_scan_another.call(()),
                    "Scan Another"
                }
            }
        }
    }
}
