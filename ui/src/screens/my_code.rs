// File: src/screens/my_code.rs

use api::student::StudentProfile;
use dioxus::prelude::*;

use crate::components::identity_qr::IdentityQr;
use crate::components::pico::{Button, Card};

/// Shows the QR code a student presents at the scanner.
#[component]
pub fn MyCodeScreen() -> Element {
    let mut student_number = use_signal(String::new);
    let mut profile = use_signal(|| None::<StudentProfile>);
    let mut error = use_signal(|| None::<String>);
    let mut is_loading = use_signal(|| false);

    let lookup = move |_: MouseEvent| {
        let number = student_number.read().trim().to_string();
        if number.is_empty() {
            error.set(Some("Enter your student number.".to_string()));
            return;
        }
        spawn(async move {
            is_loading.set(true);
            error.set(None);
            match api::student_profile(number.clone()).await {
                Ok(Some(found)) => profile.set(Some(found)),
                Ok(None) => {
                    profile.set(None);
                    error.set(Some(format!("No student profile found for {number}.")));
                }
                Err(e) => {
                    dioxus_logger::tracing::warn!("profile lookup failed: {e}");
                    profile.set(None);
                    error.set(Some("Could not load your profile. Please try again.".to_string()));
                }
            }
            is_loading.set(false);
        });
    };

    rsx! {
        Card {
            h2 { "My QR Code" }

            if let Some(student) = profile() {
                div {
                    style: "text-align: center;",
                    IdentityQr {
                        payload: student.qr_payload(),
                        caption: format!("{} · {}", student.full_name(), student.student_id),
                    }
                    if !student.course.is_empty() {
                        p { style: "margin-top: 1rem;", "{student.course} {student.year_level}" }
                    }
                }
            } else {
                label {
                    "Student number"
                    input {
                        r#type: "text",
                        placeholder: "e.g. 2021-00123",
                        value: "{student_number}",
                        oninput: move |evt| student_number.set(evt.value()),
                    }
                }
                Button {
                    busy: is_loading(),
                    on_click: lookup,
                    "Show my code"
                }
            }

            if let Some(message) = error() {
                p { style: "color: var(--pico-del-color);", "{message}" }
            }
        }
    }
}
