// File: src/screens/reset_password.rs

use dioxus::prelude::*;

use crate::components::pico::{Button, Card};

#[component]
pub fn ResetPasswordScreen() -> Element {
    let mut email = use_signal(String::new);
    let mut outcome = use_signal(|| None::<Result<(), String>>);
    let mut is_sending = use_signal(|| false);

    rsx! {
        Card {
            h2 { "Reset Password" }
            p { "We will email you a link to choose a new password." }
            label {
                "Email"
                input {
                    r#type: "email",
                    value: "{email}",
                    oninput: move |evt| email.set(evt.value()),
                }
            }
            Button {
                busy: is_sending(),
                disabled: email.read().trim().is_empty(),
                on_click: move |_| {
                    let address = email.read().clone();
                    spawn(async move {
                        is_sending.set(true);
                        let result = api::request_password_reset(address).await;
                        outcome.set(Some(result.map_err(|e| e.to_string())));
                        is_sending.set(false);
                    });
                },
                "Send reset link"
            }
            match outcome() {
                Some(Ok(())) => rsx! {
                    p { style: "color: var(--pico-ins-color);", "Check your inbox for the reset link." }
                },
                Some(Err(message)) => rsx! {
                    p { style: "color: var(--pico-del-color);", "{message}" }
                },
                None => rsx! {},
            }
        }
    }
}
