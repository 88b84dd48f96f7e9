//=============================================================================
// File: src/components/identity_qr.rs
//=============================================================================
use dioxus::prelude::*;
use qrcode::render::svg;
use qrcode::{EcLevel, QrCode};

#[derive(Props, Clone, PartialEq)]
pub struct IdentityQrProps {
    /// JSON identity payload, encoded as-is.
    pub payload: String,
    #[props(optional)]
    pub caption: Option<String>,
}

/// Renders a student's identity payload as a single QR symbol.
///
/// The payload is JSON, so unlike address codes it is never upper-cased.
#[allow(non_snake_case)]
pub fn IdentityQr(props: IdentityQrProps) -> Element {
    match QrCode::with_error_correction_level(props.payload.as_bytes(), EcLevel::M) {
        Ok(code) => {
            let image = code
                .render::<svg::Color>()
                .min_dimensions(240, 240)
                .quiet_zone(true)
                .build();

            rsx! {
                figure {
                    style: "margin: 0 auto; max-width: 320px; background: white; padding: 8px; border-radius: var(--pico-border-radius);",
                    div { dangerous_inner_html: "{image}" }
                    if let Some(caption) = &props.caption {
                        figcaption {
                            style: "text-align: center; font-size: 14px; margin-top: 8px; color: #333;",
                            "{caption}"
                        }
                    }
                }
            }
        }
        Err(e) => rsx! {
            p {
                style: "color: var(--pico-del-color); border: 1px solid currentColor; padding: 10px; border-radius: 5px;",
                "Could not generate your QR code: {e}"
            }
        },
    }
}
