// The client-side Dioxus application logic.

use dioxus::prelude::*;

mod app_state;
pub mod compat;
mod components;
pub mod scanner;
mod screens;

use api::prefs::scanner_prefs::ScannerPrefs;
use app_state::AppState;
use components::pico::Container;
use screens::my_code::MyCodeScreen;
use screens::reset_password::ResetPasswordScreen;
use screens::scan::ScanScreen;

const PICO_CSS: &str = "https://cdn.jsdelivr.net/npm/@picocss/pico@2/css/pico.cyan.min.css";

/// Enum to represent the different screens in our application.
#[derive(Clone, Copy, PartialEq, Default)]
enum Screen {
    #[default]
    Scan,
    MyCode,
    ResetPassword,
}

impl Screen {
    fn name(&self) -> &'static str {
        match self {
            Screen::Scan => "Scan",
            Screen::MyCode => "My Code",
            Screen::ResetPassword => "Reset Password",
        }
    }
}

const ALL_SCREENS: [Screen; 3] = [Screen::Scan, Screen::MyCode, Screen::ResetPassword];

#[component]
fn Tabs(mut active_screen: Signal<Screen>) -> Element {
    rsx! {
        nav {
            class: "tab-menu",
            ul {
                li { strong { "Acetrack" } }
            }
            ul {
                for screen in ALL_SCREENS {
                    li {
                        a {
                            href: "#",
                            class: if active_screen() == screen { "active-tab" } else { "" },
                            "aria-current": if active_screen() == screen { "page" } else { "false" },
                            onclick: move |event| {
                                event.prevent_default();
                                active_screen.set(screen);
                            },
                            "{screen.name()}"
                        }
                    }
                }
            }
        }
    }
}

//=============================================================================
// MAIN APPLICATION COMPONENT (Client-side)
//=============================================================================

#[allow(non_snake_case)]
pub fn App() -> Element {
    let layout_css = r#"
    * { box-sizing: border-box; }

    .app-main-container {
        min-height: 100vh;
        padding: 10px;
        background-color: var(--pico-background-color);
    }

    .app-main-container header {
        padding: 0 1rem;
        --pico-nav-element-spacing-vertical: 0.5rem;
    }

    .tab-menu a.active-tab {
        color: var(--pico-primary) !important;
        border-bottom: 3px solid var(--pico-primary);
        text-decoration: none;
    }

    .tab-menu a:not(.active-tab) {
        color: var(--pico-muted-color);
        border-bottom: 3px solid transparent;
    }

    .app-main-container .content {
        padding: 0 1rem;
    }
"#;

    rsx! {
        document::Meta {
            name: "viewport",
            content: "width=device-width, initial-scale=1.0",
        }
        document::Stylesheet { href: PICO_CSS }
        style { "{layout_css}" }
        AppBody {}
    }
}

#[component]
fn AppBody() -> Element {
    // this will be processed on server before initial page is delivered.
    let prefs_future = use_server_future(move || async move { api::get_scanner_prefs().await })?;

    let body = match &*prefs_future.read() {
        Some(Ok(prefs)) => {
            dioxus_logger::tracing::info!("scanner prefs: {:?}", prefs);
            rsx! {
                LoadedApp { scanner_prefs: prefs.clone() }
            }
        }
        Some(Err(e)) => rsx! {
            p { "An error occurred: {e}" }
        },
        None => rsx! {
            p { "aria-busy": "true", "Loading..." }
        },
    };
    body
}

/// Holds the main app logic and only runs when the prefs are loaded.
#[component]
fn LoadedApp(scanner_prefs: ScannerPrefs) -> Element {
    use_context_provider(|| AppState::new(scanner_prefs.clone()));
    let active_screen = use_signal(Screen::default);

    rsx! {
        div {
            class: "app-main-container",
            Container {
                header {
                    Tabs { active_screen }
                }
                div {
                    class: "content",
                    match active_screen() {
                        Screen::Scan => rsx! { ScanScreen {} },
                        Screen::MyCode => rsx! { MyCodeScreen {} },
                        Screen::ResetPassword => rsx! { ResetPasswordScreen {} },
                    }
                }
            }
        }
    }
}
