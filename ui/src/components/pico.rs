//! Small Dioxus wrappers over Pico.css markup.

#![allow(non_snake_case)] // Allow PascalCase for component function names

use dioxus::prelude::*;

/// Wraps content in a `<main class="container">` element.
#[component]
pub fn Container(children: Element) -> Element {
    rsx! { main { class: "container", {children} } }
}

/// Lays children out side by side, stacking on narrow screens.
#[component]
pub fn Grid(children: Element) -> Element {
    rsx! { div { class: "grid", {children} } }
}

#[component]
pub fn Card(children: Element) -> Element {
    rsx! { article { {children} } }
}

#[derive(PartialEq, Clone, Copy, Default)]
pub enum ButtonType {
    #[default]
    Primary,
    Secondary,
    Contrast,
}

impl ButtonType {
    fn class(&self, outline: bool) -> &'static str {
        match (self, outline) {
            (Self::Primary, false) => "",
            (Self::Primary, true) => "outline",
            (Self::Secondary, false) => "secondary",
            (Self::Secondary, true) => "secondary outline",
            (Self::Contrast, false) => "contrast",
            (Self::Contrast, true) => "contrast outline",
        }
    }
}

#[derive(Props, PartialEq, Clone)]
pub struct ButtonProps {
    children: Element,
    #[props(optional)]
    on_click: Option<EventHandler<MouseEvent>>,
    #[props(default)]
    button_type: ButtonType,
    #[props(default = false)]
    outline: bool,
    #[props(default = false)]
    disabled: bool,
    /// Shows Pico's spinner and disables the button.
    #[props(default = false)]
    busy: bool,
}

pub fn Button(props: ButtonProps) -> Element {
    rsx! {
        button {
            class: props.button_type.class(props.outline),
            disabled: props.disabled || props.busy,
            "aria-busy": props.busy,
            onclick: move |evt| {
                if let Some(handler) = &props.on_click {
                    handler.call(evt);
                }
            },
            {props.children}
        }
    }
}
