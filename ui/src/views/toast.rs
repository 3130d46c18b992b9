#![allow(non_snake_case)]

use dioxus::prelude::*;

use crate::state::{ToastKind, TOAST};

#[component]
pub fn ToastView() -> Element {
    let toast = TOAST.read().clone();
    let Some(toast) = toast else {
        return rsx! {};
    };
    let class = match toast.kind {
        ToastKind::Success => "toast success",
        ToastKind::Error => "toast error",
        ToastKind::Info => "toast info",
    };

    rsx! {
        div {
            class: "{class}",
            role: "status",
            onclick: move |_| *TOAST.write() = None,
            "{toast.message}"
        }
    }
}
