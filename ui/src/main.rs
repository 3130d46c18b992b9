#![allow(non_snake_case)]

use dioxus::prelude::*;

mod api;
mod clock;
mod services;
mod state;
mod storage;
mod views;
mod watch;

use state::{BACKEND, CONNECTED, DARK_MODE, PROFILE};
use views::ad_list::AdList;
use views::ad_modal::AdModal;
use views::format_tokens;
use views::toast::ToastView;

fn main() {
    dioxus::logger::initialize_default();
    launch(App);
}

#[component]
fn App() -> Element {
    use_effect(|| {
        services::init();
    });
    use_drop(watch::ticker::teardown);

    let connected = *CONNECTED.read();
    let dark = *DARK_MODE.read();
    let backend = *BACKEND.read();
    let balance = PROFILE
        .read()
        .as_ref()
        .map(|p| format_tokens(p.balance()))
        .unwrap_or_else(|| "0".to_string());

    let shell_class = if dark { "app-shell dark" } else { "app-shell" };
    let status_class = if connected {
        "status-indicator connected"
    } else {
        "status-indicator disconnected"
    };
    let status_text = if connected { "Online" } else { "Offline" };

    rsx! {
        document::Stylesheet { href: asset!("/assets/main.css") }

        div { class: "{shell_class}",
            // Header
            header { class: "app-header",
                h1 { class: "app-title", "AdView" }

                div { class: "header-controls",
                    span { class: "balance", title: "Token balance", "{balance} tokens" }

                    button {
                        class: "theme-btn",
                        title: "Toggle dark mode",
                        onclick: move |_| services::toggle_dark_mode(),
                        if dark { "Light" } else { "Dark" }
                    }

                    // Connection status
                    div { class: "{status_class}", title: "Backend: {backend}",
                        span { class: "status-dot" }
                        span { class: "status-text", "{status_text}" }
                    }
                }
            }

            AdList {}
            AdModal {}
            ToastView {}
        }
    }
}
