#![allow(non_snake_case)]

use adview_core::timer::WatchState;
use adview_core::types::AdType;
use dioxus::prelude::*;

use super::format_tokens;
use crate::state::{ADS, CLAIMING, WATCH};

#[component]
pub fn AdModal() -> Element {
    let watch = WATCH.read().clone();
    let Some(watch) = watch else {
        return rsx! {};
    };
    let ads = ADS.read();
    let Some(ad) = watch
        .selected_ad_id
        .as_ref()
        .and_then(|id| ads.iter().find(|a| &a.id == id))
        .cloned()
    else {
        return rsx! {};
    };
    drop(ads);

    let claiming = *CLAIMING.read();
    let reward = format_tokens(ad.reward_per_view);
    let progress = format!("{:.1}", watch.progress_percent);
    let remaining = watch.remaining_secs;

    rsx! {
        div {
            class: "modal-overlay",
            tabindex: "0",
            onmounted: move |e| async move {
                if let Err(err) = e.set_focus(true).await {
                    tracing::debug!("Could not focus ad modal: {:?}", err);
                }
            },
            onkeydown: move |e: KeyboardEvent| {
                crate::watch::handle_key(&e.key().to_string());
            },

            div { class: "ad-modal",
                div { class: "ad-modal-header",
                    button {
                        class: "nav-btn",
                        title: "Previous ad (ArrowUp)",
                        onclick: move |_| crate::watch::previous(),
                        "\u{2191}"
                    }
                    h2 { class: "ad-modal-title", "{ad.title}" }
                    button {
                        class: "nav-btn",
                        title: "Next ad (ArrowDown)",
                        onclick: move |_| crate::watch::next(),
                        "\u{2193}"
                    }
                    button {
                        class: "close-btn",
                        title: "Close (Esc)",
                        onclick: move |_| crate::watch::close(),
                        "\u{00d7}"
                    }
                }

                if !ad.image_url.is_empty() {
                    img { class: "ad-modal-image", src: "{ad.image_url}", alt: "{ad.title}" }
                }
                if !ad.description.is_empty() {
                    p { class: "ad-modal-description", "{ad.description}" }
                }

                if ad.ad_type != AdType::Script {
                    div { class: "progress-track",
                        div { class: "progress-fill", style: "width: {progress}%;" }
                    }
                }

                div { class: "ad-modal-status",
                    {match (watch.state, ad.ad_type) {
                        (_, AdType::Script) => rsx! {
                            p { class: "text-secondary", "Sponsored content. No reward for this ad." }
                        },
                        (WatchState::Idle, AdType::Redirect) => rsx! {
                            p { "Visit the advertiser and stay for {remaining}s to earn +{reward} tokens." }
                            button {
                                class: "primary-btn",
                                onclick: move |_| crate::watch::visit_site(),
                                "Visit site"
                            }
                        },
                        (WatchState::Idle, _) => rsx! {
                            p { class: "text-secondary", "Ready" }
                        },
                        (WatchState::Running, _) => rsx! {
                            p { "{remaining}s remaining" }
                        },
                        (WatchState::Paused, _) => rsx! {
                            p { class: "text-secondary", "Paused while the tab is hidden ({remaining}s left)" }
                        },
                        (WatchState::RedirectPending, _) => rsx! {
                            p { "Waiting for you to come back from the site..." }
                        },
                        (WatchState::Completed, _) => rsx! {
                            button {
                                class: "primary-btn",
                                disabled: claiming,
                                onclick: move |_| crate::watch::claim(),
                                if claiming { "Claiming..." } else { "Claim +{reward} tokens" }
                            }
                            button {
                                class: "secondary-btn",
                                disabled: claiming,
                                onclick: move |_| crate::watch::skip(),
                                "Skip"
                            }
                        },
                        (WatchState::Claimed, _) => rsx! {
                            p { class: "ad-card-earned", "Reward earned" }
                        },
                        (WatchState::Skipped, _) => rsx! {
                            p { class: "text-secondary", "Skipped" }
                        },
                    }}
                }
            }
        }
    }
}
