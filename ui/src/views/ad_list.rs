#![allow(non_snake_case)]

use adview_core::queue::SortOrder;
use dioxus::prelude::*;

use super::ad_card::AdCard;
use crate::state::{ADS, LOADING, LOAD_ERROR, PROFILE, SORT_ORDER};

#[component]
pub fn AdList() -> Element {
    let ads = ADS.read();
    let loading = *LOADING.read();
    let error = LOAD_ERROR.read().clone();
    let order = *SORT_ORDER.read();
    let watched: Vec<String> = PROFILE
        .read()
        .as_ref()
        .map(|p| p.watched_ads.clone())
        .unwrap_or_default();

    let remaining = ads.iter().filter(|a| !watched.contains(&a.id)).count();
    let plural = if remaining != 1 { "s" } else { "" };
    let (toggle_text, toggle_to) = match order {
        SortOrder::Reward => ("Unwatched first", SortOrder::UnwatchedFirst),
        SortOrder::UnwatchedFirst => ("Highest reward", SortOrder::Reward),
    };

    rsx! {
        div { class: "ad-list",
            div { class: "filter-row",
                span { class: "ad-count", "{remaining} ad{plural} left to watch" }
                button {
                    class: "sort-toggle",
                    title: "Change sort order",
                    onclick: move |_| crate::services::set_sort_order(toggle_to),
                    "Sort: {toggle_text}"
                }
                button {
                    class: "refresh-btn",
                    disabled: loading,
                    onclick: move |_| {
                        wasm_bindgen_futures::spawn_local(crate::services::load_ads(true));
                    },
                    "Refresh"
                }
            }

            if let Some(message) = error {
                div { class: "list-error", "{message}" }
            }

            if ads.is_empty() {
                div { class: "directory-empty",
                    if loading {
                        p { "Loading ads..." }
                    } else {
                        p { "No ads available right now." }
                        p { class: "text-secondary", "Check back later for new rewards." }
                    }
                }
            } else {
                div { class: "ad-grid",
                    for ad in ads.iter() {
                        AdCard {
                            key: "{ad.id}",
                            ad: ad.clone(),
                            watched: watched.contains(&ad.id),
                        }
                    }
                }
            }
        }
    }
}
