#![allow(non_snake_case)]

use adview_core::types::{Ad, AdType};
use dioxus::prelude::*;

use super::{format_tokens, truncate_text};

#[component]
pub fn AdCard(ad: Ad, watched: bool) -> Element {
    let reward = format_tokens(ad.reward_per_view);
    let description = truncate_text(&ad.description, 120);
    let card_class = if watched { "ad-card watched" } else { "ad-card" };
    let (badge_class, badge_text) = match ad.ad_type {
        AdType::Native => ("ad-badge native", "Watch"),
        AdType::Redirect => ("ad-badge redirect", "Visit"),
        AdType::Script => ("ad-badge script", "Sponsored"),
    };
    let views = match ad.view_count {
        1 => "1 view".to_string(),
        n => format!("{} views", n),
    };

    rsx! {
        div {
            class: "{card_class}",
            onclick: {
                let id = ad.id.clone();
                move |_| crate::watch::open(&id)
            },

            if !ad.image_url.is_empty() {
                img { class: "ad-card-image", src: "{ad.image_url}", alt: "{ad.title}" }
            }

            div { class: "ad-card-body",
                div { class: "ad-card-header",
                    h3 { class: "ad-card-title", "{ad.title}" }
                    span { class: "{badge_class}", "{badge_text}" }
                }
                if !description.is_empty() {
                    p { class: "ad-card-description", "{description}" }
                }
                div { class: "ad-card-footer",
                    span { class: "ad-card-reward", "+{reward} tokens" }
                    span { class: "stat", "{views}" }
                    if watched {
                        span { class: "ad-card-earned", "Earned" }
                    }
                }
            }
        }
    }
}
