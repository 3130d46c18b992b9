pub mod ad_card;
pub mod ad_list;
pub mod ad_modal;
pub mod toast;

/// Token amounts without trailing zeros: `5`, `2.5`, `0.25`.
pub fn format_tokens(amount: f64) -> String {
    let text = format!("{:.2}", amount);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

pub fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}\u{2026}", cut.trim_end())
}
