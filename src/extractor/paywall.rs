use crate::extractor::rules::ExtractionRules;

/// Whether `text` carries a paywall or registration-wall prompt.
pub fn detect_paywall(text: &str, rules: &ExtractionRules) -> bool {
    let text = text.to_lowercase();
    rules
        .paywall_phrases
        .iter()
        .any(|phrase| !phrase.is_empty() && text.contains(phrase.as_str()))
}
