//! Heuristic lists and thresholds that drive extraction.
//!
//! These are tuned to one publisher's markup and change far more often than
//! the pipeline does, so they live in data: [`ExtractionRules::default`] holds
//! the tuned values and a JSON rules file can override any subset of them.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::ConfigError;

pub const RULES_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionRules {
    pub version: u32,
    /// Publisher selectors, most specific first.
    pub content_selectors: Vec<String>,
    /// Paragraph-like elements gathered by paragraph aggregation.
    pub paragraph_selector: String,
    /// Containers scored by the heuristic picker.
    pub heuristic_candidates: String,
    /// Removed from the document before heuristic scoring.
    pub structural_noise: Vec<String>,
    /// Removed outright by the sanitizer.
    pub strip_tags: Vec<String>,
    /// class/id fragments that disqualify a heuristic candidate.
    pub container_junk_labels: Vec<String>,
    /// class/id fragments that get an element removed by the sanitizer.
    pub junk_labels: Vec<String>,
    /// Case-sensitive text that marks an element as site furniture.
    pub kill_phrases: Vec<String>,
    /// Section names that betray a navigation list.
    pub category_labels: Vec<String>,
    /// Text after which the article is over.
    pub cutoff_phrases: Vec<String>,
    pub paywall_phrases: Vec<String>,
    pub thresholds: Thresholds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub selector_min_text: usize,
    pub heuristic_min_text: usize,
    pub short_content: usize,
    pub paragraph_min_text: usize,
    pub paragraph_min_count: usize,
    pub min_content: usize,
    pub feed_min_content: usize,

    pub paragraph_weight: f64,
    pub list_item_weight: f64,
    pub text_cap: usize,
    pub text_divisor: f64,

    pub nav_list_max_links: usize,
    pub nav_list_max_text: usize,
    pub category_list_max_text: usize,
    pub link_farm_max_links: usize,
    pub link_farm_max_text: usize,

    pub timestamp_cut_floor: usize,
    pub cutoff_phrase_floor: usize,
    pub byline_cut_floor: usize,
    pub timestamp_cluster_min: usize,
    pub timestamp_cluster_floor: usize,
    pub timestamp_sweep_min: usize,
    pub timestamp_element_max_text: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            selector_min_text: 200,
            heuristic_min_text: 500,
            short_content: 500,
            paragraph_min_text: 40,
            paragraph_min_count: 4,
            min_content: 150,
            feed_min_content: 200,

            paragraph_weight: 50.0,
            list_item_weight: 10.0,
            text_cap: 20_000,
            text_divisor: 20.0,

            nav_list_max_links: 3,
            nav_list_max_text: 300,
            category_list_max_text: 500,
            link_farm_max_links: 5,
            link_farm_max_text: 400,

            timestamp_cut_floor: 500,
            cutoff_phrase_floor: 500,
            byline_cut_floor: 1000,
            timestamp_cluster_min: 3,
            timestamp_cluster_floor: 1500,
            timestamp_sweep_min: 2,
            timestamp_element_max_text: 100,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            version: RULES_VERSION,
            content_selectors: strings(&[
                r#"[data-component="ArticleBody"]"#,
                r#"article [data-component="ArticleBody"]"#,
                r#"[data-module="article-body"], [data-module="article-body-block"]"#,
                ".article-body, .article__body, .article-content, .content-area",
                "article",
                "main article",
            ]),
            paragraph_selector: r#"[data-component="Paragraph"], article p, main p, .article-body p, .article__body p, .article-content p"#
                .to_string(),
            heuristic_candidates: "main, article, section, div".to_string(),
            structural_noise: strings(&[
                "script", "style", "noscript", "iframe", "form", "footer", "header", "nav",
            ]),
            strip_tags: strings(&[
                "script", "style", "noscript", "iframe", "figure", "aside", "svg", "video",
                "button", "nav", "footer", "header", "form", "select", "input", "textarea",
            ]),
            container_junk_labels: strings(&[
                "nav", "footer", "header", "sidebar", "menu", "subscribe", "newsletter",
                "related", "promo", "advert", "social",
            ]),
            junk_labels: strings(&[
                "share", "social", "subscribe", "newsletter", "related", "promo", "advert",
                "cookie", "consent", "latest", "sidebar", "recommended", "navigation", "menu",
                "footer", "header", "disclosure", "policy", "policies", "language", "signin",
                "about", "contact", "careers", "masthead", "sitemap", "investor", "bug-bounty",
                "terms", "privacy", "ethics",
            ]),
            kill_phrases: strings(&[
                "Back to menu",
                "Select Language",
                "Sign In",
                "About Us",
                "Masthead",
                "Careers",
                "Blog",
                "Investor Relations",
                "Contact Us",
                "Accessibility",
                "Advertise",
                "Sitemap",
                "System status",
                "Bug Bounty Program",
                "Do Not Sell My Info",
                "Terms of Use",
                "Privacy",
                "Ethics",
                "© 2025 CoinDesk",
                "Disclosure & Polices",
                "is an award-winning media outlet",
                "CoinDesk is part of Bullish",
                "Latest Crypto News",
                "Top Stories",
                "Related Stories",
                "More From CoinDesk",
                "More For You",
                "Recommended Articles",
                "Read full story",
                "What to know:",
                "STORY CONTINUES BELOW",
                "Don't miss another story",
                "Subscribe to the Crypto Daybook",
                "By signing up, you will receive emails",
                "See all newsletters",
                "Read more:",
                "Crypto Exchange",
                "Exclusive",
                "minutes ago",
                "hours ago",
                "days ago",
                "about 1 hour ago",
                "Earn Rewards",
                "Learn & Earn",
                "Connecting Farcaster",
                "Articles Claimed Today",
                "Lucky Reward",
                "Read selected articles to claim",
                "Back CoinDesk",
                "Edited by",
                "View Full Report",
                "State of Crypto",
            ]),
            category_labels: strings(&[
                "news", "markets", "finance", "tech", "policy", "videos", "podcasts", "prices",
                "data", "events", "sponsored", "research",
            ]),
            cutoff_phrases: strings(&[
                "More For You",
                "Read more:",
                "Related Stories",
                "What to know:",
                "STORY CONTINUES BELOW",
                "Don't miss another story",
                "Subscribe to",
                "By signing up, you will receive",
                "See all newsletters",
                "Crypto Exchange",
                "Exclusive",
                "Read full story",
                "Latest Crypto News",
                "Top Stories",
                "Recommended",
                "More from",
                "Also read",
                "View Full Report",
                "By CoinDesk",
                "Total Crypto Trading Volume",
                "State of Crypto:",
                "Edited by",
                "Earn Rewards",
                "Learn & Earn",
                "Articles Claimed Today",
                "Lucky Reward",
                "Connecting Farcaster",
            ]),
            paywall_phrases: strings(&[
                "create a free account to continue reading",
                "you've reached your monthly limit",
                "sign up for free",
                "subscribe to continue reading",
                "this article is for subscribers only",
                "become a member to read",
                "premium content",
            ]),
            thresholds: Thresholds::default(),
        }
        .normalized()
    }
}

impl ExtractionRules {
    /// Parse a JSON rules document. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let rules: Self = serde_json::from_str(json)?;
        rules.normalized().validated()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Label and phrase lists that are matched case-insensitively are kept
    /// lowercase so matching never allocates per phrase.
    fn normalized(mut self) -> Self {
        for list in [
            &mut self.container_junk_labels,
            &mut self.junk_labels,
            &mut self.category_labels,
            &mut self.paywall_phrases,
        ] {
            for item in list.iter_mut() {
                *item = item.to_lowercase();
            }
        }
        for phrase in self.cutoff_phrases.iter_mut() {
            *phrase = phrase.to_ascii_lowercase();
        }
        self
    }

    pub fn validated(self) -> Result<Self, ConfigError> {
        if self.version > RULES_VERSION {
            return Err(ConfigError::InvalidValue {
                field: "version",
                reason: format!("unsupported rules version {}", self.version),
            });
        }

        let selectors = self
            .content_selectors
            .iter()
            .chain([&self.paragraph_selector, &self.heuristic_candidates])
            .chain(self.structural_noise.iter())
            .chain(self.strip_tags.iter());
        for selector in selectors {
            if kuchiki::Selectors::compile(selector).is_err() {
                return Err(ConfigError::InvalidSelector(selector.clone()));
            }
        }

        if self.thresholds.text_divisor <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "thresholds.text_divisor",
                reason: "must be positive".to_string(),
            });
        }

        Ok(self)
    }

    pub fn is_container_junk(&self, label: &str) -> bool {
        contains_any(label, &self.container_junk_labels)
    }

    pub fn is_junk_label(&self, label: &str) -> bool {
        contains_any(label, &self.junk_labels)
    }

    pub fn kill_phrase_in(&self, text: &str) -> Option<&str> {
        self.kill_phrases
            .iter()
            .find(|phrase| text.contains(phrase.as_str()))
            .map(String::as_str)
    }

    pub fn looks_like_category_list(&self, text: &str) -> bool {
        contains_any(&text.to_lowercase(), &self.category_labels)
    }
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles
        .iter()
        .any(|needle| !needle.is_empty() && haystack.contains(needle.as_str()))
}
