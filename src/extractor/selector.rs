//! Locating the article body in a parsed page.
//!
//! Each [`ContentStrategy`] looks at the document and the best candidate so
//! far and may offer a replacement. A [`StrategyChain`] runs them strictly in
//! order, so an earlier strategy's match is only displaced when a later one
//! explicitly improves on it.

use kuchiki::NodeRef;
use tracing::debug;

use crate::extractor::dom;
use crate::extractor::errors::ExtractError;
use crate::extractor::model::{Candidate, StrategyTag};
use crate::extractor::paywall::detect_paywall;
use crate::extractor::rules::ExtractionRules;

pub trait ContentStrategy {
    fn tag(&self) -> StrategyTag;

    /// A candidate to replace `current`, or `None` to keep it.
    fn try_extract(
        &self,
        document: &NodeRef,
        current: Option<&Candidate>,
        rules: &ExtractionRules,
    ) -> Option<Candidate>;
}

/// Publisher selectors, first one with enough text wins.
pub struct KnownSelectors;

impl ContentStrategy for KnownSelectors {
    fn tag(&self) -> StrategyTag {
        StrategyTag::Selectors
    }

    fn try_extract(
        &self,
        document: &NodeRef,
        current: Option<&Candidate>,
        rules: &ExtractionRules,
    ) -> Option<Candidate> {
        if current.is_some() {
            return None;
        }

        rules.content_selectors.iter().find_map(|selector| {
            let element = document.select_first(selector).ok()?;
            let node = element.as_node();
            let text = node.text_contents();
            (dom::trimmed_len(&text) > rules.thresholds.selector_min_text)
                .then(|| Candidate::new(dom::inner_html(node), &text, self.tag()))
        })
    }
}

/// Scores every block container and keeps the densest one. Removes
/// structural noise from `document` as a side effect.
pub struct HeuristicPicker;

impl ContentStrategy for HeuristicPicker {
    fn tag(&self) -> StrategyTag {
        StrategyTag::HeuristicPicker
    }

    fn try_extract(
        &self,
        document: &NodeRef,
        current: Option<&Candidate>,
        rules: &ExtractionRules,
    ) -> Option<Candidate> {
        if current.is_some() {
            return None;
        }
        let node = pick_best_content_node(document, rules)?;
        Some(Candidate::new(
            dom::inner_html(&node),
            &node.text_contents(),
            self.tag(),
        ))
    }
}

pub fn pick_best_content_node(document: &NodeRef, rules: &ExtractionRules) -> Option<NodeRef> {
    let t = &rules.thresholds;
    for selector in &rules.structural_noise {
        dom::remove_matching(document, selector);
    }

    let mut best: Option<(f64, NodeRef)> = None;
    for element in dom::select_all(document, &rules.heuristic_candidates) {
        if rules.is_container_junk(&dom::label_of(&element)) {
            continue;
        }

        let node = element.as_node();
        let len = dom::collapsed_len(&node.text_contents());
        if len <= t.heuristic_min_text {
            continue;
        }

        let paragraphs = dom::count_matching(node, "p") as f64;
        let list_items = dom::count_matching(node, "li") as f64;
        let score = paragraphs * t.paragraph_weight
            + list_items * t.list_item_weight
            + len.min(t.text_cap) as f64 / t.text_divisor;

        // Ties go to the earlier (outer) node.
        if best.as_ref().is_none_or(|(top, _)| score > *top) {
            best = Some((score, node.clone()));
        }
    }

    best.map(|(score, node)| {
        debug!(score, "heuristic picked content node");
        node
    })
}

/// Rebuilds the body from individual paragraphs when the page splits the
/// article into many small blocks.
pub struct ParagraphAggregate;

impl ContentStrategy for ParagraphAggregate {
    fn tag(&self) -> StrategyTag {
        StrategyTag::ParagraphAggregate
    }

    fn try_extract(
        &self,
        document: &NodeRef,
        current: Option<&Candidate>,
        rules: &ExtractionRules,
    ) -> Option<Candidate> {
        let t = &rules.thresholds;
        let current_len = current.map_or(0, |c| c.text_len);
        if current.is_some() && current_len >= t.short_content {
            return None;
        }

        let paragraphs: Vec<String> = dom::select_all(document, &rules.paragraph_selector)
            .iter()
            .map(|p| p.text_contents().trim().to_string())
            .filter(|text| text.chars().count() > t.paragraph_min_text)
            .collect();
        if paragraphs.len() < t.paragraph_min_count {
            return None;
        }

        let joined_len: usize = paragraphs.iter().map(|p| p.chars().count()).sum();
        if joined_len <= current_len {
            return None;
        }

        let html = paragraphs
            .iter()
            .map(|p| format!("<p>{}</p>", dom::escape_text(p)))
            .collect::<Vec<_>>()
            .join("\n");
        let text = paragraphs.join("\n");

        Some(Candidate {
            html,
            text,
            text_len: joined_len,
            strategy: self.tag(),
        })
    }
}

pub struct StrategyChain {
    strategies: Vec<Box<dyn ContentStrategy>>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Box<dyn ContentStrategy>>) -> Self {
        Self { strategies }
    }

    /// Selectors, then heuristic scoring, then paragraph aggregation.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(KnownSelectors),
            Box::new(HeuristicPicker),
            Box::new(ParagraphAggregate),
        ])
    }

    /// Node-level strategies only; used for AMP mirrors.
    pub fn primary() -> Self {
        Self::new(vec![Box::new(KnownSelectors), Box::new(HeuristicPicker)])
    }

    /// Run every strategy in order and return the last accepted candidate.
    /// Any accepted candidate carrying a paywall prompt fails the page.
    pub fn select(
        &self,
        document: &NodeRef,
        rules: &ExtractionRules,
    ) -> Result<Candidate, ExtractError> {
        let mut current: Option<Candidate> = None;

        for strategy in &self.strategies {
            let Some(candidate) = strategy.try_extract(document, current.as_ref(), rules) else {
                continue;
            };
            if detect_paywall(&candidate.text, rules) {
                debug!(strategy = %candidate.strategy, "paywall prompt in candidate");
                return Err(ExtractError::Paywall);
            }
            debug!(
                strategy = %candidate.strategy,
                text_len = candidate.text_len,
                "strategy accepted candidate"
            );
            current = Some(candidate);
        }

        current.ok_or(ExtractError::NoContentFound)
    }
}

pub fn select_content_node(
    document: &NodeRef,
    rules: &ExtractionRules,
) -> Result<Candidate, ExtractError> {
    StrategyChain::standard().select(document, rules)
}
