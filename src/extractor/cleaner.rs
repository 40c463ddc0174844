use ammonia::{Builder, UrlRelative};
use kuchiki::NodeRef;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

use crate::extractor::dom;
use crate::extractor::rules::ExtractionRules;

static RELATIVE_TIME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\d+\s+(?:minute|minutes|hour|hours|day|days)\s+ago").unwrap()
});

static ABSOLUTE_DATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+\d+,\s+20\d{2}").unwrap()
});

// "By Jane Doe | Edited by ... Sep 9, 2025": the start of another story.
static BYLINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\bBy\s+[A-Z][a-zA-Z\s,]+\|?\s*(?:Edited by)?.*?(?i:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+\d{1,2},\s+20\d{2}",
    )
    .unwrap()
});

static HOURS_AGO_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\d+\s+(?:hour|hours|minute|minutes)\s+ago").unwrap());

static AGO_PHRASE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:hour|minute|day)s?\s+ago").unwrap());

/// Upper bound on whole sanitize passes; each pass only ever removes text.
const MAX_PASSES: usize = 16;

/// Strip site furniture from a content fragment and cut it where the article
/// ends. Lossy and deterministic: running it on its own output changes
/// nothing.
pub fn sanitize(fragment_html: &str, rules: &ExtractionRules) -> String {
    let mut html = sanitize_pass(fragment_html, rules);
    // Removing an element can expose a marker an earlier cut never saw.
    for _ in 1..MAX_PASSES {
        let next = sanitize_pass(&html, rules);
        if next == html {
            break;
        }
        html = next;
    }
    html
}

fn sanitize_pass(fragment_html: &str, rules: &ExtractionRules) -> String {
    let root = dom::parse_fragment(fragment_html);
    while strip_noise(&root, rules) > 0 {}

    let mut html = dom::inner_html(&root);
    let cluster = truncate_trailing(&mut html, rules);

    // Truncation leaves dangling tags; reparsing closes them.
    let root = dom::parse_fragment(&html);
    loop {
        let mut removed = strip_noise(&root, rules);
        let stamps = HOURS_AGO_REGEX.find_iter(&dom::inner_html(&root)).count();
        if cluster || stamps >= rules.thresholds.timestamp_sweep_min {
            removed += sweep_timestamp_lists(&root, rules);
        }
        removed += dedupe_headings(&root);
        if removed == 0 {
            break;
        }
    }

    dom::inner_html(&root)
}

/// Publish-safe pass: drops anything executable or styled and resolves
/// relative links against the page they came from.
pub fn finalize(html: &str, base_url: &Url) -> String {
    Builder::default()
        .url_relative(UrlRelative::RewriteWithBase(base_url.clone()))
        .clean(html)
        .to_string()
}

/// One pass of element removal. Returns how many elements were detached.
fn strip_noise(root: &NodeRef, rules: &ExtractionRules) -> usize {
    let t = &rules.thresholds;
    let mut removed = dom::remove_matching(root, &rules.strip_tags.join(", "));

    for element in dom::elements(root) {
        if rules.is_junk_label(&dom::label_of(&element)) {
            element.as_node().detach();
            removed += 1;
        }
    }

    // Innermost first, so a phrase in one child doesn't take its parent along.
    for element in dom::elements(root).into_iter().rev() {
        let node = element.as_node();
        if rules.kill_phrase_in(&node.text_contents()).is_some() {
            node.detach();
            removed += 1;
        }
    }

    for list in dom::select_all(root, "ul, ol") {
        let node = list.as_node();
        let text = node.text_contents();
        let text_len = dom::trimmed_len(&text);
        let links = dom::count_matching(node, "a");

        let nav = links > t.nav_list_max_links && text_len < t.nav_list_max_text;
        let categories =
            text_len < t.category_list_max_text && rules.looks_like_category_list(&text);
        if nav || categories {
            node.detach();
            removed += 1;
        }
    }

    for div in dom::select_all(root, "div") {
        let node = div.as_node();
        let links = dom::count_matching(node, "a");
        if links > t.link_farm_max_links
            && dom::trimmed_len(&node.text_contents()) < t.link_farm_max_text
        {
            node.detach();
            removed += 1;
        }
    }

    removed
}

/// Cut the serialized fragment where the article text ends. Returns whether a
/// cluster of relative timestamps was seen, which marks a story list.
///
/// Floors count characters, not bytes.
fn truncate_trailing(html: &mut String, rules: &ExtractionRules) -> bool {
    let t = &rules.thresholds;

    // A date near the top is the article's own byline; only a later one ends it.
    let first_stamp = [&*RELATIVE_TIME_REGEX, &*ABSOLUTE_DATE_REGEX]
        .iter()
        .filter_map(|re| re.find(html).map(|m| m.start()))
        .min();
    if let Some(pos) = first_stamp
        && char_offset(html, pos) > t.timestamp_cut_floor
    {
        html.truncate(pos);
    }

    // ASCII lowercasing keeps byte offsets aligned with `html`.
    let lower = html.to_ascii_lowercase();
    let phrase_cut = rules
        .cutoff_phrases
        .iter()
        .filter(|phrase| !phrase.is_empty())
        .filter_map(|phrase| {
            lower
                .match_indices(phrase.as_str())
                .map(|(pos, _)| pos)
                .find(|&pos| char_offset(&lower, pos) > t.cutoff_phrase_floor)
        })
        .min();
    if let Some(pos) = phrase_cut {
        html.truncate(pos);
    }

    if let Some(pos) = BYLINE_REGEX
        .find_iter(html)
        .map(|m| m.start())
        .find(|&pos| char_offset(html, pos) > t.byline_cut_floor)
    {
        html.truncate(pos);
    }

    let stamps: Vec<usize> = HOURS_AGO_REGEX.find_iter(html).map(|m| m.start()).collect();
    let cluster = stamps.len() >= t.timestamp_cluster_min;
    if cluster
        && let Some(&pos) = stamps
            .iter()
            .find(|&&pos| char_offset(html, pos) > t.timestamp_cluster_floor)
    {
        html.truncate(pos);
    }

    cluster
}

fn char_offset(text: &str, byte_pos: usize) -> usize {
    text[..byte_pos].chars().count()
}

/// Remove story-list remnants: linked entries with a relative timestamp and
/// short timestamp-only lines.
fn sweep_timestamp_lists(root: &NodeRef, rules: &ExtractionRules) -> usize {
    let mut removed = 0;
    for element in dom::elements(root).into_iter().rev() {
        let node = element.as_node();
        let text = node.text_contents();
        if !AGO_PHRASE_REGEX.is_match(&text) {
            continue;
        }
        if dom::count_matching(node, "a") >= 2
            || text.chars().count() < rules.thresholds.timestamp_element_max_text
        {
            node.detach();
            removed += 1;
        }
    }
    removed
}

fn dedupe_headings(root: &NodeRef) -> usize {
    let mut seen = HashSet::new();
    let mut removed = 0;
    for heading in dom::select_all(root, "h1, h2, h3, h4, h5, h6") {
        let text = heading.text_contents().trim().to_lowercase();
        if text.is_empty() {
            continue;
        }
        if !seen.insert(text) {
            heading.as_node().detach();
            removed += 1;
        }
    }
    removed
}
