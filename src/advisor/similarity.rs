//! Near-duplicate detection between content payloads.

use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

use crate::domain::ContentBody;

/// Scores how alike two payloads are, from 0 (unrelated) to 1 (identical).
pub trait SimilarityCheck: Send + Sync {
    fn similarity(&self, a: &ContentBody, b: &ContentBody) -> f64;
}

/// Token Jaccard similarity over normalized text, hashtags and media.
///
/// Payloads with the same fingerprint score 1.0 without tokenizing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenJaccard;

impl SimilarityCheck for TokenJaccard {
    fn similarity(&self, a: &ContentBody, b: &ContentBody) -> f64 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        if fingerprint(a) == fingerprint(b) {
            return 1.0;
        }

        let left = tokens(a);
        let right = tokens(b);
        let union = left.union(&right).count();
        if union == 0 {
            return 0.0;
        }
        left.intersection(&right).count() as f64 / union as f64
    }
}

/// Stable hex digest of a payload's normalized content.
pub fn fingerprint(body: &ContentBody) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize(&body.text).as_bytes());
    for tag in sorted(body.hashtags.iter().map(|h| normalize_tag(h))) {
        hasher.update(b"\x1f#");
        hasher.update(tag.as_bytes());
    }
    for url in sorted(body.media.iter().map(|m| m.url.trim().to_string())) {
        hasher.update(b"\x1f@");
        hasher.update(url.as_bytes());
    }
    if let Some(link) = &body.link {
        hasher.update(b"\x1f>");
        hasher.update(link.trim().as_bytes());
    }
    hex::encode(hasher.finalize())
}

fn tokens(body: &ContentBody) -> BTreeSet<String> {
    let mut set: BTreeSet<String> = body
        .text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();
    set.extend(body.hashtags.iter().map(|h| format!("#{}", normalize_tag(h))));
    set.extend(body.media.iter().map(|m| format!("@{}", m.url.trim())));
    set
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().trim_start_matches('#').to_lowercase()
}

fn sorted(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut items: Vec<String> = items.collect();
    items.sort();
    items
}
