//! Heading anchor slugs.
//!
//! Slugs follow the GitHub convention: lower-cased, punctuation dropped,
//! spaces turned into hyphens. Uniqueness is tracked by a [`Slugger`] owned by
//! a single conversion call; the first `setup` heading gets `setup`, the second
//! `setup-1`, and so on.

use std::collections::HashSet;

/// Derives the base slug for a heading text.
///
/// Letters, digits, `-` and `_` survive (case-folded); whitespace becomes `-`;
/// everything else is dropped. Returns an empty string when nothing survives.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for ch in text.trim().chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == '-' {
            slug.extend(ch.to_lowercase());
        } else if ch.is_whitespace() {
            slug.push('-');
        }
    }
    slug
}

/// Per-conversion slug registry.
///
/// Create one per document conversion and drop it afterwards; it is never
/// shared between documents.
#[derive(Debug, Default)]
pub struct Slugger {
    used: HashSet<String>,
}

impl Slugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a slug for `text` that has not been handed out before by this
    /// slugger, or `None` when the text yields no slug at all.
    pub fn slug(&mut self, text: &str) -> Option<String> {
        let base = slugify(text);
        if base.is_empty() {
            return None;
        }

        let mut candidate = base.clone();
        let mut suffix = 1;
        while self.used.contains(&candidate) {
            candidate = format!("{base}-{suffix}");
            suffix += 1;
        }
        self.used.insert(candidate.clone());
        Some(candidate)
    }
}
