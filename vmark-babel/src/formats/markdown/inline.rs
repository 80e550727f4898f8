//! Inline lexical extensions.
//!
//! comrak handles the standard inline grammar (emphasis, code spans, links,
//! autolinks, inline math). This pass runs over the phrasing children comrak
//! produced and recognises the syntax it does not know:
//!
//! | Syntax            | Node                  |
//! |-------------------|-----------------------|
//! | `[[Page]]`        | `wikiLink`            |
//! | `[[Page\|Alias]]` | `wikiLink` with alias |
//! | `![[Resource]]`   | `wikiEmbed`           |
//! | `[^label]`        | `footnoteReference`   |
//! | `[text][id]`      | `linkReference`       |
//! | `![alt][id]`      | `imageReference`      |
//! | `~~text~~`        | `delete`              |
//! | `==text==`        | `highlight`           |
//! | `++text++`        | `underline`           |
//! | `^text^`          | `superscript`         |
//! | `~text~`          | `subscript`           |
//!
//! Children are flattened into a sequence of atoms: one per character of text
//! plus one opaque atom per non-text node (code spans, math, emphasis, ...).
//! The scan is linear and left to right; at each position the first
//! well-formed construct wins, so an earlier start always beats a later one.
//! When an opening delimiter has no valid closer it stays literal text and
//! the scan moves on by one character.
//!
//! Paired delimiters need non-empty content that neither starts nor ends with
//! whitespace. Single `~` and `^` never pair with a doubled neighbour, which
//! keeps `~~strike~~` from ever turning into subscript.

use super::preprocess::restore_literal;
use crate::common::text::plain_text;
use crate::ir::nodes::{
    normalize_identifier, ImageReference, Inline, LinkReference, ReferenceType, WikiLink,
};
use std::collections::HashSet;

/// Document-level facts the scanner needs.
#[derive(Debug, Clone, Default)]
pub struct ExtensionContext {
    /// Normalized identifiers of every link reference definition.
    pub definitions: HashSet<String>,
}

impl ExtensionContext {
    pub fn new(definitions: impl IntoIterator<Item = String>) -> Self {
        ExtensionContext {
            definitions: definitions.into_iter().collect(),
        }
    }
}

/// Applies the inline extensions to one level of phrasing content.
///
/// `in_link` disables wiki links and references (no links inside links);
/// delimiter pairs still apply.
pub fn apply_extensions(
    children: Vec<Inline>,
    ctx: &ExtensionContext,
    in_link: bool,
) -> Vec<Inline> {
    let mut scanner = Scanner {
        store: Vec::new(),
        ctx,
        in_link,
    };
    let atoms = scanner.atomize(children);
    let expanded = scanner.expand(&atoms);
    merge_text(expanded)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Atom {
    Char(char),
    Node(usize),
}

impl Atom {
    fn is(&self, ch: char) -> bool {
        *self == Atom::Char(ch)
    }

    fn is_whitespace(&self) -> bool {
        matches!(self, Atom::Char(c) if c.is_whitespace())
    }
}

/// A paired-delimiter construct.
#[derive(Clone, Copy)]
struct Pair {
    delimiter: &'static [char],
    /// Character a single-char delimiter must not touch (`~` or `^`).
    guard: Option<char>,
    wrap: fn(Vec<Inline>) -> Inline,
}

const DELETE: Pair = Pair {
    delimiter: &['~', '~'],
    guard: None,
    wrap: Inline::Delete,
};
const HIGHLIGHT: Pair = Pair {
    delimiter: &['=', '='],
    guard: None,
    wrap: Inline::Highlight,
};
const UNDERLINE: Pair = Pair {
    delimiter: &['+', '+'],
    guard: None,
    wrap: Inline::Underline,
};
const SUBSCRIPT: Pair = Pair {
    delimiter: &['~'],
    guard: Some('~'),
    wrap: Inline::Subscript,
};
const SUPERSCRIPT: Pair = Pair {
    delimiter: &['^'],
    guard: Some('^'),
    wrap: Inline::Superscript,
};

struct Scanner<'c> {
    store: Vec<Option<Inline>>,
    ctx: &'c ExtensionContext,
    in_link: bool,
}

impl Scanner<'_> {
    fn atomize(&mut self, children: Vec<Inline>) -> Vec<Atom> {
        let mut atoms = Vec::new();
        for child in merge_text(children) {
            match child {
                Inline::Text(text) => atoms.extend(text.chars().map(Atom::Char)),
                other => {
                    atoms.push(Atom::Node(self.store.len()));
                    self.store.push(Some(other));
                }
            }
        }
        atoms
    }

    fn take(&mut self, index: usize) -> Option<Inline> {
        self.store.get_mut(index).and_then(Option::take)
    }

    fn expand(&mut self, atoms: &[Atom]) -> Vec<Inline> {
        let mut out = Vec::new();
        let mut text = String::new();
        let mut i = 0;

        while i < atoms.len() {
            if let Some((node, end)) = self.match_at(atoms, i) {
                flush(&mut text, &mut out);
                out.push(node);
                i = end;
                continue;
            }
            match atoms[i] {
                Atom::Char(ch) => text.push(ch),
                Atom::Node(index) => {
                    flush(&mut text, &mut out);
                    if let Some(node) = self.take(index) {
                        out.push(node);
                    }
                }
            }
            i += 1;
        }

        flush(&mut text, &mut out);
        out
    }

    /// Tries every construct that can start at `i`; returns the node and the
    /// index just past it.
    fn match_at(&mut self, atoms: &[Atom], i: usize) -> Option<(Inline, usize)> {
        let Atom::Char(ch) = atoms[i] else {
            return None;
        };
        let next = atoms.get(i + 1).copied();
        let prev = i.checked_sub(1).map(|p| atoms[p]);

        match ch {
            '!' if !self.in_link && next == Some(Atom::Char('[')) => {
                if atoms.get(i + 2).is_some_and(|a| a.is('[')) {
                    if let Some((link, end)) = wiki_target(atoms, i + 3) {
                        return Some((Inline::WikiEmbed(link), end));
                    }
                }
                self.image_reference(atoms, i)
            }
            '[' if !self.in_link => {
                if next == Some(Atom::Char('[')) && prev != Some(Atom::Char('!')) {
                    if let Some((link, end)) = wiki_target(atoms, i + 2) {
                        return Some((Inline::WikiLink(link), end));
                    }
                }
                if next == Some(Atom::Char('^')) {
                    if let Some(found) = footnote_reference(atoms, i) {
                        return Some(found);
                    }
                }
                self.link_reference(atoms, i)
            }
            '~' if next == Some(Atom::Char('~')) => self.pair(atoms, i, DELETE),
            '~' => self.pair(atoms, i, SUBSCRIPT),
            '=' if next == Some(Atom::Char('=')) => self.pair(atoms, i, HIGHLIGHT),
            '+' if next == Some(Atom::Char('+')) => self.pair(atoms, i, UNDERLINE),
            '^' => self.pair(atoms, i, SUPERSCRIPT),
            _ => None,
        }
    }

    fn pair(&mut self, atoms: &[Atom], open: usize, pair: Pair) -> Option<(Inline, usize)> {
        let width = pair.delimiter.len();
        if !delimiter_at(atoms, open, pair.delimiter) {
            return None;
        }
        if let Some(guard) = pair.guard {
            let touches = |index: Option<usize>| {
                index
                    .and_then(|ix| atoms.get(ix))
                    .is_some_and(|atom| atom.is(guard))
            };
            if touches(open.checked_sub(1)) || touches(Some(open + width)) {
                return None;
            }
        }

        let content_start = open + width;
        let first = atoms.get(content_start)?;
        if first.is_whitespace() {
            return None;
        }

        let mut close = content_start + 1;
        while close + width <= atoms.len() {
            if delimiter_at(atoms, close, pair.delimiter) && self.valid_close(atoms, close, pair) {
                let children = self.expand(&atoms[content_start..close]);
                return Some(((pair.wrap)(merge_text(children)), close + width));
            }
            close += 1;
        }
        None
    }

    fn valid_close(&self, atoms: &[Atom], close: usize, pair: Pair) -> bool {
        if atoms[close - 1].is_whitespace() {
            return false;
        }
        match pair.guard {
            Some(guard) => {
                !atoms[close - 1].is(guard)
                    && !atoms
                        .get(close + pair.delimiter.len())
                        .is_some_and(|atom| atom.is(guard))
            }
            None => true,
        }
    }

    /// `[text][id]`, `[id][]` or `[id]` starting at `open`.
    fn link_reference(&mut self, atoms: &[Atom], open: usize) -> Option<(Inline, usize)> {
        let close = matching_bracket(atoms, open)?;
        let content = &atoms[open + 1..close];
        if content.is_empty() {
            return None;
        }
        let (identifier, label, reference_type, end) =
            self.reference_target(atoms, content, close)?;

        let children = {
            let mut nested = Scanner {
                store: Vec::new(),
                ctx: self.ctx,
                in_link: true,
            };
            std::mem::swap(&mut nested.store, &mut self.store);
            let children = nested.expand(content);
            std::mem::swap(&mut nested.store, &mut self.store);
            merge_text(children)
        };

        Some((
            Inline::LinkReference(LinkReference {
                identifier,
                label,
                reference_type,
                children,
            }),
            end,
        ))
    }

    /// `![alt][id]`, `![alt][]` or `![alt]` starting at `bang`.
    fn image_reference(&mut self, atoms: &[Atom], bang: usize) -> Option<(Inline, usize)> {
        let open = bang + 1;
        let close = matching_bracket(atoms, open)?;
        let content = &atoms[open + 1..close];
        let (identifier, label, reference_type, end) =
            self.reference_target(atoms, content, close)?;

        let mut alt = String::new();
        for atom in content {
            match atom {
                Atom::Char(ch) => alt.push(*ch),
                Atom::Node(index) => {
                    if let Some(Some(node)) = self.store.get(*index) {
                        alt.push_str(&plain_text(std::slice::from_ref(node)));
                    }
                }
            }
        }

        // Nodes inside the alt text are consumed by the image.
        for atom in content {
            if let Atom::Node(index) = atom {
                self.take(*index);
            }
        }

        Some((
            Inline::ImageReference(ImageReference {
                identifier,
                label,
                reference_type,
                alt: restore_literal(&alt),
            }),
            end,
        ))
    }

    /// Reads the part after `]` and decides which reference form applies.
    fn reference_target(
        &self,
        atoms: &[Atom],
        content: &[Atom],
        close: usize,
    ) -> Option<(String, String, ReferenceType, usize)> {
        if atoms.get(close + 1).is_some_and(|a| a.is('[')) {
            let label_end = (close + 2..atoms.len()).find(|ix| atoms[*ix].is(']'))?;
            let label_atoms = &atoms[close + 2..label_end];
            if label_atoms.iter().any(|a| a.is('[')) {
                return None;
            }
            if label_atoms.is_empty() {
                // Collapsed: the text doubles as the label.
                let label = literal_label(content)?;
                let identifier = normalize_identifier(&label);
                return self
                    .ctx
                    .definitions
                    .contains(&identifier)
                    .then_some((identifier, label, ReferenceType::Collapsed, label_end + 1));
            }
            let label = literal_label(label_atoms)?;
            let identifier = normalize_identifier(&label);
            if identifier.is_empty() {
                return None;
            }
            return Some((identifier, label, ReferenceType::Full, label_end + 1));
        }

        // Shortcut: only when the label is actually defined.
        let label = literal_label(content)?;
        let identifier = normalize_identifier(&label);
        self.ctx
            .definitions
            .contains(&identifier)
            .then_some((identifier, label, ReferenceType::Shortcut, close + 1))
    }
}

fn flush(text: &mut String, out: &mut Vec<Inline>) {
    if !text.is_empty() {
        out.push(Inline::Text(restore_literal(text)));
        text.clear();
    }
}

fn delimiter_at(atoms: &[Atom], at: usize, delimiter: &[char]) -> bool {
    delimiter
        .iter()
        .enumerate()
        .all(|(offset, ch)| atoms.get(at + offset).is_some_and(|a| a.is(*ch)))
}

/// Index of the `]` closing the `[` at `open`, honouring nesting.
fn matching_bracket(atoms: &[Atom], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (index, atom) in atoms.iter().enumerate().skip(open) {
        if atom.is('[') {
            depth += 1;
        } else if atom.is(']') {
            depth -= 1;
            if depth == 0 {
                return Some(index);
            }
        }
    }
    None
}

/// The text of a label made only of characters, or `None`.
fn literal_label(atoms: &[Atom]) -> Option<String> {
    let mut label = String::new();
    for atom in atoms {
        match atom {
            Atom::Char(ch) => label.push(*ch),
            Atom::Node(_) => return None,
        }
    }
    let label = restore_literal(&label);
    (!label.trim().is_empty()).then_some(label)
}

/// Parses `target]]` or `target|alias]]` starting at `start`.
fn wiki_target(atoms: &[Atom], start: usize) -> Option<(WikiLink, usize)> {
    let mut raw = String::new();
    let mut index = start;
    loop {
        match atoms.get(index)? {
            Atom::Char(']') => {
                if atoms.get(index + 1).is_some_and(|a| a.is(']')) {
                    break;
                }
                return None;
            }
            Atom::Char('[') | Atom::Char('\n') | Atom::Node(_) => return None,
            Atom::Char(ch) => raw.push(*ch),
        }
        index += 1;
    }

    let raw = restore_literal(&raw);
    let (value, alias) = match raw.split_once('|') {
        Some((value, alias)) => {
            let alias = alias.trim();
            (value.trim(), (!alias.is_empty()).then(|| alias.to_string()))
        }
        None => (raw.trim(), None),
    };
    if value.is_empty() {
        return None;
    }
    Some((
        WikiLink {
            value: value.to_string(),
            alias,
        },
        index + 2,
    ))
}

/// `[^label]` starting at `open`.
fn footnote_reference(atoms: &[Atom], open: usize) -> Option<(Inline, usize)> {
    let mut label = String::new();
    let mut index = open + 2;
    loop {
        match atoms.get(index)? {
            Atom::Char(']') => break,
            Atom::Char(ch) if !ch.is_whitespace() && *ch != '[' => label.push(*ch),
            _ => return None,
        }
        index += 1;
    }
    if label.is_empty() {
        return None;
    }
    Some((Inline::FootnoteReference(restore_literal(&label)), index + 1))
}

/// Joins adjacent text nodes and drops empty ones.
pub fn merge_text(children: Vec<Inline>) -> Vec<Inline> {
    let mut merged: Vec<Inline> = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Inline::Text(text) if text.is_empty() => {}
            Inline::Text(text) => match merged.last_mut() {
                Some(Inline::Text(previous)) => previous.push_str(&text),
                _ => merged.push(Inline::Text(text)),
            },
            other => merged.push(other),
        }
    }
    merged
}
