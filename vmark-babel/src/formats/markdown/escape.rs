//! Escaping of literal text for the markdown serializer.
//!
//! Text is escaped just enough that re-parsing yields the same text:
//!
//! - `\`, `*`, `` ` ``, `[` and `]` are always escaped,
//! - `_` is escaped unless it sits between two alphanumerics (intraword
//!   underscores can never open emphasis),
//! - `<` and `&` are escaped when they would start a tag or an entity,
//! - the extension delimiters `~ ^ $ = +` are escaped only when they are
//!   "hot" for the block, that is when the block holds another occurrence
//!   of the character or a construct that is written with it; a lone `~` in
//!   prose can never pair and stays as written,
//! - block markers at the start of a line (`#`, `>`, `-`, `+`, `1.`, setext
//!   underlines) are escaped by [`escape_line_starts`].

use crate::ir::nodes::Inline;
use regex::Regex;
use std::sync::LazyLock;

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^&(?:#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});").unwrap()
});

static ORDERED_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,9})([.)])(\s|$)").unwrap());

static ATX_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#{1,6}(\s|$)").unwrap());

static RULE_OR_UNDERLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:=+\s*|(?:-[ \t]*)+)$").unwrap());

/// Extension delimiter characters that need escaping in one block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HotDelimiters {
    pub tilde: bool,
    pub caret: bool,
    pub dollar: bool,
    pub equals: bool,
    pub plus: bool,
}

impl HotDelimiters {
    /// Every delimiter hot; used where the surrounding block is unknown.
    pub fn all() -> Self {
        HotDelimiters {
            tilde: true,
            caret: true,
            dollar: true,
            equals: true,
            plus: true,
        }
    }

    /// Computes the hot set for the inline content of one block.
    pub fn for_inlines(inlines: &[Inline]) -> Self {
        let mut counts = Counts::default();
        counts.visit(inlines);
        HotDelimiters {
            tilde: counts.tilde >= 2,
            caret: counts.caret >= 2,
            dollar: counts.dollar >= 2,
            equals: counts.equals >= 2,
            plus: counts.plus >= 2,
        }
    }
}

#[derive(Default)]
struct Counts {
    tilde: usize,
    caret: usize,
    dollar: usize,
    equals: usize,
    plus: usize,
}

impl Counts {
    fn text(&mut self, text: &str) {
        for ch in text.chars() {
            match ch {
                '~' => self.tilde += 1,
                '^' => self.caret += 1,
                '$' => self.dollar += 1,
                '=' => self.equals += 1,
                '+' => self.plus += 1,
                _ => {}
            }
        }
    }

    fn visit(&mut self, inlines: &[Inline]) {
        for inline in inlines {
            match inline {
                Inline::Text(text) => self.text(text),
                Inline::Delete(children) | Inline::Subscript(children) => {
                    self.tilde += 2;
                    self.visit(children);
                }
                Inline::Superscript(children) => {
                    self.caret += 2;
                    self.visit(children);
                }
                Inline::Highlight(children) => {
                    self.equals += 2;
                    self.visit(children);
                }
                Inline::Underline(children) => {
                    self.plus += 2;
                    self.visit(children);
                }
                Inline::InlineMath(_) => self.dollar += 2,
                Inline::Strong(children) | Inline::Emphasis(children) => self.visit(children),
                Inline::Link(link) => self.visit(&link.children),
                Inline::LinkReference(reference) => self.visit(&reference.children),
                Inline::Image(image) => self.text(&image.alt),
                Inline::ImageReference(image) => self.text(&image.alt),
                Inline::InlineCode(_)
                | Inline::Break
                | Inline::WikiLink(_)
                | Inline::WikiEmbed(_)
                | Inline::FootnoteReference(_)
                | Inline::Html(_) => {}
            }
        }
    }
}

/// Escapes one text node.
pub fn escape_text(text: &str, hot: HotDelimiters) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);

    for (index, &ch) in chars.iter().enumerate() {
        let prev = index.checked_sub(1).map(|i| chars[i]);
        let next = chars.get(index + 1).copied();

        let escape = match ch {
            '\\' | '*' | '`' | '[' | ']' => true,
            '_' => {
                !(prev.is_some_and(char::is_alphanumeric)
                    && next.is_some_and(char::is_alphanumeric))
            }
            '<' => next.is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?')),
            '&' => ENTITY.is_match(&text[byte_offset(&chars, index)..]),
            '~' => hot.tilde,
            '^' => hot.caret,
            '$' => hot.dollar,
            '=' | '+' => {
                let hot = if ch == '=' { hot.equals } else { hot.plus };
                // Only a doubled run can open; a run at the node edge may
                // join a neighbouring delimiter.
                hot && (prev.is_none() || next.is_none() || prev == Some(ch) || next == Some(ch))
            }
            _ => false,
        };

        if escape {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn byte_offset(chars: &[char], index: usize) -> usize {
    chars[..index].iter().map(|c| c.len_utf8()).sum()
}

/// Escapes block markers at the start of each line of rendered paragraph
/// text. Leading spaces of continuation lines are dropped; they carry no
/// meaning inside a paragraph but could turn a line into indented code.
pub fn escape_line_starts(rendered: &str) -> String {
    rendered
        .split('\n')
        .enumerate()
        .map(|(index, line)| {
            let line = if index == 0 { line } else { line.trim_start_matches([' ', '\t']) };
            escape_line_start(line, index > 0)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_line_start(line: &str, continuation: bool) -> String {
    if ATX_MARKER.is_match(line) || line.starts_with('>') {
        return format!("\\{line}");
    }
    if let Some(rest) = line.strip_prefix(['-', '+']) {
        if rest.is_empty() || rest.starts_with([' ', '\t']) {
            return format!("\\{line}");
        }
    }
    if RULE_OR_UNDERLINE.is_match(line) && (continuation || line.starts_with('-')) {
        return format!("\\{line}");
    }
    if let Some(captures) = ORDERED_MARKER.captures(line) {
        let digits = &captures[1];
        return format!("{digits}\\{}", &line[digits.len()..]);
    }
    line.to_string()
}

/// Escapes a trailing `#` run that would read as a closing ATX sequence.
pub fn escape_heading_end(text: &str) -> String {
    let trimmed = text.trim_end_matches('#');
    if trimmed.len() == text.len() {
        return text.to_string();
    }
    if trimmed.is_empty() || trimmed.ends_with([' ', '\t']) {
        format!("{trimmed}\\{}", &text[trimmed.len()..])
    } else {
        text.to_string()
    }
}

/// Backtick fence for an inline code span holding `code`.
pub fn code_span(code: &str) -> String {
    let mut runs = std::collections::HashSet::new();
    let mut run = 0;
    for ch in code.chars() {
        if ch == '`' {
            run += 1;
        } else if run > 0 {
            runs.insert(run);
            run = 0;
        }
    }
    if run > 0 {
        runs.insert(run);
    }
    let width = (1..).find(|n| !runs.contains(n)).unwrap_or(1);
    let fence = "`".repeat(width);

    let pad = code.starts_with('`')
        || code.ends_with('`')
        || (code.starts_with(' ') && code.ends_with(' ') && !code.trim().is_empty());
    if pad {
        format!("{fence} {code} {fence}")
    } else {
        format!("{fence}{code}{fence}")
    }
}

/// Length of the longest run of `ch` in `text`.
pub fn longest_run(text: &str, ch: char) -> usize {
    text.split(|c| c != ch).map(|run| run.chars().count()).max().unwrap_or(0)
}

/// Link destination, wrapped in `<>` when it would not survive bare.
pub fn link_destination(url: &str) -> String {
    let needs_brackets = url.is_empty()
        || url.chars().any(|c| c.is_whitespace() || c == '<' || c == '>')
        || url.matches('(').count() != url.matches(')').count();
    if needs_brackets {
        format!("<{}>", url.replace('<', "%3C").replace('>', "%3E"))
    } else {
        url.to_string()
    }
}

/// Link title including the leading space, or an empty string.
pub fn link_title(title: Option<&str>) -> String {
    match title {
        Some(title) if !title.is_empty() => {
            format!(" \"{}\"", title.replace('\\', "\\\\").replace('"', "\\\""))
        }
        _ => String::new(),
    }
}
