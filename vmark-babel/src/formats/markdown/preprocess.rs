//! Line-level pass run over the source before comrak sees it.
//!
//! comrak resolves escapes, link reference definitions and footnotes on its
//! own and does not keep them in its tree. The pipeline needs all three:
//! definitions must survive for re-serialization, footnotes become
//! `footnoteDefinition` nodes, and an escaped `\~` must never open a
//! subscript. This pass therefore:
//!
//! - replaces backslash escapes of extension characters with private-use
//!   placeholders (see [`shield`]), which both comrak and the inline scanner
//!   treat as ordinary text,
//! - lifts top-level link reference definitions and footnote definitions
//!   out of the text, leaving blank lines so comrak's line numbers still
//!   match the source,
//! - rewrites `$$` fences at the top level or inside list items into code
//!   fences tagged with the math sentinel, so display math keeps its raw
//!   body,
//! - marks footnote definitions inside blockquotes and list items with
//!   [`NESTED_FOOTNOTE`] so comrak reads them as text rather than as link
//!   reference definitions.
//!
//! Fenced code and frontmatter are passed through untouched.

use crate::model::MATH_SENTINEL;
use regex::Regex;
use std::sync::LazyLock;

/// Characters whose backslash escape is shielded.
const SHIELDED: [char; 7] = ['$', '~', '=', '+', '^', '[', ']'];

/// First code point of the placeholder range.
const SHIELD_BASE: u32 = 0xE000;

/// Stands in for the `[` opening a footnote definition nested in a container.
pub const NESTED_FOOTNOTE: char = '\u{E010}';

static DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"^\[([^\]^][^\]]*)\]:[ \t]*(<[^>]*>|\S+)"#,
        r#"(?:[ \t]+("[^"]*"|'[^']*'|\([^)]*\)))?[ \t]*$"#,
    ))
    .unwrap()
});

static FOOTNOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\^([^\]\s]+)\]:[ \t]?(.*)$").unwrap());

/// A footnote definition behind blockquote markers, a list marker or indent.
static CONTAINED_FOOTNOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?:[ \t]*>)*[ \t]*(?:(?:[-+*]|\d{1,9}[.)])[ \t]+)?)\[\^[^\]\s]+\]:").unwrap()
});

static ATX_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}#{1,6}(?:[ \t]|$)").unwrap());

static THEMATIC_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ {0,3}(?:(?:\*[ \t]*){3,}|(?:-[ \t]*){3,}|(?:_[ \t]*){3,})$").unwrap()
});

static SETEXT_UNDERLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}(?:=+|-+)[ \t]*$").unwrap());

/// Marker, then 1-4 spaces, then content: the groups add up to the item's
/// content indent.
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^( *)([-+*]|\d{1,9}[.)])( {1,4})\S").unwrap());

/// Placeholder standing in for an escaped `ch`.
///
/// Characters outside the shielded set map to themselves.
pub fn shield(ch: char) -> char {
    SHIELDED
        .iter()
        .position(|c| *c == ch)
        .and_then(|index| char::from_u32(SHIELD_BASE + index as u32))
        .unwrap_or(ch)
}

fn unshield(ch: char) -> Option<char> {
    if ch == NESTED_FOOTNOTE {
        return Some('[');
    }
    let offset = (ch as u32).checked_sub(SHIELD_BASE)?;
    SHIELDED.get(offset as usize).copied()
}

/// Replaces placeholders with the plain character (text, urls, labels).
pub fn restore_literal(text: &str) -> String {
    text.chars().map(|ch| unshield(ch).unwrap_or(ch)).collect()
}

/// Replaces placeholders with the original escape sequence (code, math,
/// raw html), where the backslash is part of the content.
pub fn restore_escaped(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match unshield(ch) {
            Some(original) if ch == NESTED_FOOTNOTE => out.push(original),
            Some(original) => {
                out.push('\\');
                out.push(original);
            }
            None => out.push(ch),
        }
    }
    out
}

/// Shields the escapes of one line.
pub fn shield_escapes(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.peek().copied() {
            Some('\\') => {
                out.push_str("\\\\");
                chars.next();
            }
            Some(next) if SHIELDED.contains(&next) => {
                out.push(shield(next));
                chars.next();
            }
            _ => out.push('\\'),
        }
    }
    out
}

/// A construct lifted out of the source text.
#[derive(Debug, Clone, PartialEq)]
pub enum Lifted {
    Definition {
        line: usize,
        label: String,
        url: String,
        title: Option<String>,
    },
    Footnote {
        line: usize,
        end_line: usize,
        label: String,
        /// Unshielded markdown body, continuation indent removed.
        body: String,
    },
}

impl Lifted {
    pub fn line(&self) -> usize {
        match self {
            Lifted::Definition { line, .. } | Lifted::Footnote { line, .. } => *line,
        }
    }
}

/// Output of [`prepare`].
#[derive(Debug, Clone, Default)]
pub struct Prepared {
    /// Text to hand to comrak; one output line per input line.
    pub text: String,
    /// Lifted constructs in source order.
    pub lifted: Vec<Lifted>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Previous {
    Start,
    Blank,
    Definition,
    Heading,
    /// A fence close, thematic break or setext underline: no open paragraph.
    Closed,
    Other,
}

impl Previous {
    fn allows_definition(self) -> bool {
        !matches!(self, Previous::Other)
    }
}

/// Whether a block construct may open at `indent`: up to three spaces past
/// the margin, or past the content indent of the enclosing list item.
fn opens_block(indent: usize, list_indent: usize) -> bool {
    indent <= 3 || (list_indent > 0 && indent >= list_indent && indent - list_indent <= 3)
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// Runs the pre-pass over `source`.
pub fn prepare(source: &str) -> Prepared {
    let lines: Vec<&str> = source.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut lifted = Vec::new();
    let mut previous = Previous::Start;
    let mut list_indent = 0;
    let mut index = 0;

    if let Some(end) = frontmatter_end(&lines) {
        out.extend(lines[..=end].iter().map(|line| line.to_string()));
        index = end + 1;
        previous = Previous::Blank;
    }

    while index < lines.len() {
        let line = lines[index];
        let indent = indent_of(line);

        let item = LIST_ITEM
            .captures(line)
            .filter(|_| !THEMATIC_BREAK.is_match(line));
        if let Some(captures) = item {
            list_indent = captures[1].len() + captures[2].len() + captures[3].len();
        } else if !line.trim().is_empty() && indent < list_indent {
            list_indent = 0;
        }

        if let Some((fence_char, fence_len)) = fence_open(line, list_indent) {
            let end = fence_close(&lines, index + 1, fence_char, fence_len);
            out.extend(lines[index..end].iter().map(|l| l.to_string()));
            index = end;
            previous = Previous::Closed;
            continue;
        }

        if line.trim() == "$$" && opens_block(indent, list_indent) {
            if let Some(close) = (index + 1..lines.len()).find(|ix| lines[*ix].trim() == "$$") {
                let body = &lines[index + 1..close];
                let fence = "`".repeat(longest_backtick_run(body).max(2) + 1);
                let close_indent = &lines[close][..indent_of(lines[close])];
                out.push(format!("{}{fence}{MATH_SENTINEL}", &line[..indent]));
                out.extend(body.iter().map(|l| l.to_string()));
                out.push(format!("{close_indent}{fence}"));
                index = close + 1;
                previous = Previous::Closed;
                continue;
            }
        }

        if previous.allows_definition() {
            if let Some(captures) = FOOTNOTE.captures(line) {
                let label = captures[1].to_string();
                let mut body = vec![captures[2].to_string()];
                let end = footnote_end(&lines, index + 1);
                for continuation in &lines[index + 1..end] {
                    body.push(dedent(continuation).to_string());
                }
                lifted.push(Lifted::Footnote {
                    line: index + 1,
                    end_line: end,
                    label,
                    body: body.join("\n").trim_end().to_string(),
                });
                out.extend(std::iter::repeat(String::new()).take(end - index));
                index = end;
                previous = Previous::Definition;
                continue;
            }
        }

        let mut shielded = shield_escapes(line);
        if previous.allows_definition() {
            if let Some(definition) = parse_definition(&shielded, index + 1) {
                lifted.push(definition);
                out.push(String::new());
                index += 1;
                previous = Previous::Definition;
                continue;
            }
        }
        mark_nested_footnote(&mut shielded);

        previous = if line.trim().is_empty() {
            Previous::Blank
        } else if ATX_HEADING.is_match(line) {
            Previous::Heading
        } else if THEMATIC_BREAK.is_match(line)
            || (previous == Previous::Other && SETEXT_UNDERLINE.is_match(line))
        {
            Previous::Closed
        } else {
            Previous::Other
        };
        out.push(shielded);
        index += 1;
    }

    Prepared {
        text: out.join("\n"),
        lifted,
    }
}

/// Swaps the `[` of a contained footnote definition for [`NESTED_FOOTNOTE`].
fn mark_nested_footnote(line: &mut String) {
    let Some(prefix) = CONTAINED_FOOTNOTE.captures(line).map(|c| c[1].len()) else {
        return;
    };
    if prefix > 0 {
        line.replace_range(prefix..prefix + 1, NESTED_FOOTNOTE.encode_utf8(&mut [0; 4]));
    }
}

fn parse_definition(line: &str, line_number: usize) -> Option<Lifted> {
    let captures = DEFINITION.captures(line)?;
    let label = restore_literal(captures[1].trim());
    if label.is_empty() {
        return None;
    }
    let raw_url = &captures[2];
    let url = raw_url
        .strip_prefix('<')
        .and_then(|u| u.strip_suffix('>'))
        .unwrap_or(raw_url);
    let title = captures.get(3).map(|m| {
        let quoted = m.as_str();
        restore_literal(&quoted[1..quoted.len() - 1])
    });
    Some(Lifted::Definition {
        line: line_number,
        label,
        url: restore_literal(url),
        title,
    })
}

/// Index of the closing `---` when the document opens with frontmatter.
fn frontmatter_end(lines: &[&str]) -> Option<usize> {
    if lines.first().map(|l| l.trim_end()) != Some("---") {
        return None;
    }
    (1..lines.len()).find(|ix| lines[*ix].trim_end() == "---")
}

fn fence_open(line: &str, list_indent: usize) -> Option<(char, usize)> {
    let indent = indent_of(line);
    if !opens_block(indent, list_indent) {
        return None;
    }
    let rest = &line[indent..];
    let fence_char = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = rest.chars().take_while(|c| *c == fence_char).count();
    if len < 3 {
        return None;
    }
    if fence_char == '`' && rest[len..].contains('`') {
        return None;
    }
    Some((fence_char, len))
}

/// Index just past the closing fence (or the end of the document).
fn fence_close(lines: &[&str], from: usize, fence_char: char, fence_len: usize) -> usize {
    for (index, line) in lines.iter().enumerate().skip(from) {
        let trimmed = line.trim();
        let run = trimmed.chars().take_while(|c| *c == fence_char).count();
        if run >= fence_len && run == trimmed.chars().count() {
            return index + 1;
        }
    }
    lines.len()
}

/// Index just past the last continuation line of a footnote.
fn footnote_end(lines: &[&str], from: usize) -> usize {
    let mut end = from;
    let mut index = from;
    while index < lines.len() {
        let line = lines[index];
        if line.trim().is_empty() {
            index += 1;
            continue;
        }
        if line.starts_with("    ") || line.starts_with('\t') {
            index += 1;
            end = index;
        } else {
            break;
        }
    }
    end
}

fn dedent(line: &str) -> &str {
    line.strip_prefix("    ")
        .or_else(|| line.strip_prefix('\t'))
        .unwrap_or(line.trim_start())
}

fn longest_backtick_run(lines: &[&str]) -> usize {
    lines
        .iter()
        .flat_map(|line| line.split(|c| c != '`'))
        .map(str::len)
        .max()
        .unwrap_or(0)
}
