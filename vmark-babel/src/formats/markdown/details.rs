//! `<details>` block extraction.
//!
//! comrak keeps `<details>` markup as raw HTML blocks, cut at blank lines:
//!
//! ```text
//! <details open>            html block
//! <summary>More</summary>
//!
//! Body **markdown**         paragraph
//!
//! </details>                html block
//! ```
//!
//! This pass finds the opening block, the matching closing block (nesting
//! aware) and folds everything in between into one [`Details`] node. HTML text
//! left over around the tags is parsed again as markdown through the
//! `reparse` callback. An opening tag without a closer stays raw HTML.

use crate::ir::nodes::{Block, Details, HtmlBlock, Position};
use regex::Regex;
use std::collections::VecDeque;
use std::sync::LazyLock;

static OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*<details(\s[^>]*)?>").unwrap());

static SUMMARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^\s*<summary[^>]*>(.*?)</summary>").unwrap());

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</?details(\s[^>]*)?>").unwrap());

/// Folds `<details>` runs in one block list into [`Block::Details`] nodes.
pub fn extract_details(blocks: Vec<Block>, reparse: &dyn Fn(&str) -> Vec<Block>) -> Vec<Block> {
    if !blocks.iter().any(opens_details) {
        return blocks;
    }

    let mut queue: VecDeque<Block> = blocks.into();
    let mut out = Vec::with_capacity(queue.len());

    while let Some(block) = queue.pop_front() {
        if !opens_details(&block) {
            out.push(block);
            continue;
        }
        let Block::HtmlBlock(opening) = block else {
            continue;
        };
        match fold(&opening, &mut queue, reparse) {
            Some((details, trailing)) => {
                out.push(details);
                out.extend(trailing);
            }
            None => out.push(Block::HtmlBlock(opening)),
        }
    }

    out
}

fn opens_details(block: &Block) -> bool {
    matches!(block, Block::HtmlBlock(html) if OPEN.is_match(&html.value))
}

/// Net `<details>` nesting change of a chunk of HTML.
fn depth_delta(html: &str) -> isize {
    TAG.find_iter(html)
        .map(|tag| if tag.as_str().starts_with("</") { -1 } else { 1 })
        .sum()
}

/// Byte offset of the `</details>` that brings `depth` back to zero.
fn closing_offset(html: &str, mut depth: isize) -> Option<(usize, usize)> {
    for tag in TAG.find_iter(html) {
        if tag.as_str().starts_with("</") {
            depth -= 1;
            if depth == 0 {
                return Some((tag.start(), tag.end()));
            }
        } else {
            depth += 1;
        }
    }
    None
}

fn fold(
    opening: &HtmlBlock,
    queue: &mut VecDeque<Block>,
    reparse: &dyn Fn(&str) -> Vec<Block>,
) -> Option<(Block, Vec<Block>)> {
    let captures = OPEN.captures(&opening.value)?;
    let open = captures.get(1).is_some_and(|attrs| {
        attrs
            .as_str()
            .to_ascii_lowercase()
            .split(|c: char| c.is_whitespace() || c == '=')
            .any(|attr| attr == "open")
    });
    let after_open = &opening.value[captures.get(0).map_or(0, |m| m.end())..];

    let (summary, after_summary) = match SUMMARY.captures(after_open) {
        Some(summary) => (
            summary[1].trim().to_string(),
            &after_open[summary.get(0).map_or(0, |m| m.end())..],
        ),
        None => (String::new(), after_open),
    };

    let mut children = Vec::new();
    let mut trailing = Vec::new();
    let mut end_position = opening.position;

    if let Some((start, end)) = closing_offset(after_summary, 1) {
        children.extend(reparse(&after_summary[..start]));
        trailing.extend(reparse(&after_summary[end..]));
    } else {
        // Find the block that closes this details element before consuming.
        let mut depth = 1 + depth_delta(after_summary);
        let mut close_index = None;
        for (index, block) in queue.iter().enumerate() {
            if let Block::HtmlBlock(html) = block {
                if closing_offset(&html.value, depth).is_some() {
                    close_index = Some(index);
                    break;
                }
                depth += depth_delta(&html.value);
            }
        }
        let close_index = close_index?;

        children.extend(reparse(after_summary));
        let mut inner: Vec<Block> = queue.drain(..=close_index).collect();
        if let Some(Block::HtmlBlock(closing)) = inner.pop() {
            let (start, end) = closing_offset(&closing.value, depth)?;
            children.extend(inner);
            children.extend(reparse(&closing.value[..start]));
            trailing.extend(reparse(&closing.value[end..]));
            end_position = closing.position;
        }
    }

    let children = extract_details(children, reparse);
    let position = match (opening.position, end_position) {
        (Some(start), Some(end)) => Some(Position {
            start: start.start,
            end: end.end,
        }),
        _ => opening.position,
    };

    Some((
        Block::Details(Details {
            summary,
            open,
            children,
            position,
        }),
        trailing,
    ))
}
