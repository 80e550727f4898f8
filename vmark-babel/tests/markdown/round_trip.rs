use crate::common::{round_trip, shape};
use vmark_babel::{parse, serialize};

/// Sources that come back byte for byte (plus the final newline).
const EXACT: &[&str] = &[
    "H~2~O",
    "$E=mc^2$",
    "[[Page|Alias]]",
    "[[Page]] and ![[diagram.png]]",
    "~~strikethrough~~",
    "text ~not closed",
    "x^2^ with ==mark== and ++under++",
    "# Title\n\nSome *italic* and **bold** text.",
    "> [!TIP]\n> Heads up",
    "- [ ] todo\n- [x] done",
    "1. one\n2. two",
    "```rust\nfn main() {}\n```",
    "$$\nx^2\n$$",
    "---\ntitle: Notes\n---\n\n# Notes",
    "See[^1].\n\n[^1]: The note.",
    "<details>\n<summary>More</summary>\n\nHidden text\n\n</details>",
    "[docs](https://example.com \"Docs\") and <https://example.com>",
    "Use `code` here",
    "\\*not emphasis\\*",
    "price: \\$5 and \\$6",
    "first line\nsecond line",
    "- item\n\n  $$\n  x^2\n  $$",
    "> [^1]: note\n\nText[^1]",
];

#[test]
fn test_exact_round_trips() {
    for source in EXACT {
        assert_eq!(round_trip(source), format!("{source}\n"), "source: {source:?}");
    }
}

/// Sources whose serialization is normalised but re-parses to the same tree.
const NORMALISED: &[&str] = &[
    "Title\n=====\n\nbody",
    "* star\n* list",
    "    indented code",
    "_under_ and __strong__",
    "[text][missing]",
    "[text][id]\n\n[id]: https://x.com \"T\"",
    "> quote\n>\n> > nested",
    "a\n\n\n\n\nb",
    "| a | b |\n|---|:-:|\n| 1 | 2 |",
    "- a\n\n- b",
    "- a\n- b\n\n* c",
    "![alt](img.png \"T\")",
    "text with <span>html</span> inline",
    "> [!warning]\n> lower-case marker",
    "```\ncode\n```\n[id]: https://x.com\n\nSee [id].",
    "***\n[id]: https://x.com\n\nSee [id].",
    "- [x] done\n\n[x]: /url",
    "https://x.com/~a~b and www.example.com/a_b_c",
];

#[test]
fn test_double_parse_is_stable() {
    for source in EXACT.iter().chain(NORMALISED) {
        let first = parse(source);
        let second = parse(&serialize(&first));
        assert_eq!(shape(&second), shape(&first), "source: {source:?}");
    }
}

#[test]
fn test_serialize_is_a_fixed_point_after_one_pass() {
    for source in NORMALISED {
        let once = round_trip(source);
        assert_eq!(round_trip(&once), once, "source: {source:?}");
    }
}

#[test]
fn test_autolinks_stay_literal() {
    assert_eq!(round_trip("https://x.com/~a~b"), "<https://x.com/~a~b>\n");
}
