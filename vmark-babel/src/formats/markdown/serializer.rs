//! Markdown serialization (markdown AST → markdown text)
//!
//! Block layout:
//!
//! | Node          | Output                                          |
//! |---------------|-------------------------------------------------|
//! | heading       | `## text`                                       |
//! | code          | fenced, fence longer than any backtick run      |
//! | math          | `$$` fence                                      |
//! | blockquote    | `> ` prefixed lines                             |
//! | alert         | `> [!TYPE]` followed by the quoted body         |
//! | details       | `<details>` / `<summary>` wrapper, blank lines  |
//! | list          | `-` or `1.`; alternate marker after a sibling   |
//! | table         | GFM pipes, `:--` / `:-:` / `--:` separators     |
//! | definition    | `[label]: url "title"`                          |
//! | footnote def  | `[^id]: text`, continuation indented 4 spaces   |
//! | frontmatter   | `---` fenced YAML                               |
//!
//! Blocks are separated by one blank line. A final pass collapses runs of
//! blank lines outside fenced code, and the output ends with a newline.

use super::escape::{
    code_span, escape_heading_end, escape_line_starts, escape_text, link_destination, link_title,
    longest_run, HotDelimiters,
};
use crate::ir::nodes::{Align, Block, Inline, List, ReferenceType, Root, Table};
use serde::{Deserialize, Serialize};

/// Knobs of the markdown writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializeOptions {
    /// `-`, `*` or `+`.
    pub bullet_marker: char,
    /// `*` or `_`.
    pub emphasis_marker: char,
    /// `*` or `_`.
    pub strong_marker: char,
    pub thematic_break: String,
    /// Collapse three or more newlines into two outside fenced code.
    pub collapse_blank_lines: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        SerializeOptions {
            bullet_marker: '-',
            emphasis_marker: '*',
            strong_marker: '*',
            thematic_break: "***".to_string(),
            collapse_blank_lines: true,
        }
    }
}

impl SerializeOptions {
    fn alternate_bullet(&self) -> char {
        if self.bullet_marker == '*' {
            '-'
        } else {
            '*'
        }
    }
}

/// Renders a markdown AST to text.
pub fn serialize_ast(root: &Root, options: &SerializeOptions) -> String {
    let writer = Writer { options };
    let body = writer.blocks(&root.children);
    let body = if options.collapse_blank_lines {
        collapse_blank_lines(&body)
    } else {
        body
    };
    let body = body.trim_matches('\n');
    if body.is_empty() {
        String::new()
    } else {
        format!("{body}\n")
    }
}

struct Writer<'o> {
    options: &'o SerializeOptions,
}

impl Writer<'_> {
    fn blocks(&self, blocks: &[Block]) -> String {
        self.join_blocks(blocks, false)
    }

    /// Renders sibling blocks. `tight` keeps a list item's blocks on
    /// consecutive lines where that cannot merge them.
    fn join_blocks(&self, blocks: &[Block], tight: bool) -> String {
        let mut out = String::new();
        let mut previous: Option<&Block> = None;
        let mut alternate = false;

        for block in blocks {
            if let Block::List(list) = block {
                alternate = match previous {
                    Some(Block::List(prev)) if prev.ordered == list.ordered => !alternate,
                    _ => false,
                };
            }
            let rendered = self.block(block, alternate);
            if rendered.is_empty() {
                continue;
            }
            if let Some(prev) = previous {
                let merges =
                    matches!(prev, Block::Paragraph(_)) && matches!(block, Block::Paragraph(_));
                out.push_str(if tight && !merges { "\n" } else { "\n\n" });
            }
            out.push_str(&rendered);
            previous = Some(block);
        }
        out
    }

    fn block(&self, block: &Block, alternate: bool) -> String {
        match block {
            Block::Paragraph(paragraph) => escape_line_starts(&self.inlines(&paragraph.children)),

            Block::Heading(heading) => {
                let text = self.inlines(&heading.children).replace('\n', " ");
                let text = escape_heading_end(text.trim());
                let hashes = "#".repeat(heading.depth.clamp(1, 6) as usize);
                if text.is_empty() {
                    hashes
                } else {
                    format!("{hashes} {text}")
                }
            }

            Block::Code(code) => {
                let fence = "`".repeat(longest_run(&code.value, '`').max(2) + 1);
                let lang = code.lang.as_deref().unwrap_or("");
                format!("{fence}{lang}\n{}\n{fence}", code.value)
            }

            Block::Math(math) => format!("$$\n{}\n$$", math.value.trim_matches('\n')),

            Block::Blockquote(quote) => prefix_lines(&self.blocks(&quote.children), "> ", ">"),

            Block::Alert(alert) => {
                let marker = format!("[!{}]", alert.alert_type.as_str());
                let body = self.blocks(&alert.children);
                if body.is_empty() {
                    format!("> {marker}")
                } else {
                    prefix_lines(&format!("{marker}\n{body}"), "> ", ">")
                }
            }

            Block::Details(details) => {
                let open = if details.open { " open" } else { "" };
                let body = self.blocks(&details.children);
                let summary = details.summary.trim();
                let mut out = format!("<details{open}>\n<summary>{summary}</summary>\n\n");
                if !body.is_empty() {
                    out.push_str(&body);
                    out.push_str("\n\n");
                }
                out.push_str("</details>");
                out
            }

            Block::List(list) => self.list(list, alternate),

            Block::ThematicBreak(_) => self.options.thematic_break.clone(),

            Block::Table(table) => self.table(table),

            Block::Definition(definition) => format!(
                "[{}]: {}{}",
                definition.label.replace('[', "\\[").replace(']', "\\]"),
                link_destination(&definition.url),
                link_title(definition.title.as_deref()),
            ),

            Block::Frontmatter(frontmatter) => {
                format!("---\n{}\n---", frontmatter.value.trim_matches('\n'))
            }

            Block::HtmlBlock(html) => html.value.trim_end_matches('\n').to_string(),

            Block::FootnoteDefinition(footnote) => {
                let body = self.blocks(&footnote.children);
                let mut lines = body.split('\n');
                let first = lines.next().unwrap_or("");
                let mut out = format!("[^{}]:", footnote.identifier);
                if !first.is_empty() {
                    out.push(' ');
                    out.push_str(first);
                }
                for line in lines {
                    out.push('\n');
                    if !line.is_empty() {
                        out.push_str("    ");
                        out.push_str(line);
                    }
                }
                out
            }
        }
    }

    fn list(&self, list: &List, alternate: bool) -> String {
        let start = list.start.unwrap_or(1);
        let bullet = if alternate {
            self.options.alternate_bullet()
        } else {
            self.options.bullet_marker
        };
        let delimiter = if alternate { ')' } else { '.' };

        let items: Vec<String> = list
            .children
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let marker = if list.ordered {
                    format!("{}{delimiter}", start as usize + index)
                } else {
                    bullet.to_string()
                };
                let task = match item.checked {
                    Some(true) => "[x] ",
                    Some(false) => "[ ] ",
                    None => "",
                };
                let body = self.join_blocks(&item.children, !list.spread);
                let indent = " ".repeat(marker.len() + 1);
                let mut lines = body.split('\n');
                let first = lines.next().unwrap_or("");
                let mut out = format!("{marker} {task}{first}").trim_end().to_string();
                for line in lines {
                    out.push('\n');
                    if !line.is_empty() {
                        out.push_str(&indent);
                        out.push_str(line);
                    }
                }
                out
            })
            .collect();

        items.join(if list.spread { "\n\n" } else { "\n" })
    }

    fn table(&self, table: &Table) -> String {
        let columns = table
            .rows
            .iter()
            .map(|row| row.cells.len())
            .chain(std::iter::once(table.align.len()))
            .max()
            .unwrap_or(0);
        if columns == 0 || table.rows.is_empty() {
            return String::new();
        }

        let render_row = |cells: Vec<String>| format!("| {} |", cells.join(" | "));
        let row_cells = |index: usize| -> Vec<String> {
            let row = &table.rows[index];
            (0..columns)
                .map(|column| {
                    row.cells
                        .get(column)
                        .map(|cell| {
                            self.inlines(&cell.children)
                                .replace('\n', " ")
                                .replace('|', "\\|")
                                .trim()
                                .to_string()
                        })
                        .unwrap_or_default()
                })
                .collect()
        };

        let separator: Vec<String> = (0..columns)
            .map(|column| {
                match table.align.get(column).copied().flatten() {
                    Some(Align::Left) => ":--",
                    Some(Align::Center) => ":-:",
                    Some(Align::Right) => "--:",
                    None => "---",
                }
                .to_string()
            })
            .collect();

        let mut lines = vec![render_row(row_cells(0)), render_row(separator)];
        lines.extend((1..table.rows.len()).map(|index| render_row(row_cells(index))));
        lines.join("\n")
    }

    /// Renders the phrasing content of one block.
    fn inlines(&self, inlines: &[Inline]) -> String {
        let hot = HotDelimiters::for_inlines(inlines);
        self.phrasing(inlines, hot)
    }

    fn phrasing(&self, inlines: &[Inline], hot: HotDelimiters) -> String {
        let mut pieces: Vec<String> = inlines
            .iter()
            .map(|inline| self.inline(inline, hot))
            .collect();
        // `_` does not open or close next to a letter or digit, `*` does.
        for index in 0..pieces.len() {
            let before = index.checked_sub(1).and_then(|i| pieces[i].chars().last());
            let after = pieces.get(index + 1).and_then(|piece| piece.chars().next());
            let piece = &pieces[index];
            let intraword = (piece.starts_with('_') && before.is_some_and(char::is_alphanumeric))
                || (piece.ends_with('_') && after.is_some_and(char::is_alphanumeric));
            if intraword {
                if let Some(starred) = self.starred(&inlines[index], hot) {
                    pieces[index] = starred;
                }
            }
        }
        pieces.concat()
    }

    /// Emphasis or strong rendered with `*` when its configured marker is `_`.
    fn starred(&self, inline: &Inline, hot: HotDelimiters) -> Option<String> {
        match inline {
            Inline::Emphasis(children) if self.options.emphasis_marker == '_' => {
                Some(self.wrap(children, "*", hot))
            }
            Inline::Strong(children) if self.options.strong_marker == '_' => {
                Some(self.wrap(children, "**", hot))
            }
            _ => None,
        }
    }

    fn inline(&self, inline: &Inline, hot: HotDelimiters) -> String {
        match inline {
            Inline::Text(text) => escape_text(&text.replace("  \n", "\n"), hot),
            Inline::Strong(children) => {
                let marker = self.options.strong_marker.to_string().repeat(2);
                self.wrap(children, &marker, hot)
            }
            Inline::Emphasis(children) => {
                self.wrap(children, &self.options.emphasis_marker.to_string(), hot)
            }
            Inline::Delete(children) => self.wrap(children, "~~", hot),
            Inline::Subscript(children) => self.wrap(children, "~", hot),
            Inline::Superscript(children) => self.wrap(children, "^", hot),
            Inline::Highlight(children) => self.wrap(children, "==", hot),
            Inline::Underline(children) => self.wrap(children, "++", hot),
            Inline::InlineCode(code) => code_span(code),
            Inline::Link(link) => {
                let text = crate::common::text::plain_text(&link.children);
                let autolink = link.title.is_none()
                    && !text.is_empty()
                    && matches!(link.children.as_slice(), [Inline::Text(_)])
                    && (link.url == text && has_scheme(&link.url)
                        || link.url.strip_prefix("mailto:") == Some(text.as_str()));
                if autolink {
                    format!("<{text}>")
                } else {
                    format!(
                        "[{}]({}{})",
                        self.phrasing(&link.children, hot),
                        link_destination(&link.url),
                        link_title(link.title.as_deref())
                    )
                }
            }
            Inline::Image(image) => format!(
                "![{}]({}{})",
                escape_text(&image.alt, hot),
                link_destination(&image.url),
                link_title(image.title.as_deref())
            ),
            Inline::Break => "\\\n".to_string(),
            Inline::InlineMath(value) if value.is_empty() => String::new(),
            Inline::InlineMath(value) => format!("${value}$"),
            Inline::WikiLink(link) => match &link.alias {
                Some(alias) => format!("[[{}|{alias}]]", link.value),
                None => format!("[[{}]]", link.value),
            },
            Inline::WikiEmbed(link) => match &link.alias {
                Some(alias) => format!("![[{}|{alias}]]", link.value),
                None => format!("![[{}]]", link.value),
            },
            Inline::FootnoteReference(identifier) => format!("[^{identifier}]"),
            Inline::LinkReference(reference) => format!(
                "[{}]{}",
                self.phrasing(&reference.children, hot),
                reference_suffix(reference.reference_type, &reference.label)
            ),
            Inline::ImageReference(reference) => format!(
                "![{}]{}",
                escape_text(&reference.alt, hot),
                reference_suffix(reference.reference_type, &reference.label)
            ),
            Inline::Html(html) => html.clone(),
        }
    }

    /// Wraps rendered children in a delimiter pair. Whitespace at the edges
    /// moves outside the delimiters, where it cannot block them.
    fn wrap(&self, children: &[Inline], delimiter: &str, hot: HotDelimiters) -> String {
        let inner = self.phrasing(children, hot);
        let trimmed = inner.trim_matches(|c: char| c == ' ' || c == '\t' || c == '\n');
        if trimmed.is_empty() {
            return inner;
        }
        let start = inner.len() - inner.trim_start_matches([' ', '\t', '\n']).len();
        let end = start + trimmed.len();
        format!(
            "{}{delimiter}{trimmed}{delimiter}{}",
            &inner[..start],
            &inner[end..]
        )
    }
}

fn has_scheme(url: &str) -> bool {
    ["http://", "https://", "ftp://", "mailto:"]
        .iter()
        .any(|scheme| url.starts_with(scheme))
}

fn reference_suffix(reference_type: ReferenceType, label: &str) -> String {
    match reference_type {
        ReferenceType::Full => format!("[{label}]"),
        ReferenceType::Collapsed => "[]".to_string(),
        ReferenceType::Shortcut => String::new(),
    }
}

fn prefix_lines(text: &str, prefix: &str, empty: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.is_empty() {
                empty.to_string()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapses three or more consecutive newlines into two, leaving fenced
/// code (possibly inside quotes or lists) untouched.
pub fn collapse_blank_lines(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut fence: Option<(char, usize)> = None;
    let mut blank_run = 0;

    for line in text.split('\n') {
        let content = line.trim_start_matches(|c: char| c == ' ' || c == '>' || c == '\t');
        let fence_char = content.chars().next().filter(|c| *c == '`' || *c == '~');
        let run = fence_char.map_or(0, |c| content.chars().take_while(|x| *x == c).count());

        match (fence, fence_char) {
            (None, Some(c)) if run >= 3 => fence = Some((c, run)),
            (Some((open, len)), Some(c))
                if c == open && run >= len && content.trim_end().len() == run =>
            {
                fence = None
            }
            _ => {}
        }

        if fence.is_none() && line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push(line);
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::nodes::{
        Alert, AlertType, Code, Definition, Details, Heading, ListItem, Paragraph, TableCell,
        TableRow, WikiLink,
    };
    use insta::assert_snapshot;

    fn render(blocks: Vec<Block>) -> String {
        serialize_ast(&Root { children: blocks }, &SerializeOptions::default())
    }

    fn paragraph(children: Vec<Inline>) -> Block {
        Block::Paragraph(Paragraph {
            children,
            position: None,
        })
    }

    fn text_paragraph(text: &str) -> Block {
        paragraph(vec![Inline::text(text)])
    }

    #[test]
    fn test_underscore_markers_fall_back_inside_words() {
        let options = SerializeOptions {
            emphasis_marker: '_',
            strong_marker: '_',
            ..Default::default()
        };
        let root = Root {
            children: vec![paragraph(vec![
                Inline::text("a"),
                Inline::Emphasis(vec![Inline::text("b")]),
                Inline::text("c "),
                Inline::Strong(vec![Inline::text("d")]),
                Inline::text("e "),
                Inline::Emphasis(vec![Inline::text("free")]),
                Inline::text(" end"),
            ])],
        };
        assert_eq!(serialize_ast(&root, &options), "a*b*c **d**e _free_ end\n");
    }

    #[test]
    fn test_extension_inlines() {
        let out = render(vec![paragraph(vec![
            Inline::text("H"),
            Inline::Subscript(vec![Inline::text("2")]),
            Inline::text("O, x"),
            Inline::Superscript(vec![Inline::text("2")]),
            Inline::text(" "),
            Inline::Highlight(vec![Inline::text("mark")]),
            Inline::text(" "),
            Inline::Underline(vec![Inline::text("under")]),
            Inline::text(" "),
            Inline::InlineMath("E=mc^2".to_string()),
            Inline::text(" "),
            Inline::WikiLink(WikiLink {
                value: "Page".to_string(),
                alias: Some("Alias".to_string()),
            }),
        ])]);
        assert_snapshot!(out.trim_end(), @"H~2~O, x^2^ ==mark== ++under++ $E=mc^2$ [[Page|Alias]]");
    }

    #[test]
    fn test_edge_whitespace_moves_outside_delimiters() {
        let out = render(vec![paragraph(vec![
            Inline::text("a"),
            Inline::Strong(vec![Inline::text(" bold ")]),
            Inline::text("b"),
        ])]);
        assert_eq!(out, "a **bold** b\n");
    }

    #[test]
    fn test_alert_and_details() {
        let out = render(vec![
            Block::Alert(Alert {
                alert_type: AlertType::Tip,
                children: vec![text_paragraph("Heads up")],
                position: None,
            }),
            Block::Details(Details {
                summary: "More".to_string(),
                open: true,
                children: vec![text_paragraph("Hidden")],
                position: None,
            }),
        ]);
        assert_snapshot!(out.trim_end(), @r"
        > [!TIP]
        > Heads up

        <details open>
        <summary>More</summary>

        Hidden

        </details>
        ");
    }

    #[test]
    fn test_table_separators() {
        let row = |cells: [&str; 3]| TableRow {
            cells: cells
                .iter()
                .map(|c| TableCell {
                    children: vec![Inline::text(*c)],
                })
                .collect(),
        };
        let out = render(vec![Block::Table(Table {
            align: vec![Some(Align::Left), Some(Align::Center), Some(Align::Right)],
            rows: vec![row(["a", "b", "c"]), row(["1", "2|3", "4"])],
            position: None,
        })]);
        assert_snapshot!(out.trim_end(), @r"
        | a | b | c |
        | :-- | :-: | --: |
        | 1 | 2\|3 | 4 |
        ");
    }

    #[test]
    fn test_lists() {
        let item = |text: &str, checked: Option<bool>| ListItem {
            checked,
            children: vec![text_paragraph(text)],
        };
        let bullets = Block::List(List {
            ordered: false,
            start: None,
            spread: false,
            children: vec![item("todo", Some(false)), item("done", Some(true))],
            position: None,
        });
        let numbers = Block::List(List {
            ordered: true,
            start: Some(3),
            spread: false,
            children: vec![item("c", None), item("d", None)],
            position: None,
        });
        let more_numbers = numbers.clone();
        let out = render(vec![bullets, numbers, more_numbers]);
        assert_snapshot!(out.trim_end(), @r"
        - [ ] todo
        - [x] done

        3. c
        4. d

        3) c
        4) d
        ");
    }

    #[test]
    fn test_code_math_definition_heading() {
        let out = render(vec![
            Block::Heading(Heading {
                depth: 2,
                children: vec![Inline::text("Setup")],
                position: None,
            }),
            Block::Code(Code {
                lang: Some("rust".to_string()),
                value: "let s = \"```\";".to_string(),
                position: None,
            }),
            Block::Math(crate::ir::nodes::MathBlock {
                value: "x^2".to_string(),
                position: None,
            }),
            Block::Definition(Definition {
                identifier: "id".to_string(),
                label: "id".to_string(),
                url: "https://x.com".to_string(),
                title: Some("T".to_string()),
                position: None,
            }),
        ]);
        assert_snapshot!(out.trim_end(), @r#"
        ## Setup

        ````rust
        let s = "```";
        ````

        $$
        x^2
        $$

        [id]: https://x.com "T"
        "#);
    }

    #[test]
    fn test_collapse_blank_lines_skips_fences() {
        assert_eq!(collapse_blank_lines("a\n\n\n\nb"), "a\n\nb");
        assert_eq!(
            collapse_blank_lines("```\nx\n\n\n\ny\n```\n\n\nz"),
            "```\nx\n\n\n\ny\n```\n\nz"
        );
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(render(vec![]), "");
    }
}
