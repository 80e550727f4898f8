//! Reference-style link resolution.
//!
//! Runs in two passes over a markdown tree:
//! 1. collect every `definition` into a table keyed by normalized identifier
//!    (the first definition of an identifier wins),
//! 2. replace each `linkReference` / `imageReference` whose identifier is in
//!    the table with an equivalent direct `link` / `image`.
//!
//! Unknown identifiers leave the reference node untouched; the model converter
//! turns such orphans into literal bracket text. Definitions stay in the tree
//! so serialization writes them back out.

use crate::ir::nodes::{Block, Image, Inline, Link, Root};
use std::collections::HashMap;

/// Target of a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionTarget {
    pub url: String,
    pub title: Option<String>,
}

/// Lookup table of the definitions found in one document.
#[derive(Debug, Clone, Default)]
pub struct DefinitionTable {
    entries: HashMap<String, DefinitionTarget>,
}

impl DefinitionTable {
    /// Collects all definitions of `root`, including nested ones.
    pub fn collect(root: &Root) -> Self {
        let mut table = DefinitionTable::default();
        table.collect_blocks(&root.children);
        table
    }

    fn collect_blocks(&mut self, blocks: &[Block]) {
        for block in blocks {
            match block {
                Block::Definition(def) => {
                    self.entries
                        .entry(def.identifier.clone())
                        .or_insert_with(|| DefinitionTarget {
                            url: def.url.clone(),
                            title: def.title.clone(),
                        });
                }
                Block::Blockquote(quote) => self.collect_blocks(&quote.children),
                Block::Alert(alert) => self.collect_blocks(&alert.children),
                Block::Details(details) => self.collect_blocks(&details.children),
                Block::FootnoteDefinition(footnote) => self.collect_blocks(&footnote.children),
                Block::List(list) => {
                    for item in &list.children {
                        self.collect_blocks(&item.children);
                    }
                }
                _ => {}
            }
        }
    }

    /// Looks up an already-normalized identifier.
    pub fn get(&self, identifier: &str) -> Option<&DefinitionTarget> {
        self.entries.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves reference-style links and images in place.
pub fn resolve_references(root: &mut Root) {
    let table = DefinitionTable::collect(root);
    if table.is_empty() {
        return;
    }
    resolve_blocks(&mut root.children, &table);
}

/// Owned variant of [`resolve_references`].
pub fn resolve(mut root: Root) -> Root {
    resolve_references(&mut root);
    root
}

fn resolve_blocks(blocks: &mut [Block], table: &DefinitionTable) {
    for block in blocks {
        match block {
            Block::Paragraph(p) => resolve_inlines(&mut p.children, table),
            Block::Heading(h) => resolve_inlines(&mut h.children, table),
            Block::Blockquote(quote) => resolve_blocks(&mut quote.children, table),
            Block::Alert(alert) => resolve_blocks(&mut alert.children, table),
            Block::Details(details) => resolve_blocks(&mut details.children, table),
            Block::FootnoteDefinition(footnote) => resolve_blocks(&mut footnote.children, table),
            Block::List(list) => {
                for item in &mut list.children {
                    resolve_blocks(&mut item.children, table);
                }
            }
            Block::Table(t) => {
                for row in &mut t.rows {
                    for cell in &mut row.cells {
                        resolve_inlines(&mut cell.children, table);
                    }
                }
            }
            Block::Code(_)
            | Block::Math(_)
            | Block::ThematicBreak(_)
            | Block::Definition(_)
            | Block::Frontmatter(_)
            | Block::HtmlBlock(_) => {}
        }
    }
}

fn resolve_inlines(inlines: &mut [Inline], table: &DefinitionTable) {
    for inline in inlines.iter_mut() {
        let replacement = match inline {
            Inline::LinkReference(reference) => {
                resolve_inlines(&mut reference.children, table);
                table.get(&reference.identifier).map(|target| {
                    Inline::Link(Link {
                        url: target.url.clone(),
                        title: target.title.clone(),
                        children: std::mem::take(&mut reference.children),
                    })
                })
            }
            Inline::ImageReference(reference) => table.get(&reference.identifier).map(|target| {
                Inline::Image(Image {
                    url: target.url.clone(),
                    alt: std::mem::take(&mut reference.alt),
                    title: target.title.clone(),
                })
            }),
            Inline::Strong(children)
            | Inline::Emphasis(children)
            | Inline::Delete(children)
            | Inline::Subscript(children)
            | Inline::Superscript(children)
            | Inline::Highlight(children)
            | Inline::Underline(children) => {
                resolve_inlines(children, table);
                None
            }
            Inline::Link(link) => {
                resolve_inlines(&mut link.children, table);
                None
            }
            _ => None,
        };

        if let Some(resolved) = replacement {
            *inline = resolved;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::nodes::{
        Definition, ImageReference, LinkReference, Paragraph, ReferenceType,
    };

    fn definition(label: &str, url: &str, title: Option<&str>) -> Block {
        Block::Definition(Definition {
            identifier: crate::ir::nodes::normalize_identifier(label),
            label: label.to_string(),
            url: url.to_string(),
            title: title.map(str::to_string),
            position: None,
        })
    }

    fn paragraph(children: Vec<Inline>) -> Block {
        Block::Paragraph(Paragraph {
            children,
            position: None,
        })
    }

    #[test]
    fn test_resolves_link_reference() {
        let mut root = Root {
            children: vec![
                paragraph(vec![Inline::LinkReference(LinkReference {
                    identifier: "id".to_string(),
                    label: "ID".to_string(),
                    reference_type: ReferenceType::Full,
                    children: vec![Inline::text("text")],
                })]),
                definition("ID", "https://x.com", Some("T")),
            ],
        };

        resolve_references(&mut root);

        match &root.children[0] {
            Block::Paragraph(p) => match &p.children[0] {
                Inline::Link(link) => {
                    assert_eq!(link.url, "https://x.com");
                    assert_eq!(link.title.as_deref(), Some("T"));
                    assert_eq!(link.children, vec![Inline::text("text")]);
                }
                other => panic!("expected link, got {other:?}"),
            },
            other => panic!("expected paragraph, got {other:?}"),
        }
        assert!(matches!(root.children[1], Block::Definition(_)));
    }

    #[test]
    fn test_missing_definition_leaves_reference() {
        let reference = Inline::LinkReference(LinkReference {
            identifier: "missing".to_string(),
            label: "missing".to_string(),
            reference_type: ReferenceType::Full,
            children: vec![Inline::text("text")],
        });
        let mut root = Root {
            children: vec![
                paragraph(vec![reference.clone()]),
                definition("other", "/x", None),
            ],
        };

        resolve_references(&mut root);

        match &root.children[0] {
            Block::Paragraph(p) => assert_eq!(p.children[0], reference),
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn test_resolves_image_reference_and_first_definition_wins() {
        let mut root = Root {
            children: vec![
                paragraph(vec![Inline::ImageReference(ImageReference {
                    identifier: "logo".to_string(),
                    label: "logo".to_string(),
                    reference_type: ReferenceType::Collapsed,
                    alt: "Logo".to_string(),
                })]),
                definition("logo", "/first.png", None),
                definition("LOGO", "/second.png", None),
            ],
        };

        resolve_references(&mut root);

        match &root.children[0] {
            Block::Paragraph(p) => match &p.children[0] {
                Inline::Image(image) => {
                    assert_eq!(image.url, "/first.png");
                    assert_eq!(image.alt, "Logo");
                }
                other => panic!("expected image, got {other:?}"),
            },
            other => panic!("expected paragraph, got {other:?}"),
        }
    }
}
