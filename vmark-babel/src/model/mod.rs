//! The editable document model.
//!
//! [`nodes`] holds the node vocabulary, [`schema`] the node sets a target
//! editor accepts. Documents are built by [`crate::ir::to_model`] and read
//! back by [`crate::ir::from_model`].

pub mod nodes;
pub mod schema;

pub use nodes::{Block, Document, Inline, InlineNode, Mark, MATH_SENTINEL};
pub use schema::{NodeType, Schema};

/// Visible text of a run of inline leaves.
pub fn inline_text(inlines: &[Inline]) -> String {
    inlines
        .iter()
        .map(|inline| match &inline.node {
            InlineNode::Text { text } => text.as_str(),
            InlineNode::HardBreak => " ",
            InlineNode::Image { alt, .. } => alt.as_str(),
            InlineNode::MathInline { content } => content.as_str(),
            InlineNode::WikiLink { value, alias } | InlineNode::WikiEmbed { value, alias } => {
                alias.as_deref().unwrap_or(value)
            }
            InlineNode::FootnoteReference { .. } | InlineNode::HtmlInline { .. } => "",
        })
        .collect()
}

/// Visible text of a block, children joined by spaces.
pub fn block_text(block: &Block) -> String {
    let join = |blocks: &[Block]| {
        blocks
            .iter()
            .map(block_text)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    };
    match block {
        Block::Paragraph(p) => inline_text(&p.content),
        Block::Heading(h) => inline_text(&h.content),
        Block::CodeBlock(code) => code.text.clone(),
        Block::Blockquote(quote) => join(&quote.content),
        Block::AlertBlock(alert) => join(alert.content()),
        Block::DetailsBlock(details) => join(details.content()),
        Block::BulletList(list) | Block::OrderedList(list) => list
            .items
            .iter()
            .map(|item| join(&item.content))
            .collect::<Vec<_>>()
            .join(" "),
        Block::Table(table) => table
            .rows
            .iter()
            .flat_map(|row| row.cells.iter())
            .map(|cell| join(&cell.body().content))
            .collect::<Vec<_>>()
            .join(" "),
        Block::BlockImage(image) => image.alt.clone(),
        Block::FootnoteDefinition(footnote) => join(&footnote.content),
        Block::HorizontalRule
        | Block::LinkDefinition(_)
        | Block::Frontmatter(_)
        | Block::HtmlBlock(_) => String::new(),
    }
}
