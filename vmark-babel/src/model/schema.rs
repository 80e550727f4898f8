//! Target schema for document conversion.
//!
//! The editing surfaces may run with a reduced node vocabulary. The
//! converters consult the schema before emitting a node; unsupported nodes
//! are skipped (or degraded, see the converter docs) so a partial schema still
//! yields a best-effort document instead of an error.

use std::collections::BTreeSet;

/// Every node type the document model knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeType {
    Paragraph,
    Heading,
    CodeBlock,
    Blockquote,
    AlertBlock,
    DetailsBlock,
    BulletList,
    OrderedList,
    ListItem,
    HorizontalRule,
    Table,
    BlockImage,
    LinkDefinition,
    Frontmatter,
    HtmlBlock,
    FootnoteDefinition,
    HardBreak,
    Image,
    MathInline,
    WikiLink,
    WikiEmbed,
    FootnoteReference,
    HtmlInline,
}

impl NodeType {
    pub const ALL: [NodeType; 23] = [
        NodeType::Paragraph,
        NodeType::Heading,
        NodeType::CodeBlock,
        NodeType::Blockquote,
        NodeType::AlertBlock,
        NodeType::DetailsBlock,
        NodeType::BulletList,
        NodeType::OrderedList,
        NodeType::ListItem,
        NodeType::HorizontalRule,
        NodeType::Table,
        NodeType::BlockImage,
        NodeType::LinkDefinition,
        NodeType::Frontmatter,
        NodeType::HtmlBlock,
        NodeType::FootnoteDefinition,
        NodeType::HardBreak,
        NodeType::Image,
        NodeType::MathInline,
        NodeType::WikiLink,
        NodeType::WikiEmbed,
        NodeType::FootnoteReference,
        NodeType::HtmlInline,
    ];
}

/// The set of node types a target editor accepts.
///
/// Paragraphs and text are always accepted: they are the fallback every
/// degraded construct ends up in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    nodes: BTreeSet<NodeType>,
}

impl Schema {
    /// A schema accepting the whole vocabulary.
    pub fn full() -> Self {
        Schema {
            nodes: NodeType::ALL.into_iter().collect(),
        }
    }

    /// A schema accepting only the listed node types (plus paragraphs).
    pub fn with_nodes(nodes: impl IntoIterator<Item = NodeType>) -> Self {
        let mut nodes: BTreeSet<NodeType> = nodes.into_iter().collect();
        nodes.insert(NodeType::Paragraph);
        Schema { nodes }
    }

    /// Returns a copy of this schema without `node`.
    pub fn without(mut self, node: NodeType) -> Self {
        if node != NodeType::Paragraph {
            self.nodes.remove(&node);
        }
        self
    }

    pub fn supports(&self, node: NodeType) -> bool {
        self.nodes.contains(&node)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::full()
    }
}
