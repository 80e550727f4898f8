//! Plain-text extraction from inline content.

use crate::ir::nodes::Inline;

/// Concatenates the visible text of `inlines`.
///
/// Formatting wrappers are transparent; code, math and wiki links contribute
/// their literal value; breaks become a single space.
pub fn plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    collect(inlines, &mut out);
    out
}

fn collect(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(text) | Inline::InlineCode(text) | Inline::InlineMath(text) => {
                out.push_str(text)
            }
            Inline::Strong(children)
            | Inline::Emphasis(children)
            | Inline::Delete(children)
            | Inline::Subscript(children)
            | Inline::Superscript(children)
            | Inline::Highlight(children)
            | Inline::Underline(children) => collect(children, out),
            Inline::Link(link) => collect(&link.children, out),
            Inline::LinkReference(reference) => collect(&reference.children, out),
            Inline::Image(image) => out.push_str(&image.alt),
            Inline::ImageReference(image) => out.push_str(&image.alt),
            Inline::WikiLink(link) | Inline::WikiEmbed(link) => {
                out.push_str(link.alias.as_deref().unwrap_or(&link.value))
            }
            Inline::Break => out.push(' '),
            Inline::FootnoteReference(_) | Inline::Html(_) => {}
        }
    }
}
