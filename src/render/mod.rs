pub mod canvas;
pub mod glyphs;
pub mod image;
pub mod path;

use log::warn;
use pdf_writer::{Chunk, Content};

use crate::resources::PageResources;
use crate::util::context::Context;

/// The deepest element nesting the emitter follows. Anything beyond this is
/// skipped rather than recursed into.
const MAX_DEPTH: u32 = 64;

/// Render the children of a fixed page into a content stream, in document
/// order.
pub fn render_page(
    root: roxmltree::Node,
    chunk: &mut Chunk,
    content: &mut Content,
    ctx: &mut Context,
    resources: &PageResources,
) {
    for element in root.children().filter(|node| node.is_element()) {
        render_element(element, chunk, content, ctx, resources, 0);
    }
}

/// Write the appropriate instructions for one visual element into the content
/// stream. Property elements (dotted names) and resource dictionaries carry
/// no visuals of their own; unknown wrapper tags are traversed so their
/// descendants stay visible.
pub(crate) fn render_element(
    node: roxmltree::Node,
    chunk: &mut Chunk,
    content: &mut Content,
    ctx: &mut Context,
    resources: &PageResources,
    depth: u32,
) {
    let name = node.tag_name().name();
    if name.contains('.') || name == "ResourceDictionary" {
        return;
    }

    match name {
        "Canvas" => canvas::render(node, chunk, content, ctx, resources, depth),
        "Path" => path::render(node, chunk, content, ctx, resources),
        "Glyphs" => glyphs::render(node, chunk, content, ctx, resources),
        _ => {
            if depth >= MAX_DEPTH {
                warn!("element tree deeper than {MAX_DEPTH}, skipping subtree");
                return;
            }
            for child in node.children().filter(|child| child.is_element()) {
                render_element(child, chunk, content, ctx, resources, depth + 1);
            }
        }
    }
}
