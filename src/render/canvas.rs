use log::warn;
use pdf_writer::{Chunk, Content};

use super::{render_element, MAX_DEPTH};
use crate::path_data::{parse_path_data, segments_are_finite};
use crate::render::path::draw_path;
use crate::resources::PageResources;
use crate::util::context::Context;
use crate::util::helper::{attr, parse_matrix, TransformExt};

/// Render a canvas group: one save/restore frame around its transform, its
/// clip and its children.
pub fn render(
    node: roxmltree::Node,
    chunk: &mut Chunk,
    content: &mut Content,
    ctx: &mut Context,
    resources: &PageResources,
    depth: u32,
) {
    if depth >= MAX_DEPTH {
        warn!("canvas nested deeper than {MAX_DEPTH}, skipping subtree");
        return;
    }

    content.save_state();

    if let Some(transform) = attr(&node, "RenderTransform").and_then(parse_matrix) {
        content.transform(transform.to_pdf_transform());
    }

    if let Some(clip) = attr(&node, "Clip") {
        let segments = parse_path_data(clip);
        if segments_are_finite(&segments) {
            draw_path(&segments, content);
            content.clip_nonzero();
            content.end_path();
        } else {
            warn!("ignoring canvas clip with malformed path data");
        }
    }

    for child in node.children().filter(|child| child.is_element()) {
        render_element(child, chunk, content, ctx, resources, depth + 1);
    }

    content.restore_state();
}
