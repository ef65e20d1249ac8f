use log::warn;
use pdf_writer::types::{LineCapStyle, LineJoinStyle};
use pdf_writer::{Chunk, Content, Finish};

use crate::path_data::{parse_path_data, segments_are_finite, PathSegment};
use crate::render::image;
use crate::resources::PageResources;
use crate::util::context::Context;
use crate::util::helper::{
    attr, parse_matrix, parse_number_list, static_resource_key, NameExt, RgbaColor,
    Transform, TransformExt,
};

/// Render a path element. A path without fill and stroke is a no-op; a
/// `{StaticResource}` fill paints the clipped image brush instead of a color.
pub fn render(
    node: roxmltree::Node,
    chunk: &mut Chunk,
    content: &mut Content,
    ctx: &mut Context,
    resources: &PageResources,
) {
    let fill = attr(&node, "Fill");
    let stroke = attr(&node, "Stroke");
    if fill.is_none() && stroke.is_none() {
        return;
    }

    let Some(data) = attr(&node, "Data") else { return };
    let segments = parse_path_data(data);
    if !segments_are_finite(&segments) {
        warn!("skipping path with malformed data");
        return;
    }

    let transform = attr(&node, "RenderTransform").and_then(parse_matrix);

    if let Some(key) = fill.and_then(static_resource_key) {
        let Some(brush) = resources.brushes.get(key) else {
            warn!("image brush `{key}` is not defined, skipping path");
            return;
        };
        image::render(key, brush, &segments, transform, chunk, content, ctx);
        if let Some(stroke) = stroke {
            stroke_pass(&node, stroke, &segments, transform, chunk, content, ctx);
        }
        return;
    }

    let fill_color = fill.map(|value| RgbaColor::parse(value).unwrap_or(RgbaColor::BLACK));
    let stroke_color =
        stroke.map(|value| RgbaColor::parse(value).unwrap_or(RgbaColor::BLACK));

    content.save_state();
    if let Some(transform) = transform {
        content.transform(transform.to_pdf_transform());
    }
    set_opacities(stroke_color, fill_color, chunk, content, ctx);

    if let Some(color) = stroke_color {
        set_stroke(&node, color, content);
    }
    if let Some(color) = fill_color {
        let [r, g, b] = color.to_array();
        content.set_fill_rgb(r, g, b);
    }

    draw_path(&segments, content);
    finish_path(stroke_color.is_some(), fill_color.is_some(), content);
    content.restore_state();
}

/// The stroke pass over an image-brush filled path.
#[allow(clippy::too_many_arguments)]
fn stroke_pass(
    node: &roxmltree::Node,
    stroke: &str,
    segments: &[PathSegment],
    transform: Option<Transform>,
    chunk: &mut Chunk,
    content: &mut Content,
    ctx: &mut Context,
) {
    let color = RgbaColor::parse(stroke).unwrap_or(RgbaColor::BLACK);

    content.save_state();
    if let Some(transform) = transform {
        content.transform(transform.to_pdf_transform());
    }
    set_opacities(Some(color), None, chunk, content, ctx);
    set_stroke(node, color, content);
    draw_path(segments, content);
    content.stroke();
    content.restore_state();
}

/// Replay parsed path segments into the content stream.
pub(crate) fn draw_path(segments: &[PathSegment], content: &mut Content) {
    for segment in segments {
        match *segment {
            PathSegment::MoveTo(x, y) => content.move_to(x as f32, y as f32),
            PathSegment::LineTo(x, y) => content.line_to(x as f32, y as f32),
            PathSegment::CurveTo(x1, y1, x2, y2, x, y) => content.cubic_to(
                x1 as f32,
                y1 as f32,
                x2 as f32,
                y2 as f32,
                x as f32,
                y as f32,
            ),
            PathSegment::ClosePath => content.close_path(),
        };
    }
}

fn finish_path(stroke: bool, fill: bool, content: &mut Content) {
    match (stroke, fill) {
        (true, true) => content.fill_nonzero_and_stroke(),
        (false, true) => content.fill_nonzero(),
        (true, false) => content.stroke(),
        (false, false) => content.end_path(),
    };
}

/// Route translucent colors through an `ExtGState` parameter.
pub(crate) fn set_opacities(
    stroke: Option<RgbaColor>,
    fill: Option<RgbaColor>,
    chunk: &mut Chunk,
    content: &mut Content,
    ctx: &mut Context,
) {
    let stroke_alpha = stroke.map(|c| c.alpha).filter(|a| *a < 1.0);
    let fill_alpha = fill.map(|c| c.alpha).filter(|a| *a < 1.0);
    if stroke_alpha.is_none() && fill_alpha.is_none() {
        return;
    }

    let gs_ref = ctx.alloc_ref();
    let mut gs = chunk.ext_graphics(gs_ref);
    if let Some(alpha) = stroke_alpha {
        gs.stroking_alpha(alpha);
    }
    if let Some(alpha) = fill_alpha {
        gs.non_stroking_alpha(alpha);
    }
    gs.finish();
    content.set_parameters(ctx.deferrer.add_graphics_state(gs_ref).to_pdf_name());
}

/// Apply the stroke pen attributes before the path is emitted.
fn set_stroke(node: &roxmltree::Node, color: RgbaColor, content: &mut Content) {
    let [r, g, b] = color.to_array();
    content.set_stroke_rgb(r, g, b);

    let thickness = attr(node, "StrokeThickness")
        .and_then(|v| v.trim().parse::<f32>().ok())
        .unwrap_or(1.0);
    content.set_line_width(thickness);

    let cap = attr(node, "StrokeEndLineCap").or_else(|| attr(node, "StrokeStartLineCap"));
    content.set_line_cap(match cap {
        Some("Round") => LineCapStyle::RoundCap,
        Some("Square") => LineCapStyle::ProjectingSquareCap,
        _ => LineCapStyle::ButtCap,
    });

    content.set_line_join(match attr(node, "StrokeLineJoin") {
        Some("Round") => LineJoinStyle::RoundJoin,
        Some("Bevel") => LineJoinStyle::BevelJoin,
        _ => LineJoinStyle::MiterJoin,
    });

    let miter_limit = attr(node, "StrokeMiterLimit")
        .and_then(|v| v.trim().parse::<f32>().ok())
        .unwrap_or(10.0);
    content.set_miter_limit(miter_limit);

    if let Some(dashes) = attr(node, "StrokeDashArray") {
        // The identity pattern disables dashing.
        if dashes.trim() != "1 0" {
            let offset = attr(node, "StrokeDashOffset")
                .and_then(|v| v.trim().parse::<f32>().ok())
                .unwrap_or(0.0);
            let pattern: Vec<f32> =
                parse_number_list(dashes).iter().map(|v| v * thickness).collect();
            content.set_dash_pattern(pattern, (offset * thickness).abs());
        }
    }
}
