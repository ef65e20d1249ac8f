use image::{DynamicImage, ImageFormat, Luma, Rgb, Rgba};
use log::warn;
use miniz_oxide::deflate::{compress_to_vec_zlib, CompressionLevel};
use pdf_writer::{Chunk, Content, Filter, Finish};
use std::rc::Rc;

use crate::path_data::PathSegment;
use crate::render::path::draw_path;
use crate::resources::ImageBrush;
use crate::util::context::Context;
use crate::util::helper::{NameExt, Transform, TransformExt};

/// The viewport an image brush paints into when it does not declare one.
const DEFAULT_VIEWPORT: [f32; 4] = [0.0, 0.0, 100.0, 100.0];

/// Fill a path with an image brush: the path becomes the clip, then the
/// brush's image is placed into its viewport.
#[allow(clippy::too_many_arguments)]
pub(crate) fn render(
    key: &str,
    brush: &ImageBrush,
    segments: &[PathSegment],
    path_transform: Option<Transform>,
    chunk: &mut Chunk,
    content: &mut Content,
    ctx: &mut Context,
) {
    content.save_state();

    if let Some(transform) = path_transform {
        content.transform(transform.to_pdf_transform());
    }

    draw_path(segments, content);
    content.clip_nonzero();
    content.end_path();

    if let Some(transform) = &brush.transform {
        content.transform(transform.to_pdf_transform());
    }

    if let Some((name, width, height)) = x_object(key, &brush.image, chunk, ctx) {
        let viewport = brush.viewport.unwrap_or(DEFAULT_VIEWPORT);
        place_image(viewport, brush.viewbox, (width, height), content);
        content.x_object(name.to_pdf_name());
    }

    content.restore_state();
}

/// Map the image XObject's unit square into the brush viewport. When a
/// viewbox is declared, the image keeps its natural size and the viewbox
/// region is scaled onto the viewport instead.
fn place_image(
    viewport: [f32; 4],
    viewbox: Option<[f32; 4]>,
    size: (u32, u32),
    content: &mut Content,
) {
    let [x, y, width, height] = viewport;
    content.transform(Transform::translate(x, y).to_pdf_transform());

    match viewbox.filter(|b| b[2] > 0.0 && b[3] > 0.0) {
        Some([vb_x, vb_y, vb_width, vb_height]) => {
            content.transform(
                Transform::new(width / vb_width, 0.0, 0.0, height / vb_height, 0.0, 0.0)
                    .to_pdf_transform(),
            );
            content.transform(Transform::translate(-vb_x, -vb_y).to_pdf_transform());
            let (image_width, image_height) = (size.0 as f32, size.1 as f32);
            content.transform(
                Transform::new(image_width, 0.0, 0.0, -image_height, 0.0, image_height)
                    .to_pdf_transform(),
            );
        }
        None => {
            content.transform(
                Transform::new(width, 0.0, 0.0, -height, 0.0, height).to_pdf_transform(),
            );
        }
    }
}

/// The image XObject for a brush, created on first use and cached under the
/// brush key afterwards.
fn x_object(
    key: &str,
    data: &[u8],
    chunk: &mut Chunk,
    ctx: &mut Context,
) -> Option<(Rc<String>, u32, u32)> {
    if let Some(cached) = ctx.images.get(key) {
        return cached.clone();
    }

    let created = create_raster_image(data, chunk, ctx);
    if created.is_none() {
        warn!("image brush `{key}` could not be decoded");
    }
    ctx.images.insert(key.to_string(), created.clone());
    created
}

fn create_raster_image(
    data: &[u8],
    chunk: &mut Chunk,
    ctx: &mut Context,
) -> Option<(Rc<String>, u32, u32)> {
    let format = image::guess_format(data).ok()?;
    let dynamic_image = image::load_from_memory_with_format(data, format).ok()?;

    // JPEG streams can be embedded as-is; everything else is re-encoded as
    // zlib raster samples with the alpha channel split into a soft mask.
    let (samples, filter, alpha_mask) = match format {
        ImageFormat::Jpeg => (data.to_vec(), Filter::DctDecode, None),
        _ => {
            let (samples, mask) = split_samples(&dynamic_image);
            let level = CompressionLevel::DefaultLevel as u8;
            (
                compress_to_vec_zlib(&samples, level),
                Filter::FlateDecode,
                mask.map(|m| compress_to_vec_zlib(&m, level)),
            )
        }
    };

    let color = dynamic_image.color();
    let width = dynamic_image.width();
    let height = dynamic_image.height();

    let soft_mask_id = alpha_mask.map(|mask_bytes| {
        let soft_mask_id = ctx.alloc_ref();
        let mut s_mask = chunk.image_xobject(soft_mask_id, &mask_bytes);
        s_mask.filter(filter);
        s_mask.width(width as i32);
        s_mask.height(height as i32);
        s_mask.color_space().device_gray();
        s_mask.bits_per_component(8);
        s_mask.finish();
        soft_mask_id
    });

    let image_id = ctx.alloc_ref();
    let name = ctx.deferrer.add_x_object(image_id);

    let mut image_x_object = chunk.image_xobject(image_id, &samples);
    image_x_object.filter(filter);
    image_x_object.width(width as i32);
    image_x_object.height(height as i32);

    let color_space = image_x_object.color_space();
    if color.has_color() {
        color_space.device_rgb();
    } else {
        color_space.device_gray();
    }

    image_x_object.bits_per_component(8);
    if let Some(soft_mask_id) = soft_mask_id {
        image_x_object.s_mask(soft_mask_id);
    }
    image_x_object.finish();

    Some((name, width, height))
}

/// Flatten a decoded image into 8-bit color samples plus an optional alpha
/// mask.
fn split_samples(image: &DynamicImage) -> (Vec<u8>, Option<Vec<u8>>) {
    let color = image.color();

    let samples: Vec<u8> = if color.has_color() {
        image.to_rgb8().pixels().flat_map(|&Rgb(c)| c).collect()
    } else {
        image.to_luma8().pixels().flat_map(|&Luma(c)| c).collect()
    };

    let mask: Option<Vec<u8>> = color
        .has_alpha()
        .then(|| image.to_rgba8().pixels().map(|&Rgba([.., a])| a).collect());

    (samples, mask)
}
