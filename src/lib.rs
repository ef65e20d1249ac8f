/*! Convert DWFx documents to PDF files.

DWFx is the XPS-derived, ZIP-packaged format produced by Autodesk Design
Review. This crate opens the package, walks the fixed document structure to
the first page, and transcodes that page's markup — paths, glyph runs, image
brushes — into a PDF with the same visual layout.

## Example

```no_run
use std::path::Path;

dwfx2pdf::convert(Path::new("drawing.dwfx"), Path::new("drawing.pdf"))?;
# Ok::<(), dwfx2pdf::ConversionError>(())
```

Conversion is best-effort by design: broken resources, malformed path data
and unusable fonts degrade the page instead of failing it. Only a package
that cannot be navigated at all aborts the conversion.
*/

mod odttf;
pub mod package;
mod path_data;
mod render;
mod resources;
pub mod structure;
mod util;

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use pdf_writer::{Content, Filter, Finish, Pdf, Rect, Ref};
use thiserror::Error;

use crate::package::DwfxPackage;
use crate::util::context::Context;
use crate::util::helper::attr;

/// The factor mapping 1/96 inch XPS units to 1/72 inch PDF points.
const PT_PER_UNIT: f32 = 72.0 / 96.0;

/// Page size used when a fixed page declares no dimensions (US letter at
/// 96 DPI).
const DEFAULT_PAGE_WIDTH: f32 = 816.0;
const DEFAULT_PAGE_HEIGHT: f32 = 1056.0;

/// Options for the conversion.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Whether the content streams should be compressed.
    pub compress: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self { compress: true }
    }
}

/// A fatal conversion failure. Everything recoverable is handled inside the
/// transcoder by skipping the affected element.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The container is not a ZIP archive or its document structure is
    /// broken.
    #[error("invalid DWFx package: {0}")]
    PackageInvalid(String),
    /// The package declares no pages.
    #[error("no pages found in DWFx file")]
    NoPages,
    /// The finished PDF could not be written.
    #[error("failed to write output: {0}")]
    OutputWrite(#[from] std::io::Error),
}

/// Convert a DWFx file into a PDF file.
pub fn convert(input: &Path, output: &Path) -> Result<(), ConversionError> {
    convert_with_options(input, output, Options::default())
}

/// Convert a DWFx file into a PDF file with explicit options.
pub fn convert_with_options(
    input: &Path,
    output: &Path,
    options: Options,
) -> Result<(), ConversionError> {
    let file = File::open(input)
        .map_err(|err| ConversionError::PackageInvalid(err.to_string()))?;
    let mut package = DwfxPackage::open(BufReader::new(file))?;
    let pdf = convert_package(&mut package, options)?;
    std::fs::write(output, pdf)?;
    Ok(())
}

/// Convert an in-memory DWFx container into PDF bytes.
pub fn convert_bytes(data: &[u8], options: Options) -> Result<Vec<u8>, ConversionError> {
    let mut package = DwfxPackage::open(Cursor::new(data))?;
    convert_package(&mut package, options)
}

/// Transcode the first page of an open package.
fn convert_package<R: Read + Seek>(
    package: &mut DwfxPackage<R>,
    options: Options,
) -> Result<Vec<u8>, ConversionError> {
    let pages = structure::find_pages(package)?;
    let page_ref = pages.first().ok_or(ConversionError::NoPages)?;

    let markup = package.read_text(&page_ref.fpage_path).ok_or_else(|| {
        ConversionError::PackageInvalid(format!(
            "unreadable page part {}",
            page_ref.fpage_path
        ))
    })?;
    let page = roxmltree::Document::parse(&markup).map_err(|err| {
        ConversionError::PackageInvalid(format!(
            "invalid page markup in {}: {err}",
            page_ref.fpage_path
        ))
    })?;

    let root = page.root_element();
    let width = attr(&root, "Width")
        .and_then(|v| v.trim().parse::<f32>().ok())
        .unwrap_or(DEFAULT_PAGE_WIDTH);
    let height = attr(&root, "Height")
        .and_then(|v| v.trim().parse::<f32>().ok())
        .unwrap_or(DEFAULT_PAGE_HEIGHT);

    let resources = resources::collect(package, &page, &page_ref.base_path);

    let mut pdf = Pdf::new();
    let catalog_id = Ref::new(1);
    let page_tree_id = Ref::new(2);
    let page_id = Ref::new(3);
    let content_id = Ref::new(4);

    pdf.catalog(catalog_id).pages(page_tree_id);
    pdf.pages(page_tree_id).kids([page_id]).count(1);

    let mut ctx = Context::new(options, 5);
    ctx.deferrer.push();

    let height_pt = height * PT_PER_UNIT;

    let mut content = Content::new();
    content.save_state();
    // The single global transform: 96 DPI units to points, with the y axis
    // flipped so XPS top-down coordinates land on the PDF page upright.
    content.transform([PT_PER_UNIT, 0.0, 0.0, -PT_PER_UNIT, 0.0, height_pt]);
    render::render_page(root, &mut pdf, &mut content, &mut ctx, &resources);
    content.restore_state();
    let content_data = ctx.finish_content(content);

    render::glyphs::write_fonts(&mut pdf, &mut ctx);

    let mut page = pdf.page(page_id);
    page.media_box(Rect::new(0.0, 0.0, width * PT_PER_UNIT, height_pt));
    page.parent(page_tree_id);
    page.contents(content_id);

    let mut page_resources = page.resources();
    ctx.deferrer.pop(&mut page_resources);
    page_resources.finish();
    page.finish();

    let mut stream = pdf.stream(content_id, &content_data);
    if options.compress {
        stream.filter(Filter::FlateDecode);
    }
    stream.finish();

    Ok(pdf.finish())
}
