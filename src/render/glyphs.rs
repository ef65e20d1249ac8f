use std::collections::BTreeMap;
use std::hash::Hash;

use log::warn;
use pdf_writer::types::{CidFontType, FontFlags, SystemInfo, UnicodeCmap};
use pdf_writer::{Chunk, Content, Filter, Finish, Name, Rect, Str};
use siphasher::sip128::{Hasher128, SipHasher13};
use std::rc::Rc;
use ttf_parser::{name_id, Face, GlyphId, Tag};

use crate::render::path::set_opacities;
use crate::resources::PageResources;
use crate::util::context::{Context, Font};
use crate::util::helper::{attr, deflate, NameExt, RgbaColor};

const CFF: Tag = Tag::from_bytes(b"CFF ");
const CFF2: Tag = Tag::from_bytes(b"CFF2");

const SUBSET_TAG_LEN: usize = 6;
const IDENTITY_H: &str = "Identity-H";

const CMAP_NAME: Name = Name(b"Custom");
const SYSTEM_INFO: SystemInfo = SystemInfo {
    registry: Str(b"Adobe"),
    ordering: Str(b"Identity"),
    supplement: 0,
};

/// The em-box fraction between a run's anchor and its baseline. True
/// baseline metrics would need the font's vertical tables.
const BASELINE_RATIO: f32 = 0.8;

/// Render a glyph run as positioned PDF text. Runs whose font cannot be used
/// fall back to Helvetica rather than disappearing.
pub fn render(
    node: roxmltree::Node,
    chunk: &mut Chunk,
    content: &mut Content,
    ctx: &mut Context,
    resources: &PageResources,
) {
    let Some(text) = attr(&node, "UnicodeString").filter(|t| !t.is_empty()) else {
        return;
    };

    let fill = attr(&node, "Fill")
        .and_then(RgbaColor::parse)
        .unwrap_or(RgbaColor::BLACK);
    let em_size = attr(&node, "FontRenderingEmSize")
        .and_then(|v| v.trim().parse::<f32>().ok())
        .unwrap_or(12.0);
    let origin_x = attr(&node, "OriginX")
        .and_then(|v| v.trim().parse::<f32>().ok())
        .unwrap_or(0.0);
    let origin_y = attr(&node, "OriginY")
        .and_then(|v| v.trim().parse::<f32>().ok())
        .unwrap_or(0.0);

    let run_y = origin_y - BASELINE_RATIO * em_size;

    // Resolve the face and encode the string before anything is emitted, so
    // a failed run leaves the stream untouched.
    let (name, bytes) = match encoded_run(&node, text, ctx, resources) {
        Some(run) => run,
        None => (ctx.fallback_font().0, latin1_bytes(text)),
    };

    content.save_state();
    set_opacities(None, Some(fill), chunk, content, ctx);
    let [r, g, b] = fill.to_array();
    content.set_fill_rgb(r, g, b);

    content.begin_text();
    content.set_font(name.to_pdf_name(), em_size);
    // The text matrix re-flips the y axis so glyphs are upright inside the
    // page's global flip.
    content.set_text_matrix([1.0, 0.0, 0.0, -1.0, origin_x, run_y]);
    content.show(Str(&bytes));
    content.end_text();

    content.restore_state();
}

/// Encode the run against its embedded font, registering the font on first
/// use. Returns the font's resource name and the CID-encoded string.
fn encoded_run(
    node: &roxmltree::Node,
    text: &str,
    ctx: &mut Context,
    resources: &PageResources,
) -> Option<(Rc<String>, Vec<u8>)> {
    let uri = attr(node, "FontUri")?;
    let data = resources.fonts.get(uri)?;

    let key = hash128(&uri);
    if !ctx.fonts.contains_key(&key) {
        let registered = match Face::parse(data, 0) {
            Ok(face) => {
                let reference = ctx.deferrer.alloc_ref();
                let name = ctx.deferrer.add_font(reference);
                Some(Font {
                    reference,
                    name,
                    face_data: data.clone(),
                    units_per_em: face.units_per_em(),
                    glyph_set: BTreeMap::new(),
                })
            }
            Err(err) => {
                warn!("failed to register font {uri}: {err}");
                None
            }
        };
        ctx.fonts.insert(key, registered);
    }

    let font = ctx.fonts.get_mut(&key)?.as_mut()?;
    let face = Face::parse(&font.face_data, 0).ok()?;

    let mut bytes = Vec::with_capacity(text.len() * 2);
    for ch in text.chars() {
        // Characters without a cmap entry show as the missing glyph.
        let gid = face.glyph_index(ch).unwrap_or(GlyphId(0));
        font.glyph_set.entry(gid.0).or_insert_with(|| ch.to_string());
        bytes.extend([(gid.0 >> 8) as u8, (gid.0 & 0xff) as u8]);
    }

    Some((font.name.clone(), bytes))
}

/// Write all font objects registered during the conversion into the chunk.
pub fn write_fonts(chunk: &mut Chunk, ctx: &mut Context) {
    let fonts = std::mem::take(&mut ctx.fonts);
    for font in fonts.into_values().flatten() {
        if write_font(chunk, ctx, &font).is_none() {
            warn!("failed to embed a font, its glyph runs will not display");
        }
    }

    if let Some((_, reference)) = ctx.fallback.take() {
        chunk
            .type1_font(reference)
            .base_font(Name(b"Helvetica"))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
    }
}

/// Write one embedded font: Type0 wrapper, CID font with per-glyph widths,
/// descriptor, /ToUnicode CMap and the full font program.
fn write_font(chunk: &mut Chunk, ctx: &mut Context, font: &Font) -> Option<()> {
    // The face already parsed once at registration, so this is expected to
    // succeed.
    let ttf = Face::parse(&font.face_data, 0).ok()?;
    let units_per_em = font.units_per_em;

    let type0_ref = font.reference;
    let cid_ref = ctx.alloc_ref();
    let descriptor_ref = ctx.alloc_ref();
    let cmap_ref = ctx.alloc_ref();
    let data_ref = ctx.alloc_ref();

    // Do we have a TrueType or CFF font?
    let is_cff = ttf
        .raw_face()
        .table(CFF)
        .or_else(|| ttf.raw_face().table(CFF2))
        .is_some();

    let base_font = base_font_name(&ttf, &font.glyph_set);
    let base_font_type0 =
        if is_cff { format!("{base_font}-{IDENTITY_H}") } else { base_font.clone() };

    chunk
        .type0_font(type0_ref)
        .base_font(Name(base_font_type0.as_bytes()))
        .encoding_predefined(Name(IDENTITY_H.as_bytes()))
        .descendant_font(cid_ref)
        .to_unicode(cmap_ref);

    // Write the CID font referencing the font descriptor.
    let mut cid = chunk.cid_font(cid_ref);
    cid.subtype(if is_cff { CidFontType::Type0 } else { CidFontType::Type2 });
    cid.base_font(Name(base_font.as_bytes()));
    cid.system_info(SYSTEM_INFO);
    cid.font_descriptor(descriptor_ref);
    cid.default_width(0.0);
    if !is_cff {
        cid.cid_to_gid_map_predefined(Name(b"Identity"));
    }

    // Glyph ids double as CIDs, so widths are written per used glyph.
    let mut width_writer = cid.widths();
    for (&gid, _) in font.glyph_set.iter() {
        let advance = ttf.glyph_hor_advance(GlyphId(gid)).unwrap_or(0);
        let width = advance as f32 / units_per_em as f32 * 1000.0;
        if width != 0.0 {
            width_writer.same(gid, gid, width);
        }
    }
    width_writer.finish();
    cid.finish();

    let mut flags = FontFlags::empty();
    flags.set(
        FontFlags::SERIF,
        find_name(&ttf, name_id::POST_SCRIPT_NAME)
            .is_some_and(|name| name.contains("Serif")),
    );
    flags.set(FontFlags::FIXED_PITCH, ttf.is_monospaced());
    flags.set(FontFlags::ITALIC, ttf.is_italic());
    flags.insert(FontFlags::SYMBOLIC);
    flags.insert(FontFlags::SMALL_CAP);

    let convert = |val: f32| val / units_per_em as f32 * 1000.0;

    let global_bbox = ttf.global_bounding_box();
    let bbox = Rect::new(
        convert(global_bbox.x_min as f32),
        convert(global_bbox.y_min as f32),
        convert(global_bbox.x_max as f32),
        convert(global_bbox.y_max as f32),
    );

    let italic_angle = ttf.italic_angle().unwrap_or(0.0);
    let ascender = convert(ttf.typographic_ascender().unwrap_or(ttf.ascender()) as f32);
    let descender =
        convert(ttf.typographic_descender().unwrap_or(ttf.descender()) as f32);
    let cap_height = ttf
        .capital_height()
        .filter(|&h| h > 0)
        .map(|h| convert(h as f32))
        .unwrap_or(ascender);
    let stem_v = 10.0 + 0.244 * (f32::from(ttf.weight().to_number()) - 50.0);

    // Write the font descriptor (contains metrics about the font).
    let mut font_descriptor = chunk.font_descriptor(descriptor_ref);
    font_descriptor
        .name(Name(base_font.as_bytes()))
        .flags(flags)
        .bbox(bbox)
        .italic_angle(italic_angle)
        .ascent(ascender)
        .descent(descender)
        .cap_height(cap_height)
        .stem_v(stem_v);

    if is_cff {
        font_descriptor.font_file3(data_ref);
    } else {
        font_descriptor.font_file2(data_ref);
    }

    font_descriptor.finish();

    let cmap = create_cmap(&font.glyph_set);
    chunk.cmap(cmap_ref, &cmap.finish()).pair(Name(b"WMode"), 0i32);

    // The whole deobfuscated program is embedded, without subsetting.
    let data = deflate(&font.face_data);
    let mut stream = chunk.stream(data_ref, &data);
    stream.filter(Filter::FlateDecode);
    if is_cff {
        stream.pair(Name(b"Subtype"), Name(b"CIDFontType0C"));
    }
    stream.finish();

    Some(())
}

/// Create a /ToUnicode CMap from the used glyph set.
fn create_cmap(glyph_set: &BTreeMap<u16, String>) -> UnicodeCmap {
    let mut cmap = UnicodeCmap::new(CMAP_NAME, SYSTEM_INFO);
    for (&gid, text) in glyph_set.iter() {
        if !text.is_empty() {
            cmap.pair_with_multiple(gid, text.chars());
        }
    }
    cmap
}

/// Encode a run for the non-embedded fallback face.
fn latin1_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(u32::from)
        .map(|c| if c < 256 { c as u8 } else { b'?' })
        .collect()
}

/// Creates the base font name for a font: a tag derived from the used glyph
/// set plus the PostScript name of the face, trimmed to the PDF name limit.
fn base_font_name<T: Hash>(ttf: &Face, glyphs: &T) -> String {
    const MAX_LEN: usize = 127 - REST_LEN;
    const REST_LEN: usize = SUBSET_TAG_LEN + 1 + 1 + IDENTITY_H.len();

    let postscript_name = find_name(ttf, name_id::POST_SCRIPT_NAME);
    let name = postscript_name.as_deref().unwrap_or("unknown");
    let trimmed = &name[..name.len().min(MAX_LEN)];

    let tag = subset_tag(&(name, glyphs));

    format!("{tag}+{trimmed}")
}

/// Produce a unique 6 letter tag for a glyph set.
fn subset_tag<T: Hash>(glyphs: &T) -> String {
    const BASE: u128 = 26;
    let mut hash = hash128(glyphs);
    let mut letter = [b'A'; SUBSET_TAG_LEN];
    for l in letter.iter_mut() {
        *l = b'A' + (hash % BASE) as u8;
        hash /= BASE;
    }
    std::str::from_utf8(&letter).unwrap().into()
}

/// Calculate a 128-bit siphash of a value.
fn hash128<T: Hash + ?Sized>(value: &T) -> u128 {
    let mut state = SipHasher13::new();
    value.hash(&mut state);
    state.finish128().as_u128()
}

/// Try to find and decode the name table entry with the given id.
fn find_name(ttf: &Face, name_id: u16) -> Option<String> {
    ttf.names()
        .into_iter()
        .find(|entry| entry.name_id == name_id)
        .and_then(|entry| entry.to_string())
}
