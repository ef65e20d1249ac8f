/*! Load the image brushes and fonts a fixed page references.

Brushes come from `ResourceDictionary` elements found under `*.Resources`
property elements, either inline or through a `Source` part. Fonts are
collected from every `Glyphs` element and deobfuscated on the way in. Missing
or broken parts degrade the page instead of failing the conversion.
*/

use std::collections::HashMap;
use std::io::{Read, Seek};

use log::warn;

use crate::odttf;
use crate::package::{resolve, DwfxPackage};
use crate::util::helper::{attr, parse_matrix, parse_rect, Transform};

/// An image brush registered under its dictionary key.
pub struct ImageBrush {
    /// The raw bytes of the referenced image part.
    pub image: Vec<u8>,
    pub transform: Option<Transform>,
    pub viewport: Option<[f32; 4]>,
    pub viewbox: Option<[f32; 4]>,
}

/// Everything the page references: brushes by key and font parts by the URI
/// they were referenced with.
#[derive(Default)]
pub struct PageResources {
    pub brushes: HashMap<String, ImageBrush>,
    pub fonts: HashMap<String, Vec<u8>>,
}

/// Collect the resources of one fixed page.
pub fn collect<R: Read + Seek>(
    package: &mut DwfxPackage<R>,
    page: &roxmltree::Document,
    base_path: &str,
) -> PageResources {
    let mut resources = PageResources::default();
    collect_brushes(package, page, base_path, &mut resources);
    collect_fonts(package, page, base_path, &mut resources);
    resources
}

fn collect_brushes<R: Read + Seek>(
    package: &mut DwfxPackage<R>,
    page: &roxmltree::Document,
    base_path: &str,
    out: &mut PageResources,
) {
    let holders = page.root_element().descendants().filter(|node| {
        node.is_element() && node.tag_name().name().ends_with(".Resources")
    });

    for holder in holders {
        let dictionaries = holder.children().filter(|node| {
            node.is_element() && node.tag_name().name() == "ResourceDictionary"
        });

        for dictionary in dictionaries {
            for brush in image_brushes(dictionary) {
                register_brush(package, &brush, base_path, out);
            }

            if let Some(source) = attr(&dictionary, "Source") {
                let path = resolve(base_path, source);
                let Some(markup) = package.read_text(&path) else {
                    warn!("resource dictionary {path} is missing");
                    continue;
                };
                match roxmltree::Document::parse(&markup) {
                    Ok(external) => {
                        for brush in image_brushes(external.root_element()) {
                            register_brush(package, &brush, base_path, out);
                        }
                    }
                    Err(err) => warn!("invalid resource dictionary {path}: {err}"),
                }
            }
        }
    }
}

fn image_brushes<'a, 'd>(
    dictionary: roxmltree::Node<'a, 'd>,
) -> impl Iterator<Item = roxmltree::Node<'a, 'd>> {
    dictionary
        .children()
        .filter(|node| node.is_element() && node.tag_name().name() == "ImageBrush")
}

fn register_brush<R: Read + Seek>(
    package: &mut DwfxPackage<R>,
    brush: &roxmltree::Node,
    base_path: &str,
    out: &mut PageResources,
) {
    let Some(key) = brush_key(brush) else { return };
    let Some(source) = attr(brush, "ImageSource") else { return };

    let path = resolve(base_path, source);
    let Some(image) = package.read_bytes(&path) else {
        warn!("image {path} referenced by brush `{key}` is missing");
        return;
    };

    out.brushes.insert(
        key.to_string(),
        ImageBrush {
            image,
            transform: attr(brush, "Transform").and_then(parse_matrix),
            viewport: attr(brush, "Viewport").and_then(parse_rect),
            viewbox: attr(brush, "Viewbox").and_then(parse_rect),
        },
    );
}

/// The dictionary key of a brush: `x:Key` is preferred over a plain `Key`.
fn brush_key<'a>(node: &roxmltree::Node<'a, '_>) -> Option<&'a str> {
    node.attributes()
        .find(|a| a.name() == "Key" && a.namespace().is_some())
        .or_else(|| node.attributes().find(|a| a.name() == "Key"))
        .map(|a| a.value())
}

fn collect_fonts<R: Read + Seek>(
    package: &mut DwfxPackage<R>,
    page: &roxmltree::Document,
    base_path: &str,
    out: &mut PageResources,
) {
    let glyph_runs = page
        .root_element()
        .descendants()
        .filter(|node| node.is_element() && node.tag_name().name() == "Glyphs");

    for glyphs in glyph_runs {
        let Some(uri) = attr(&glyphs, "FontUri") else { continue };
        if out.fonts.contains_key(uri) {
            continue;
        }

        let path = resolve(base_path, uri);
        let Some(mut data) = package.read_bytes(&path) else {
            warn!("font {path} is missing");
            continue;
        };
        odttf::deobfuscate(&path, &mut data);
        out.fonts.insert(uri.to_string(), data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;

    const KEY_NS: &str =
        "http://schemas.microsoft.com/xps/2005/06/resourcedictionary-key";

    fn package_with(parts: &[(&str, &[u8])]) -> DwfxPackage<Cursor<Vec<u8>>> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in parts {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(contents).unwrap();
        }
        DwfxPackage::open(writer.finish().unwrap()).unwrap()
    }

    #[test]
    fn inline_brushes_are_registered() {
        let markup = format!(
            r#"<FixedPage xmlns:x="{KEY_NS}" Width="96" Height="96">
                 <Canvas.Resources>
                   <ResourceDictionary>
                     <ImageBrush x:Key="B1" ImageSource="img.png"
                                 Viewport="0,0,200,150"/>
                   </ResourceDictionary>
                 </Canvas.Resources>
               </FixedPage>"#
        );
        let mut package = package_with(&[("Documents/1/Pages/img.png", b"png-bytes")]);
        let page = roxmltree::Document::parse(&markup).unwrap();

        let resources = collect(&mut package, &page, "Documents/1/Pages");
        let brush = resources.brushes.get("B1").expect("brush registered");
        assert_eq!(brush.image, b"png-bytes");
        assert_eq!(brush.viewport, Some([0.0, 0.0, 200.0, 150.0]));
        assert!(brush.transform.is_none());
    }

    #[test]
    fn external_dictionaries_are_loaded() {
        let markup = r#"<FixedPage Width="96" Height="96">
                          <Canvas.Resources>
                            <ResourceDictionary Source="dict.xaml"/>
                          </Canvas.Resources>
                        </FixedPage>"#;
        let dictionary = format!(
            r#"<ResourceDictionary xmlns:x="{KEY_NS}">
                 <ImageBrush x:Key="B2" ImageSource="img.png"/>
               </ResourceDictionary>"#
        );
        let mut package = package_with(&[
            ("Documents/1/Pages/dict.xaml", dictionary.as_bytes()),
            ("Documents/1/Pages/img.png", b"png-bytes"),
        ]);
        let page = roxmltree::Document::parse(markup).unwrap();

        let resources = collect(&mut package, &page, "Documents/1/Pages");
        assert!(resources.brushes.contains_key("B2"));
    }

    #[test]
    fn missing_parts_are_skipped() {
        let markup = r#"<FixedPage Width="96" Height="96">
                          <Canvas.Resources>
                            <ResourceDictionary>
                              <ImageBrush Key="B3" ImageSource="gone.png"/>
                            </ResourceDictionary>
                          </Canvas.Resources>
                          <Glyphs FontUri="gone.ttf" UnicodeString="x"/>
                        </FixedPage>"#;
        let mut package = package_with(&[]);
        let page = roxmltree::Document::parse(markup).unwrap();

        let resources = collect(&mut package, &page, "");
        assert!(resources.brushes.is_empty());
        assert!(resources.fonts.is_empty());
    }

    #[test]
    fn fonts_are_deobfuscated_on_load() {
        let uri = "/Fonts/ABCDEF01-2345-6789-ABCD-EF0123456789.odttf";
        let markup = format!(
            r#"<FixedPage Width="96" Height="96">
                 <Glyphs FontUri="{uri}" UnicodeString="Hi"/>
               </FixedPage>"#
        );
        // Obfuscate a recognizable buffer; loading must undo the XOR.
        let mut obfuscated: Vec<u8> = (0u8..64).collect();
        crate::odttf::deobfuscate(uri, &mut obfuscated);

        let mut package = package_with(&[(
            "Fonts/ABCDEF01-2345-6789-ABCD-EF0123456789.odttf",
            obfuscated.as_slice(),
        )]);
        let page = roxmltree::Document::parse(&markup).unwrap();

        let resources = collect(&mut package, &page, "Documents/1/Pages");
        let expected: Vec<u8> = (0u8..64).collect();
        assert_eq!(resources.fonts.get(uri).unwrap(), &expected);
    }
}
