/*! Walk the package structure from the fixed document sequence down to the
individual page parts. */

use std::io::{Read, Seek};

use log::warn;

use crate::package::{parent_dir, DwfxPackage};
use crate::util::helper::attr;
use crate::ConversionError;

/// The root part every DWFx package must carry.
const SEQUENCE_PART: &str = "FixedDocumentSequence.fdseq";

/// A reference to one fixed page, together with the base path its resources
/// resolve against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRef {
    /// The package path of the FixedPage part, without a leading slash.
    pub fpage_path: String,
    /// The directory of the page part.
    pub base_path: String,
}

/// Enumerate the pages of all fixed documents in the package, in declaration
/// order. Document parts that cannot be read or parsed are skipped.
pub fn find_pages<R: Read + Seek>(
    package: &mut DwfxPackage<R>,
) -> Result<Vec<PageRef>, ConversionError> {
    let sequence = package.read_text(SEQUENCE_PART).ok_or_else(|| {
        ConversionError::PackageInvalid(format!("missing {SEQUENCE_PART}"))
    })?;
    let sequence = roxmltree::Document::parse(&sequence).map_err(|err| {
        ConversionError::PackageInvalid(format!("invalid fixed document sequence: {err}"))
    })?;

    let mut pages = Vec::new();
    for reference in elements_named(sequence.root_element(), "DocumentReference") {
        let Some(source) = attr(&reference, "Source") else { continue };
        let document_path = source.strip_prefix('/').unwrap_or(source);

        let Some(markup) = package.read_text(document_path) else {
            warn!("fixed document {document_path} is missing");
            continue;
        };
        let document = match roxmltree::Document::parse(&markup) {
            Ok(document) => document,
            Err(err) => {
                warn!("invalid fixed document {document_path}: {err}");
                continue;
            }
        };

        for content in elements_named(document.root_element(), "PageContent") {
            if let Some(source) = attr(&content, "Source") {
                let fpage_path =
                    source.strip_prefix('/').unwrap_or(source).to_string();
                let base_path = parent_dir(&fpage_path).to_string();
                pages.push(PageRef { fpage_path, base_path });
            }
        }
    }

    Ok(pages)
}

fn elements_named<'a, 'd>(
    parent: roxmltree::Node<'a, 'd>,
    name: &'static str,
) -> impl Iterator<Item = roxmltree::Node<'a, 'd>> {
    parent
        .children()
        .filter(move |node| node.is_element() && node.tag_name().name() == name)
}
