/*! Random access over the parts of a DWFx container.

A DWFx document is a ZIP archive following the Open Packaging Conventions.
Parts are addressed by forward-slash paths; a missing part is not an error,
callers decide how to recover.
*/

use std::io::{Read, Seek};

use log::warn;
use zip::ZipArchive;

use crate::ConversionError;

pub struct DwfxPackage<R> {
    archive: ZipArchive<R>,
}

impl<R: Read + Seek> DwfxPackage<R> {
    /// Open a package over a seekable byte source.
    pub fn open(reader: R) -> Result<Self, ConversionError> {
        let archive = ZipArchive::new(reader)
            .map_err(|err| ConversionError::PackageInvalid(err.to_string()))?;
        Ok(Self { archive })
    }

    /// The raw bytes of a part, or `None` when the part does not exist or
    /// cannot be read.
    pub fn read_bytes(&mut self, path: &str) -> Option<Vec<u8>> {
        let mut part = match self.archive.by_name(normalize(path)) {
            Ok(part) => part,
            Err(zip::result::ZipError::FileNotFound) => return None,
            Err(err) => {
                warn!("failed to open part {path}: {err}");
                return None;
            }
        };

        let mut data = Vec::with_capacity(part.size() as usize);
        if let Err(err) = part.read_to_end(&mut data) {
            warn!("failed to read part {path}: {err}");
            return None;
        }
        Some(data)
    }

    /// The UTF-8 decoded contents of a part.
    pub fn read_text(&mut self, path: &str) -> Option<String> {
        self.read_bytes(path)
            .map(|data| String::from_utf8_lossy(&data).into_owned())
    }
}

/// Strip a single leading `./` and a single leading `/` before lookup. Case
/// is preserved; the lookup is an exact match against the ZIP directory.
fn normalize(path: &str) -> &str {
    let path = path.strip_prefix("./").unwrap_or(path);
    path.strip_prefix('/').unwrap_or(path)
}

/// Resolve a part reference against a base directory. A leading `/` denotes
/// a package-root absolute path.
pub(crate) fn resolve(base: &str, href: &str) -> String {
    if let Some(absolute) = href.strip_prefix('/') {
        return absolute.to_string();
    }
    let href = href.strip_prefix("./").unwrap_or(href);
    if base.is_empty() {
        href.to_string()
    } else {
        format!("{base}/{href}")
    }
}

/// The directory portion of a part path.
pub(crate) fn parent_dir(path: &str) -> &str {
    path.rfind('/').map(|i| &path[..i]).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;

    fn sample_package() -> DwfxPackage<Cursor<Vec<u8>>> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("Documents/1/Pages/1.fpage", FileOptions::default()).unwrap();
        writer.write_all(b"<FixedPage/>").unwrap();
        let cursor = writer.finish().unwrap();
        DwfxPackage::open(cursor).unwrap()
    }

    #[test]
    fn lookup_strips_leading_markers() {
        let mut package = sample_package();
        assert!(package.read_text("Documents/1/Pages/1.fpage").is_some());
        assert!(package.read_text("/Documents/1/Pages/1.fpage").is_some());
        assert!(package.read_text("./Documents/1/Pages/1.fpage").is_some());
        assert!(package.read_text("Documents/1/Pages/2.fpage").is_none());
    }

    #[test]
    fn open_rejects_non_zip_data() {
        let result = DwfxPackage::open(Cursor::new(b"not a zip".to_vec()));
        assert!(matches!(result, Err(ConversionError::PackageInvalid(_))));
    }

    #[test]
    fn reference_resolution() {
        assert_eq!(resolve("Documents/1/Pages", "img.png"), "Documents/1/Pages/img.png");
        assert_eq!(resolve("Documents/1/Pages", "./img.png"), "Documents/1/Pages/img.png");
        assert_eq!(resolve("Documents/1/Pages", "/Resources/img.png"), "Resources/img.png");
        assert_eq!(resolve("", "img.png"), "img.png");
    }

    #[test]
    fn parent_of_part_path() {
        assert_eq!(parent_dir("Documents/1/Pages/1.fpage"), "Documents/1/Pages");
        assert_eq!(parent_dir("1.fpage"), "");
    }
}
