/*! Small shared helpers: affine transforms, color parsing and the tolerant
number-list parser used for all XPS attribute values. */

use pdf_writer::Name;

/// An affine transform in the XPS `a,b,c,d,e,f` notation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Transform {
    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translate(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub fn from_list(values: &[f32]) -> Option<Self> {
        match *values {
            [a, b, c, d, e, f] => Some(Self::new(a, b, c, d, e, f)),
            _ => None,
        }
    }
}

/// Extension trait to convert a [Transform] into PDF transforms.
pub trait TransformExt {
    fn to_pdf_transform(&self) -> [f32; 6];
}

impl TransformExt for Transform {
    fn to_pdf_transform(&self) -> [f32; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }
}

/// Extension trait to convert a [String] into a [Name].
pub trait NameExt {
    fn to_pdf_name(&self) -> Name;
}

impl NameExt for String {
    fn to_pdf_name(&self) -> Name {
        Name(self.as_bytes())
    }
}

/// An sRGB color with values between 0.0 and 1.0.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RgbaColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub alpha: f32,
}

impl RgbaColor {
    pub const BLACK: RgbaColor = RgbaColor { r: 0.0, g: 0.0, b: 0.0, alpha: 1.0 };

    fn from_u8(r: u8, g: u8, b: u8, alpha: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            alpha: alpha as f32 / 255.0,
        }
    }

    /// Parse a `#RGB`, `#RRGGBB` or `#AARRGGBB` attribute value.
    pub fn parse(s: &str) -> Option<Self> {
        let hex = s.trim().strip_prefix('#')?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&hex[2 * i..2 * i + 2], 16).ok();
        match hex.len() {
            3 => {
                let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok();
                Some(Self::from_u8(nibble(0)? * 17, nibble(1)? * 17, nibble(2)? * 17, 255))
            }
            6 => Some(Self::from_u8(byte(0)?, byte(1)?, byte(2)?, 255)),
            8 => Some(Self::from_u8(byte(1)?, byte(2)?, byte(3)?, byte(0)?)),
            _ => None,
        }
    }

    /// Create an RGB array for use in PDF.
    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

/// Parse a list of numbers separated by commas and/or whitespace.
///
/// XPS attributes use the invariant decimal point, so plain [str::parse] is
/// the right decoder. Tokens that fail to parse are dropped.
pub fn parse_number_list(s: &str) -> Vec<f32> {
    s.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .filter_map(|t| t.parse::<f32>().ok())
        .collect()
}

/// Parse a six-value `RenderTransform` style attribute.
pub fn parse_matrix(s: &str) -> Option<Transform> {
    Transform::from_list(&parse_number_list(s))
}

/// Parse a four-value `Viewport`/`Viewbox` style attribute.
pub fn parse_rect(s: &str) -> Option<[f32; 4]> {
    match *parse_number_list(s) {
        [x, y, w, h] => Some([x, y, w, h]),
        _ => None,
    }
}

/// Extract the key of a `{StaticResource KEY}` fill value.
pub fn static_resource_key(s: &str) -> Option<&str> {
    let inner = s.trim().strip_prefix('{')?.strip_suffix('}')?;
    let key = inner.trim().strip_prefix("StaticResource")?.trim();
    (!key.is_empty()).then_some(key)
}

/// Look up an attribute by its local name, namespaced or not.
pub fn attr<'a, 'd>(node: &roxmltree::Node<'a, 'd>, name: &str) -> Option<&'a str> {
    node.attributes().find(|a| a.name() == name).map(|a| a.value())
}

/// Compress data using the deflate algorithm.
pub fn deflate(data: &[u8]) -> Vec<u8> {
    const COMPRESSION_LEVEL: u8 = 6;
    miniz_oxide::deflate::compress_to_vec_zlib(data, COMPRESSION_LEVEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_list_accepts_mixed_separators() {
        assert_eq!(
            parse_number_list("1,0 0,1 10 20"),
            vec![1.0, 0.0, 0.0, 1.0, 10.0, 20.0]
        );
        assert_eq!(parse_number_list(" 3.5e1 , -2 "), vec![35.0, -2.0]);
        assert!(parse_number_list("").is_empty());
    }

    #[test]
    fn matrix_needs_six_values() {
        assert!(parse_matrix("1,0,0,1,5").is_none());
        let m = parse_matrix("1 0 0 1 5 6").unwrap();
        assert_eq!(m, Transform::new(1.0, 0.0, 0.0, 1.0, 5.0, 6.0));
    }

    #[test]
    fn color_forms() {
        assert_eq!(RgbaColor::parse("#FF0000").unwrap().to_array(), [1.0, 0.0, 0.0]);
        assert_eq!(RgbaColor::parse("#f00").unwrap().to_array(), [1.0, 0.0, 0.0]);
        let translucent = RgbaColor::parse("#80FF0000").unwrap();
        assert!((translucent.alpha - 128.0 / 255.0).abs() < 1e-6);
        assert!(RgbaColor::parse("red").is_none());
        assert!(RgbaColor::parse("#12345").is_none());
    }

    #[test]
    fn static_resource_syntax() {
        assert_eq!(static_resource_key("{StaticResource B1}"), Some("B1"));
        assert_eq!(static_resource_key("{ StaticResource  B1 }"), Some("B1"));
        assert_eq!(static_resource_key("#FF0000"), None);
        assert_eq!(static_resource_key("{StaticResource }"), None);
    }
}
