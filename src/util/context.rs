/*! The context holds everything that belongs to a single conversion: the
deferred named resources and the fonts and images registered while the content
stream is produced. Nothing in here outlives the conversion, so two documents
can never alias each other's font identifiers.
*/

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use pdf_writer::{Content, Ref};

use super::defer::Deferrer;
use super::helper::deflate;
use crate::Options;

/// A font registered for embedding.
pub struct Font {
    pub reference: Ref,
    pub name: Rc<String>,
    pub face_data: Vec<u8>,
    pub units_per_em: u16,
    /// The glyph ids used so far, mapped to the text they rendered.
    pub glyph_set: BTreeMap<u16, String>,
}

/// Holds all of the necessary information for the conversion process.
pub struct Context {
    /// An instance of the deferrer.
    pub deferrer: Deferrer,
    /// Options that were passed by the user.
    pub options: Options,
    /// Fonts registered so far, keyed by the hash of their part URI. `None`
    /// records a failed registration so it is not retried.
    pub fonts: HashMap<u128, Option<Font>>,
    /// Image XObjects created so far, keyed by their resource key. `None`
    /// records an image that failed to decode.
    pub images: HashMap<String, Option<(Rc<String>, u32, u32)>>,
    /// The Helvetica stand-in for glyph runs whose font could not be loaded.
    pub fallback: Option<(Rc<String>, Ref)>,
}

impl Context {
    /// Create a new context.
    pub fn new(options: Options, start_ref: i32) -> Self {
        Self {
            deferrer: Deferrer::new_with_start_ref(start_ref),
            options,
            fonts: HashMap::new(),
            images: HashMap::new(),
            fallback: None,
        }
    }

    /// Allocate a new reference.
    pub fn alloc_ref(&mut self) -> Ref {
        self.deferrer.alloc_ref()
    }

    /// The name and reference of the fallback face, registering it on first
    /// use.
    pub fn fallback_font(&mut self) -> (Rc<String>, Ref) {
        if self.fallback.is_none() {
            let reference = self.deferrer.alloc_ref();
            let name = self.deferrer.add_font(reference);
            self.fallback = Some((name, reference));
        }
        let (name, reference) = self.fallback.as_ref().unwrap();
        (name.clone(), *reference)
    }

    /// Finish a content stream, compressing it if requested.
    pub fn finish_content(&self, content: Content) -> Vec<u8> {
        if self.options.compress {
            deflate(&content.finish())
        } else {
            content.finish()
        }
    }
}
