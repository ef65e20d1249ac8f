/*! Defer the writing of named resources.

The page's content stream has to be finished before its `Resources` dictionary
can be written, but XObjects, graphics states and fonts get their names while
the stream is being produced. The [Deferrer] is a stack-like structure that
collects those pending named objects; once the stream is done, popping the
frame writes every entry into the `Resources` dictionary of the page.
*/

use std::rc::Rc;

use pdf_writer::writers::Resources;
use pdf_writer::{Dict, Finish, Ref};

use crate::util::allocate::Allocator;
use crate::util::helper::NameExt;

#[derive(Clone, Copy, Eq, PartialEq)]
enum PendingObjectType {
    XObject,
    GraphicsState,
    Font,
}

impl PendingObjectType {
    fn get_name(&self, allocator: &mut Allocator) -> String {
        match *self {
            PendingObjectType::XObject => allocator.alloc_x_object_name(),
            PendingObjectType::GraphicsState => allocator.alloc_graphics_state_name(),
            PendingObjectType::Font => allocator.alloc_font_name(),
        }
    }

    fn get_dict<'a>(&'a self, resources: &'a mut Resources) -> Dict {
        match *self {
            PendingObjectType::XObject => resources.x_objects(),
            PendingObjectType::GraphicsState => resources.ext_g_states(),
            PendingObjectType::Font => resources.fonts(),
        }
    }

    fn iterator() -> impl Iterator<Item = PendingObjectType> {
        [
            PendingObjectType::XObject,
            PendingObjectType::GraphicsState,
            PendingObjectType::Font,
        ]
        .iter()
        .copied()
    }
}

struct Entry {
    object_type: PendingObjectType,
    reference: Ref,
    name: Rc<String>,
}

/// The actual struct that keeps track of deferred objects.
#[derive(Default)]
pub struct Deferrer {
    /// The allocator that allows us to allocate new Refs and Names.
    allocator: Allocator,
    /// The stack frames containing the deferred objects.
    pending_entries: Vec<Vec<Entry>>,
}

impl Deferrer {
    /// Create a new deferrer with a specific start reference ID for the
    /// allocator.
    pub fn new_with_start_ref(start_ref: i32) -> Self {
        Self {
            allocator: Allocator::new_with_start_ref(start_ref),
            ..Deferrer::default()
        }
    }

    /// Allocate a new reference through the allocator.
    pub fn alloc_ref(&mut self) -> Ref {
        self.allocator.alloc_ref()
    }

    /// Push a new stack frame.
    pub fn push(&mut self) {
        self.pending_entries.push(Vec::new());
    }

    /// Pop a stack frame and write the pending named resources into the
    /// `Resources` dictionary.
    pub fn pop(&mut self, resources: &mut Resources) {
        let entries = self.pending_entries.pop().unwrap();
        self.write_entries(resources, entries);
    }

    fn add_entry(&mut self, reference: Ref, object_type: PendingObjectType) -> Rc<String> {
        let name = Rc::new(object_type.get_name(&mut self.allocator));
        self.push_entry(Entry { object_type, reference, name: name.clone() });
        name
    }

    /// Add a new XObject entry. Returns the name of the XObject.
    pub fn add_x_object(&mut self, reference: Ref) -> Rc<String> {
        self.add_entry(reference, PendingObjectType::XObject)
    }

    /// Add a new GraphicsState entry. Returns the name of the GraphicsState.
    pub fn add_graphics_state(&mut self, reference: Ref) -> Rc<String> {
        self.add_entry(reference, PendingObjectType::GraphicsState)
    }

    /// Add a new Font entry. Returns the name of the Font.
    pub fn add_font(&mut self, reference: Ref) -> Rc<String> {
        self.add_entry(reference, PendingObjectType::Font)
    }

    /// Write all of the entries into a `Resources` dictionary.
    fn write_entries(&mut self, resources: &mut Resources, entries: Vec<Entry>) {
        for object_type in PendingObjectType::iterator() {
            let entries: Vec<_> =
                entries.iter().filter(|e| e.object_type == object_type).collect();

            if !entries.is_empty() {
                let mut dict = object_type.get_dict(resources);

                for entry in entries {
                    dict.pair(entry.name.to_pdf_name(), entry.reference);
                }

                dict.finish();
            }
        }
    }

    fn push_entry(&mut self, entry: Entry) {
        self.pending_entries.last_mut().unwrap().push(entry);
    }
}
