//! # Box Behaviors
//!
//! A box's type is a `BoxBehavior` trait object. The persistence engine never
//! inspects concrete behavior types; it asks for optional capabilities:
//!
//! - `is_persistent` - `false` keeps the box out of every saved document
//! - `suffix_provider` - supplies file extensions for deferred filespecs
//! - `post_load` - a hook run once after a whole document has been loaded

use crate::primitives::DEFAULT_TYPE_TAG;
use crate::{FieldboxError, Properties};
use std::fmt;

/// The behavior attached to a box.
///
/// `type_tag` is the name the behavior is registered under in a
/// `BoxTypeRegistry`; it is what gets written into a record.
pub trait BoxBehavior: fmt::Debug + Send {
    /// Tag identifying this box type on disk.
    fn type_tag(&self) -> &str;

    /// Whether boxes of this type are ever saved.
    fn is_persistent(&self) -> bool {
        true
    }

    /// Capability: custom file extensions for deferred filespecs.
    fn suffix_provider(&self) -> Option<&dyn SuffixProvider> {
        None
    }

    /// Capability: post-load lifecycle hook.
    fn post_load(&mut self) -> Option<&mut dyn PostLoad> {
        None
    }
}

/// Supplies the file extension for a property whose filespec defers to the box.
pub trait SuffixProvider {
    /// Extension including the leading dot (`".glsl"`), or `None` if this box
    /// has no opinion for `property`.
    fn file_extension(&self, property: &str) -> Option<String>;
}

/// Hook invoked after every box of a document exists and all edges are wired.
pub trait PostLoad {
    fn loaded(&mut self, properties: &mut Properties) -> Result<(), FieldboxError>;
}

/// The generic box type. Also the fallback for unresolvable type tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBox;

impl BoxBehavior for DefaultBox {
    fn type_tag(&self) -> &str {
        DEFAULT_TYPE_TAG
    }
}
