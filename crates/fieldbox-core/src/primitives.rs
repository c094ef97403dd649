//! # Persistence Primitives
//!
//! Fixed tokens and naming conventions shared by every persistence component.
//!
//! These values are part of the on-disk format: documents written by one
//! build must be readable by the next, so none of them may change without a
//! migration path.

// =============================================================================
// PATH TOKENS
// =============================================================================

/// Prefix standing for "relative to the configured workspace directory".
///
/// Paths beginning with this token are resolved against the workspace root;
/// all other paths are taken literally.
pub const WORKSPACE_TOKEN: &str = "{{workspace}}";

/// Filespec suffix meaning "ask the box for its file extension".
///
/// Used for properties whose language depends on the box (a code property
/// may be JavaScript in one box and GLSL in another).
pub const EXECUTION_TOKEN: &str = "{{execution}}";

// =============================================================================
// BOOKKEEPING PROPERTIES
// =============================================================================

/// Property holding a box's stable identity string.
pub const ID_PROPERTY: &str = "__id__";

/// Prefix of the property recording the allocated path of a file-backed property.
///
/// `__filename__code` holds the path allocated for the `code` property.
pub const FILENAME_PREFIX: &str = "__filename__";

/// Property recording the allocated path of a box's consolidated data file.
pub const DATAFILE_PROPERTY: &str = "__datafilename__";

/// Flag property marking a box as non-persistent when set to `true`.
pub const DONT_SAVE_PROPERTY: &str = "dontSave";

// =============================================================================
// DEFAULT PERSISTED PROPERTIES
// =============================================================================

/// Display name of a box, also the stem of its allocated file names.
pub const NAME_PROPERTY: &str = "name";

/// On-canvas geometry of a box.
pub const FRAME_PROPERTY: &str = "frame";

/// Canvas lock flags.
pub const LOCK_WIDTH_PROPERTY: &str = "lockWidth";
pub const LOCK_HEIGHT_PROPERTY: &str = "lockHeight";

/// Properties every engine persists without explicit registration.
pub const DEFAULT_PERSISTED_PROPERTIES: [&str; 4] = [
    NAME_PROPERTY,
    FRAME_PROPERTY,
    LOCK_WIDTH_PROPERTY,
    LOCK_HEIGHT_PROPERTY,
];

/// Default file-backed property for imported source files.
pub const CODE_PROPERTY: &str = "code";

// =============================================================================
// FILE NAMING
// =============================================================================

/// Stem used when a box has no `name` property.
pub const DEFAULT_BOX_NAME: &str = "untitled_box";

/// Suffix of a box's consolidated data file.
pub const DATA_SUFFIX: &str = ".box";

/// Fallback suffix for a deferred filespec on a box that cannot supply one.
pub const FALLBACK_TEXT_SUFFIX: &str = ".txt";

/// Width of the zero-padded collision disambiguator (`foo00003_code.js`).
pub const DISAMBIGUATOR_WIDTH: usize = 5;

// =============================================================================
// TYPE TAGS
// =============================================================================

/// Tag of the generic box type every registry can construct.
pub const DEFAULT_TYPE_TAG: &str = "default";

/// Name of the property slot that records the path of `property`.
#[must_use]
pub fn filename_property(property: &str) -> String {
    format!("{FILENAME_PREFIX}{property}")
}

/// Format a collision disambiguator (`3` -> `"00003"`).
#[must_use]
pub fn pad(n: u32) -> String {
    format!("{n:0width$}", width = DISAMBIGUATOR_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_property_is_prefixed() {
        assert_eq!(filename_property("code"), "__filename__code");
    }

    #[test]
    fn pad_is_five_digits() {
        assert_eq!(pad(0), "00000");
        assert_eq!(pad(42), "00042");
        assert_eq!(pad(123_456), "123456");
    }
}
