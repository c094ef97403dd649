//! # Box Type Registry
//!
//! Maps the type tag stored in a record to a constructor for that box type.
//!
//! Construction never fails from the caller's point of view: an unknown tag,
//! a constructor error or a constructor panic all yield the default box type,
//! so one unresolvable box cannot abort a document load. The box's properties are
//! still restored; only its custom behavior is lost.

use crate::behavior::{BoxBehavior, DefaultBox};
use crate::primitives::DEFAULT_TYPE_TAG;
use crate::FieldboxError;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// A constructor for one box type.
pub type BoxFactory =
    Arc<dyn Fn() -> Result<Box<dyn BoxBehavior>, FieldboxError> + Send + Sync>;

/// Result of resolving a type tag.
#[derive(Debug)]
pub struct Constructed {
    pub behavior: Box<dyn BoxBehavior>,
    /// Why the default type was substituted, if it was.
    pub fallback: Option<FieldboxError>,
}

/// Named constructors, registered at startup.
#[derive(Clone)]
pub struct BoxTypeRegistry {
    factories: BTreeMap<String, BoxFactory>,
}

impl std::fmt::Debug for BoxTypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxTypeRegistry")
            .field("tags", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for BoxTypeRegistry {
    fn default() -> Self {
        let mut registry = Self {
            factories: BTreeMap::new(),
        };
        registry.register(DEFAULT_TYPE_TAG, || Ok(Box::new(DefaultBox)));
        registry
    }
}

impl BoxTypeRegistry {
    /// A registry that knows only the default box type.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the constructor for `tag`.
    pub fn register<F>(&mut self, tag: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Box<dyn BoxBehavior>, FieldboxError> + Send + Sync + 'static,
    {
        self.factories.insert(tag.into(), Arc::new(factory));
    }

    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// Registered tags in order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Strict construction: errors for unknown tags and failing constructors.
    pub fn try_construct(&self, tag: &str) -> Result<Box<dyn BoxBehavior>, FieldboxError> {
        let factory = self
            .factories
            .get(tag)
            .ok_or_else(|| FieldboxError::UnknownBoxType(tag.to_string()))?;

        match panic::catch_unwind(AssertUnwindSafe(|| factory())) {
            Ok(result) => result,
            Err(payload) => Err(FieldboxError::ConstructionFailed {
                tag: tag.to_string(),
                reason: panic_message(payload.as_ref()),
            }),
        }
    }

    /// Construct `tag`, substituting the default box type on any failure.
    ///
    /// The substitute comes from the factory registered under the default
    /// tag, or is a plain `DefaultBox` if that factory fails too.
    pub fn construct(&self, tag: &str) -> Constructed {
        match self.try_construct(tag) {
            Ok(behavior) => Constructed {
                behavior,
                fallback: None,
            },
            Err(e) => {
                tracing::warn!(
                    "box type '{}' unavailable ({}); using default box, custom behavior is lost",
                    tag,
                    e
                );
                let behavior: Box<dyn BoxBehavior> = if tag == DEFAULT_TYPE_TAG {
                    Box::new(DefaultBox)
                } else {
                    self.try_construct(DEFAULT_TYPE_TAG)
                        .unwrap_or_else(|_| Box::new(DefaultBox))
                };
                Constructed {
                    behavior,
                    fallback: Some(e),
                }
            }
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
