//! # Workspace Resolver
//!
//! Maps `{{workspace}}`-prefixed path tokens to and from absolute paths, so a
//! document can be moved or shared without embedding machine-specific paths.

use crate::FieldboxError;
use crate::primitives::WORKSPACE_TOKEN;
use std::path::{Path, PathBuf};

/// The configured default directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the workspace directory if it does not exist yet.
    pub fn ensure_exists(&self) -> Result<(), FieldboxError> {
        std::fs::create_dir_all(&self.root).map_err(|e| {
            FieldboxError::IoError(format!(
                "Cannot create workspace {}: {}",
                self.root.display(),
                e
            ))
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a token-prefixed path against the workspace root; any other
    /// input is returned unchanged.
    #[must_use]
    pub fn resolve(&self, path_or_token: &str) -> PathBuf {
        match path_or_token.strip_prefix(WORKSPACE_TOKEN) {
            Some(rest) => self.root.join(rest.trim_start_matches(['/', '\\'])),
            None => PathBuf::from(path_or_token),
        }
    }

    /// Token form of `path` if it lies inside the workspace, the literal path otherwise.
    #[must_use]
    pub fn derelativize(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(relative) => format!("{}{}", WORKSPACE_TOKEN, relative.to_string_lossy()),
            Err(_) => path.to_string_lossy().into_owned(),
        }
    }

    /// Whether a file already exists at the resolved location.
    #[must_use]
    pub fn exists(&self, path_or_token: &str) -> bool {
        self.resolve(path_or_token).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_resolves_under_root() {
        let ws = Workspace::new("/tmp/ws");
        assert_eq!(
            ws.resolve("{{workspace}}foo_code.js"),
            PathBuf::from("/tmp/ws/foo_code.js")
        );
        assert_eq!(
            ws.resolve("{{workspace}}/nested/foo.box"),
            PathBuf::from("/tmp/ws/nested/foo.box")
        );
    }

    #[test]
    fn literal_paths_pass_through() {
        let ws = Workspace::new("/tmp/ws");
        assert_eq!(ws.resolve("/etc/other.js"), PathBuf::from("/etc/other.js"));
        assert_eq!(ws.resolve("{{works"), PathBuf::from("{{works"));
    }

    #[test]
    fn derelativize_inverts_resolve() {
        let ws = Workspace::new("/tmp/ws");
        let token = ws.derelativize(Path::new("/tmp/ws/foo_code.js"));
        assert_eq!(token, "{{workspace}}foo_code.js");
        assert_eq!(ws.resolve(&token), PathBuf::from("/tmp/ws/foo_code.js"));
    }

    #[test]
    fn derelativize_outside_workspace_is_literal() {
        let ws = Workspace::new("/tmp/ws");
        assert_eq!(ws.derelativize(Path::new("/home/x/a.js")), "/home/x/a.js");
    }

    #[test]
    fn ensure_exists_creates_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ws = Workspace::new(dir.path().join("nested/ws"));

        ws.ensure_exists().expect("create");
        assert!(ws.root().is_dir());
    }
}
