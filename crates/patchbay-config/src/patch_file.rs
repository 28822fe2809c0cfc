//! Patch files: page descriptions stored as JSON.
//!
//! A patch file holds `{"page": {...}}` as written by
//! [`Page::write`]. Reading accepts the bare page object too.

use std::path::Path;
use std::sync::Arc;

use patchbay_core::{Dico, Page, keys};

use crate::error::ConfigError;

/// A page description loaded from or destined for disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchFile {
    description: Dico,
}

impl PatchFile {
    /// Captures the current contents of `page`.
    pub fn from_page(page: &Page) -> Self {
        let mut description = Dico::new();
        page.write(&mut description);
        Self { description }
    }

    /// Wraps an existing description.
    pub fn from_dico(description: Dico) -> Result<Self, ConfigError> {
        let patch = Self { description };
        patch.validate()?;
        Ok(patch)
    }

    /// Parses a patch from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        Self::from_dico(Dico::from_json(&value)?)
    }

    /// Loads a patch from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let patch = Self::from_json(&content)?;
        tracing::debug!(path = %path.display(), boxes = patch.box_count(), "patch loaded");
        Ok(patch)
    }

    /// Writes the patch as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
        let content = self.to_json()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
    }

    /// The patch as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(&self.description.to_json())?)
    }

    /// The full description, including the `page` wrapper if present.
    pub fn description(&self) -> &Dico {
        &self.description
    }

    /// The page entries.
    pub fn page_description(&self) -> &Dico {
        self.description
            .get_dico(keys::PAGE)
            .unwrap_or(&self.description)
    }

    /// Number of box entries.
    pub fn box_count(&self) -> usize {
        self.page_description()
            .get(keys::BOXES)
            .map_or(0, Vec::len)
    }

    /// Number of link entries.
    pub fn link_count(&self) -> usize {
        self.page_description()
            .get(keys::LINKS)
            .map_or(0, Vec::len)
    }

    /// Builds a standalone page from the patch.
    pub fn to_page(&self) -> Arc<Page> {
        Page::create(&self.description)
    }

    /// Replaces the contents of `page` with the patch.
    pub fn load_into(&self, page: &Page) {
        page.read(&self.description);
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.description.has(keys::PAGE) && self.description.get_dico(keys::PAGE).is_none() {
            return Err(ConfigError::InvalidPatch(
                "'page' must be an object".to_string(),
            ));
        }
        let page = self.page_description();
        for key in [keys::BOXES, keys::LINKS] {
            if let Some(entries) = page.get(key)
                && entries.iter().any(|entry| !entry.is_dico())
            {
                return Err(ConfigError::InvalidPatch(format!(
                    "every entry of '{key}' must be an object"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_an_empty_patch() {
        let patch = PatchFile::from_json("{}").unwrap();
        assert_eq!(patch.box_count(), 0);
        assert_eq!(patch.link_count(), 0);
    }

    #[test]
    fn counts_wrapped_and_bare_forms() {
        let wrapped = r#"{"page": {"boxes": [{"box": {"name": "print"}}, {"box": {"name": "print"}}]}}"#;
        assert_eq!(PatchFile::from_json(wrapped).unwrap().box_count(), 2);
        let bare = r#"{"boxes": [{"box": {"name": "print"}}], "links": []}"#;
        let patch = PatchFile::from_json(bare).unwrap();
        assert_eq!(patch.box_count(), 1);
        assert_eq!(patch.link_count(), 0);
    }

    #[test]
    fn rejects_non_object_entries() {
        let err = PatchFile::from_json(r#"{"page": 3}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPatch(_)));
        let err = PatchFile::from_json(r#"{"boxes": [1, 2]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPatch(_)));
    }

    #[test]
    fn rejects_non_object_json() {
        let err = PatchFile::from_json("[1, 2]").unwrap_err();
        assert!(matches!(err, ConfigError::Description(_)));
        let err = PatchFile::from_json("{").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }
}
