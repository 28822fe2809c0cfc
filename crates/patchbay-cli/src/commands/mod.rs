//! CLI command implementations.

pub mod boxes;
pub mod info;
pub mod run;

use std::sync::Arc;

use anyhow::Context;
use patchbay_config::{PatchFile, find_patch};
use patchbay_core::Page;

/// Loads a patch given as a path or as a name in the user patches directory.
pub fn load_page(patch: &str) -> anyhow::Result<Arc<Page>> {
    let path = find_patch(patch).with_context(|| format!("patch not found: {patch}"))?;
    let file = PatchFile::load(&path).with_context(|| format!("loading {}", path.display()))?;
    let page = file.to_page();
    if page.box_count() < file.box_count() {
        tracing::warn!(
            expected = file.box_count(),
            created = page.box_count(),
            "some boxes could not be created"
        );
    }
    Ok(page)
}
