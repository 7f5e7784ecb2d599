use std::path::Path;

use itertools::Itertools;
use ontotag_files::highlevel::Stage;
use ontotag_files::usda::types::{Reference, SdfPath};

/// Re-bases the prim's own reference entries (root layer opinions only) onto
/// `scene_dir`, the directory of the input scene file. Cardinality and order
/// are preserved; a prim without references is left untouched.
pub fn rewrite_references(stage: &mut Stage, prim_path: &SdfPath, scene_dir: &Path) {
    let references = stage.local_references(prim_path);
    if references.is_empty() {
        return;
    }

    let resolved = references
        .into_iter()
        .map(|reference| Reference {
            asset_path: resolve_asset_path(&reference.asset_path, scene_dir),
            prim_path: reference.prim_path,
        })
        .collect_vec();

    log::debug!("Rewriting {} reference(s) on {}", resolved.len(), prim_path);
    stage.set_local_references(prim_path, resolved);
}

/// Absolute paths pass through unchanged; relative ones lose a leading `./`
/// and are joined with the scene directory.
pub fn resolve_asset_path(asset_path: &str, scene_dir: &Path) -> String {
    if Path::new(asset_path).is_absolute() {
        return asset_path.to_string();
    }

    let trimmed = asset_path.strip_prefix("./").unwrap_or(asset_path);
    scene_dir.join(trimmed).to_string_lossy().into_owned()
}
