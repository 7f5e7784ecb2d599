use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use ontotag_files::highlevel::Stage;

use crate::tagging::index::build_index;
use crate::tagging::matcher::match_and_tag;
use crate::tagging::rewriter::rewrite_references;

pub mod index;
pub mod matcher;
pub mod rewriter;

#[cfg(test)]
mod tests;

/// Matching configuration, passed by reference into the index builder and
/// the matcher. No process-global state.
#[derive(Debug)]
pub struct TagConfig {
    /// Class names containing any of these substrings (case-insensitively)
    /// never enter the ontology index.
    pub ignore_classes: Vec<String>,
    /// Exact candidate-name substitutions applied before the lookup.
    pub synonyms: IndexMap<String, String>,
}

impl Default for TagConfig {
    fn default() -> Self {
        let mut synonyms = IndexMap::new();
        synonyms.insert("Fridge".to_string(), "Refrigerator".to_string());

        TagConfig {
            ignore_classes: vec!["animal".to_string()],
            synonyms,
        }
    }
}

/// Tags every transform prim of the ABox scene with ontology classes from the
/// TBox scene, rewriting asset references along the way.
///
/// Mutations happen on a temporary copy next to the input; the finished layer
/// is renamed to `out_abox_usd`, so a crash mid-run never leaves a partially
/// written file at the output name.
pub fn auto_sem_tag(
    in_abox_usd: &str,
    in_tbox_usd: &str,
    out_abox_usd: &str,
    config: &TagConfig,
) -> Result<(), anyhow::Error> {
    let scene_dir = Path::new(in_abox_usd).parent().unwrap_or(Path::new(""));
    let tmp_abox_usd = scene_dir.join("tmp.usda");
    fs::copy(in_abox_usd, &tmp_abox_usd)?;

    let stage_tbox = Stage::open(in_tbox_usd)?;
    let index = build_index(&stage_tbox, config);
    log::debug!("Built ontology index with {} classes", index.len());

    let mut stage_abox = Stage::open(&tmp_abox_usd)?;
    stage_abox.set_sub_layers(vec![in_tbox_usd.to_string()])?;

    for prim_path in stage_abox.traverse() {
        rewrite_references(&mut stage_abox, &prim_path, scene_dir);

        if stage_abox.type_name(&prim_path) == Some("Xform") {
            match_and_tag(&mut stage_abox, &prim_path, &index, config);
        }
    }

    stage_abox.save()?;
    fs::rename(&tmp_abox_usd, out_abox_usd)?;

    println!(
        "Save usd stage to {} that has semantic labels from {}",
        out_abox_usd, in_tbox_usd
    );
    Ok(())
}
