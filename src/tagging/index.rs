use indexmap::IndexMap;
use ontotag_files::highlevel::Stage;
use ontotag_files::usda::types::SdfPath;

use crate::tagging::TagConfig;

/// Class name to class prim path, in first-insertion order. The matcher's
/// tie-breaks depend on this order, so it must stay the traversal order of
/// the TBox scene. A repeated name keeps its position but takes the
/// last-seen path.
pub type OntologyIndex = IndexMap<String, SdfPath>;

/// Collects every second-level-or-deeper prim of the TBox scene into the
/// index, skipping ignore-listed names. A malformed TBox just yields a
/// smaller index; lookup failures surface later as unmatched prims.
pub fn build_index(stage_tbox: &Stage, config: &TagConfig) -> OntologyIndex {
    let mut index = OntologyIndex::new();

    for prim_path in stage_tbox.traverse() {
        for class_path in stage_tbox.children_of(&prim_path) {
            let name = class_path.name().to_string();
            let lowercase_name = name.to_lowercase();
            let ignored = config
                .ignore_classes
                .iter()
                .any(|ignore_class| lowercase_name.contains(&ignore_class.to_lowercase()));
            if !ignored {
                index.insert(name, class_path);
            }
        }
    }

    index
}
