use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use ontotag_files::highlevel::Stage;
use ontotag_files::usda::types::SdfPath;

use crate::tagging::index::{build_index, OntologyIndex};
use crate::tagging::matcher::{
    derive_candidate, pick_dfl_class, resolve_classes, SEMANTIC_LABELS_REL, SEMANTIC_TAG_API,
};
use crate::tagging::rewriter::{resolve_asset_path, rewrite_references};
use crate::tagging::{auto_sem_tag, TagConfig};

fn test_dir(name: &str) -> Result<PathBuf, anyhow::Error> {
    let dir = std::env::temp_dir().join(format!("ontotag_{}", name));
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn index_of(entries: &[(&str, &str)]) -> OntologyIndex {
    let mut index = IndexMap::new();
    for (name, path) in entries {
        index.insert(name.to_string(), SdfPath::new(*path));
    }
    index
}

#[test]
fn candidate_derivation_is_idempotent() {
    assert_eq!(derive_candidate("Fridgesurface_01"), "Fridge");
    assert_eq!(derive_candidate("Fridge"), "Fridge");
    assert_eq!(derive_candidate("LightSwitch"), "LightSwitch");
    assert_eq!(derive_candidate("Counter_Top_2surface"), "CounterTop");

    let once = derive_candidate("Tablesurface_03");
    assert_eq!(derive_candidate(&once), once);
}

#[test]
fn exact_pass_splits_tracks_by_namespace() {
    let index = index_of(&[
        ("_class_Refrigerator", "/SOMA/_class_Refrigerator"),
        ("_class_refrigerator", "/SOMA_DFL/_class_refrigerator"),
        ("_class_refrigerator_extra", "/SOMA_DFL/_class_refrigerator_extra"),
    ]);

    let resolved = resolve_classes("Refrigerator", &index);
    assert_eq!(resolved.soma, vec![SdfPath::new("/SOMA/_class_Refrigerator")]);
    assert_eq!(resolved.dfl, vec![SdfPath::new("/SOMA_DFL/_class_refrigerator")]);
}

#[test]
fn suffix_stripped_pass_handles_disambiguated_names() {
    let index = index_of(&[("_class_lightswitchnwnv2", "/SOMA_DFL/_class_lightswitchnwnv2")]);

    let resolved = resolve_classes("LightSwitch", &index);
    assert!(resolved.soma.is_empty());
    assert_eq!(
        resolved.dfl,
        vec![SdfPath::new("/SOMA_DFL/_class_lightswitchnwnv2")]
    );
}

#[test]
fn multi_word_pass_joins_capitalized_words() {
    let index = index_of(&[("_class_light_switchnwn1", "/SOMA_DFL/_class_light_switchnwn1")]);

    let resolved = resolve_classes("LightSwitch", &index);
    assert_eq!(
        resolved.dfl,
        vec![SdfPath::new("/SOMA_DFL/_class_light_switchnwn1")]
    );
}

#[test]
fn last_word_pass_is_the_final_fallback() {
    let index = index_of(&[("_class_tablenwnv1", "/SOMA_DFL/_class_tablenwnv1")]);

    let resolved = resolve_classes("KitchenTable", &index);
    assert_eq!(resolved.dfl, vec![SdfPath::new("/SOMA_DFL/_class_tablenwnv1")]);

    // A single-word candidate never reaches the last-word pass.
    let resolved = resolve_classes("Kitchen", &index);
    assert!(resolved.dfl.is_empty());
}

#[test]
fn furniture_variant_is_preferred() {
    let index = index_of(&[
        ("_class_chairnwndevice", "/SOMA_DFL/_class_chairnwndevice"),
        ("_class_chairnwnfurniture", "/SOMA_DFL/_class_chairnwnfurniture"),
    ]);

    let resolved = resolve_classes("Chair", &index);
    assert_eq!(resolved.dfl.len(), 2);
    assert_eq!(
        pick_dfl_class(&resolved.dfl),
        Some(&SdfPath::new("/SOMA_DFL/_class_chairnwnfurniture"))
    );
}

#[test]
fn unmatched_candidate_resolves_to_nothing() {
    let index = index_of(&[("_class_chair", "/SOMA_DFL/_class_chair")]);
    let resolved = resolve_classes("Spaceship", &index);
    assert!(resolved.soma.is_empty());
    assert!(resolved.dfl.is_empty());
}

#[test]
fn asset_path_resolution() {
    let scene_dir = Path::new("/project");
    assert_eq!(resolve_asset_path("/abs/other.usda", scene_dir), "/abs/other.usda");
    assert_eq!(
        resolve_asset_path("./meshes/chair.usda", scene_dir),
        "/project/meshes/chair.usda"
    );
    assert_eq!(
        resolve_asset_path("meshes/chair.usda", scene_dir),
        "/project/meshes/chair.usda"
    );
}

const TBOX_FIXTURE: &str = r#"#usda 1.0

def Scope "SOMA"
{
    class "_class_Refrigerator"
    {
        custom string rdf:conceptName = "Refrigerator"
    }
}

def Scope "SOMA_DFL"
{
    class "_class_refrigerator"
    {
        custom string rdf:conceptName = "refrigerator"
    }

    class "_class_animalcage"
    {
    }
}
"#;

#[test]
fn index_building_skips_ignored_and_keeps_last_path() -> Result<(), anyhow::Error> {
    let dir = test_dir("index")?;
    let tbox_src = r#"#usda 1.0

def Scope "SOMA"
{
    class "_class_chair"
    {
    }

    class "_class_animalcage"
    {
    }
}

def Scope "SOMA_DFL"
{
    class "_class_chair"
    {
    }
}
"#;
    let tbox = dir.join("tbox.usda");
    fs::write(&tbox, tbox_src)?;

    let stage = Stage::open(&tbox)?;
    let index = build_index(&stage, &TagConfig::default());

    assert_eq!(index.len(), 1);
    // Last-seen path wins; top-level namespace prims are never keys.
    assert_eq!(
        index.get("_class_chair"),
        Some(&SdfPath::new("/SOMA_DFL/_class_chair"))
    );
    assert!(!index.contains_key("SOMA"));
    assert!(!index.contains_key("_class_animalcage"));
    Ok(())
}

#[test]
fn tagging_attaches_both_tracks_and_rewrites_references() -> Result<(), anyhow::Error> {
    let dir = test_dir("tag_e2e")?;
    fs::write(dir.join("tbox.usda"), TBOX_FIXTURE)?;

    let abox_src = r#"#usda 1.0

def Xform "House"
{
    def Xform "Fridgesurface_01" (
        prepend references = @./meshes/fridge.usda@</Fridge>
    )
    {
    }
}
"#;
    let abox = dir.join("scene.usda");
    fs::write(&abox, abox_src)?;

    let tbox = dir.join("tbox.usda").to_string_lossy().into_owned();
    let out = dir.join("tagged.usda").to_string_lossy().into_owned();
    auto_sem_tag(&abox.to_string_lossy(), &tbox, &out, &TagConfig::default())?;

    let tagged = Stage::open(&out)?;
    let fridge = SdfPath::new("/House/Fridgesurface_01");

    assert!(tagged.has_api_schema(&fridge, SEMANTIC_TAG_API));
    assert_eq!(
        tagged.relationship_targets(&fridge, SEMANTIC_LABELS_REL),
        vec![
            SdfPath::new("/SOMA/_class_Refrigerator"),
            SdfPath::new("/SOMA_DFL/_class_refrigerator"),
        ]
    );

    let references = tagged.local_references(&fridge);
    assert_eq!(references.len(), 1);
    assert_eq!(
        references[0].asset_path,
        dir.join("meshes/fridge.usda").to_string_lossy()
    );
    assert_eq!(references[0].prim_path, Some(SdfPath::new("/Fridge")));

    // The TBox rides along as a sublayer so the targets resolve.
    assert!(tagged.is_abstract(&SdfPath::new("/SOMA_DFL/_class_refrigerator")));
    Ok(())
}

#[test]
fn tagging_matches_suffixed_classes() -> Result<(), anyhow::Error> {
    let dir = test_dir("tag_suffix")?;
    let tbox_src = r#"#usda 1.0

def Scope "SOMA_DFL"
{
    class "_class_lightswitchnwnv2"
    {
    }
}
"#;
    fs::write(dir.join("tbox.usda"), tbox_src)?;

    let abox_src = r#"#usda 1.0

def Xform "LightSwitch"
{
}
"#;
    fs::write(dir.join("scene.usda"), abox_src)?;

    let tbox = dir.join("tbox.usda").to_string_lossy().into_owned();
    let out = dir.join("tagged.usda").to_string_lossy().into_owned();
    auto_sem_tag(
        &dir.join("scene.usda").to_string_lossy(),
        &tbox,
        &out,
        &TagConfig::default(),
    )?;

    let tagged = Stage::open(&out)?;
    assert_eq!(
        tagged.relationship_targets(&SdfPath::new("/LightSwitch"), SEMANTIC_LABELS_REL),
        vec![SdfPath::new("/SOMA_DFL/_class_lightswitchnwnv2")]
    );
    Ok(())
}

#[test]
fn synonym_and_direct_naming_converge() -> Result<(), anyhow::Error> {
    let dir = test_dir("tag_synonym")?;
    fs::write(dir.join("tbox.usda"), TBOX_FIXTURE)?;

    let abox_src = r#"#usda 1.0

def Xform "Fridge_01"
{
}

def Xform "Refrigerator_02"
{
}
"#;
    fs::write(dir.join("scene.usda"), abox_src)?;

    let tbox = dir.join("tbox.usda").to_string_lossy().into_owned();
    let out = dir.join("tagged.usda").to_string_lossy().into_owned();
    auto_sem_tag(
        &dir.join("scene.usda").to_string_lossy(),
        &tbox,
        &out,
        &TagConfig::default(),
    )?;

    let tagged = Stage::open(&out)?;
    let via_synonym =
        tagged.relationship_targets(&SdfPath::new("/Fridge_01"), SEMANTIC_LABELS_REL);
    let direct =
        tagged.relationship_targets(&SdfPath::new("/Refrigerator_02"), SEMANTIC_LABELS_REL);
    assert_eq!(via_synonym, direct);
    assert!(!via_synonym.is_empty());
    Ok(())
}

#[test]
fn rewriting_preserves_cardinality_and_order() -> Result<(), anyhow::Error> {
    let dir = test_dir("rewrite")?;
    let scene_src = r#"#usda 1.0

def Xform "Combo" (
    prepend references = [
        @./meshes/chair.usda@</Chair>,
        @/abs/other.usda@</Other>,
    ]
)
{
}

def Xform "Plain"
{
}
"#;
    let scene = dir.join("scene.usda");
    fs::write(&scene, scene_src)?;

    let mut stage = Stage::open(&scene)?;
    let combo = SdfPath::new("/Combo");
    let plain = SdfPath::new("/Plain");

    rewrite_references(&mut stage, &combo, &dir);
    rewrite_references(&mut stage, &plain, &dir);

    let references = stage.local_references(&combo);
    assert_eq!(references.len(), 2);
    assert_eq!(
        references[0].asset_path,
        dir.join("meshes/chair.usda").to_string_lossy()
    );
    assert_eq!(references[0].prim_path, Some(SdfPath::new("/Chair")));
    assert_eq!(references[1].asset_path, "/abs/other.usda");
    assert_eq!(references[1].prim_path, Some(SdfPath::new("/Other")));

    // A prim without references stays untouched.
    assert!(stage.local_references(&plain).is_empty());
    Ok(())
}

#[test]
fn retagging_is_additive_never_destructive() -> Result<(), anyhow::Error> {
    let dir = test_dir("tag_idempotent")?;
    fs::write(dir.join("tbox.usda"), TBOX_FIXTURE)?;

    let abox_src = r#"#usda 1.0

def Xform "Fridgesurface_01"
{
}
"#;
    fs::write(dir.join("scene.usda"), abox_src)?;

    let tbox = dir.join("tbox.usda").to_string_lossy().into_owned();
    let first_out = dir.join("tagged_once.usda").to_string_lossy().into_owned();
    let second_out = dir.join("tagged_twice.usda").to_string_lossy().into_owned();

    auto_sem_tag(
        &dir.join("scene.usda").to_string_lossy(),
        &tbox,
        &first_out,
        &TagConfig::default(),
    )?;
    auto_sem_tag(&first_out, &tbox, &second_out, &TagConfig::default())?;

    let once = Stage::open(&first_out)?;
    let twice = Stage::open(&second_out)?;
    let fridge = SdfPath::new("/Fridgesurface_01");

    let first_targets = once.relationship_targets(&fridge, SEMANTIC_LABELS_REL);
    let second_targets = twice.relationship_targets(&fridge, SEMANTIC_LABELS_REL);
    assert_eq!(first_targets.len(), 2);
    assert_eq!(second_targets, first_targets);
    Ok(())
}
