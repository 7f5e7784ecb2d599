use indexmap::IndexMap;
use ontotag_files::highlevel::Stage;
use ontotag_files::usda::types::{SdfPath, Value};

use crate::tagging::matcher::{SEMANTIC_LABELS_REL, SEMANTIC_TAG_API};


pub const SEMANTIC_REPORTS_REL: &str = "semantics:semanticReports";
pub const RDF_API: &str = "RdfAPI";

const RDF_CONCEPT_NAME_ATTR: &str = "rdf:conceptName";
const RDF_NAMESPACE_ATTR: &str = "rdf:namespace";
const RDF_DEFINITION_ATTR: &str = "rdf:definition";

/// The ontology attributes captured from a referenced class prim before the
/// instance data around it is pruned.
#[derive(Debug)]
struct CapturedClass {
    concept_name: Option<String>,
    namespace: Option<String>,
    definition: Option<String>,
}

/// Strips instance data from a tagged scene while keeping a minimal class
/// skeleton: only classes actually referenced from some tagged transform
/// prim survive, re-created with their ontology attributes.
pub fn clean_up(in_usd: &str, out_usd: &str) -> Result<(), anyhow::Error> {
    let mut stage = Stage::open(in_usd)?;

    // First-encountered capture wins; the map keeps encounter order for the
    // re-created class prims.
    let mut keep_classes: IndexMap<SdfPath, CapturedClass> = IndexMap::new();

    for prim_path in stage.traverse_all() {
        if stage.type_name(&prim_path) != Some("Xform")
            || !stage.has_api_schema(&prim_path, SEMANTIC_TAG_API)
        {
            continue;
        }

        for relationship in [SEMANTIC_LABELS_REL, SEMANTIC_REPORTS_REL] {
            for target in stage.relationship_targets(&prim_path, relationship) {
                if keep_classes.contains_key(&target) {
                    continue;
                }
                let captured = CapturedClass {
                    concept_name: stage.attribute_string(&target, RDF_CONCEPT_NAME_ATTR),
                    namespace: stage.attribute_string(&target, RDF_NAMESPACE_ATTR),
                    definition: stage.attribute_string(&target, RDF_DEFINITION_ATTR),
                };
                keep_classes.insert(target, captured);
            }
        }
    }
    log::debug!("Captured {} referenced class prim(s)", keep_classes.len());

    // Prune every top-level prim that carries an abstract direct child.
    for top_prim in stage.root_prims() {
        let has_abstract_child = stage
            .children_of(&top_prim)
            .iter()
            .any(|child| stage.is_abstract(child));
        if has_abstract_child {
            stage.remove_prim(&top_prim);
        }
    }

    for (class_path, captured) in &keep_classes {
        stage.create_class_prim(class_path);
        stage.apply_api_schema(class_path, RDF_API);
        stage.set_attribute(
            class_path,
            RDF_CONCEPT_NAME_ATTR,
            "string",
            Value::Str(captured.concept_name.clone().unwrap_or_default()),
        );
        stage.set_attribute(
            class_path,
            RDF_NAMESPACE_ATTR,
            "string",
            Value::Str(captured.namespace.clone().unwrap_or_default()),
        );
        if let Some(definition) = &captured.definition {
            stage.set_attribute(
                class_path,
                RDF_DEFINITION_ATTR,
                "string",
                Value::Str(definition.clone()),
            );
        }
    }

    stage.export(out_usd)?;
    println!("Writing to {}", out_usd);
    Ok(())
}
