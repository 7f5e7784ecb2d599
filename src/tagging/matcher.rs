use ontotag_files::highlevel::Stage;
use ontotag_files::usda::types::SdfPath;

use crate::tagging::index::OntologyIndex;
use crate::tagging::TagConfig;

pub const SEMANTIC_TAG_API: &str = "SemanticTagAPI";
pub const SEMANTIC_LABELS_REL: &str = "semantics:semanticLabels";

const CLASS_PREFIX: &str = "_class_";
/// Marker token separating a class name from its disambiguating suffix,
/// e.g. `_class_chairnwnfurniture`.
const SUFFIX_MARKER: &str = "nwn";

/// Classes resolved for one candidate name, one list per ontology track.
/// Lists keep the index's insertion order.
#[derive(Debug, Default, PartialEq)]
pub struct ResolvedClasses {
    pub soma: Vec<SdfPath>,
    pub dfl: Vec<SdfPath>,
}

/// Reduces a prim name to its pure-alphabetic candidate form: the literal
/// substring `surface` is removed, then digits, underscores and punctuation
/// are dropped. Idempotent once applied.
pub fn derive_candidate(prim_name: &str) -> String {
    prim_name
        .replace("surface", "")
        .chars()
        .filter(|c| c.is_alphabetic())
        .collect()
}

/// Splits a candidate at uppercase boundaries, keeping only chunks that
/// start with an uppercase letter ("KitchenTable" -> ["Kitchen", "Table"]).
fn capitalized_words(candidate: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    for c in candidate.chars() {
        if c.is_ascii_uppercase() {
            words.push(String::from(c));
        } else if let Some(word) = words.last_mut() {
            word.push(c);
        }
    }
    words
}

/// Drops the last suffix-marker-delimited segment of a class name and
/// rejoins the rest with underscores. Names without the marker reduce to the
/// empty string and can never match.
fn strip_suffix(class_name: &str) -> String {
    let segments: Vec<&str> = class_name.split(SUFFIX_MARKER).collect();
    segments[..segments.len() - 1].join("_")
}

/// Layered lookup of a candidate against the index, decreasing in
/// specificity. The SOMA track only ever fills from the exact pass; the DFL
/// track falls back to suffix-stripped, multi-word and last-word matching,
/// stopping at the first pass that produced any hit.
pub fn resolve_classes(candidate: &str, index: &OntologyIndex) -> ResolvedClasses {
    let mut resolved = ResolvedClasses::default();

    let exact = format!("{}{}", CLASS_PREFIX, candidate).to_lowercase();
    for (class_name, class_path) in index {
        if class_name.to_lowercase() == exact {
            match class_path.parent().as_ref().map(|parent| parent.name()) {
                Some("SOMA_DFL") => resolved.dfl.push(class_path.clone()),
                Some("SOMA") => resolved.soma.push(class_path.clone()),
                _ => {}
            }
        }
    }

    let stripped_goal = format!("{}{}", CLASS_PREFIX, candidate.to_lowercase());
    if resolved.dfl.is_empty() {
        for (class_name, class_path) in index {
            if strip_suffix(class_name).to_lowercase() == stripped_goal {
                resolved.dfl.push(class_path.clone());
            }
        }
    }

    let words = capitalized_words(candidate);
    if resolved.dfl.is_empty() && words.len() > 1 {
        let joined_goal = format!("{}{}", CLASS_PREFIX, words.join("_").to_lowercase());
        for (class_name, class_path) in index {
            if strip_suffix(class_name).to_lowercase() == joined_goal {
                resolved.dfl.push(class_path.clone());
            }
        }
    }

    if resolved.dfl.is_empty() && words.len() > 1 {
        let last_word_goal = format!("{}{}", CLASS_PREFIX, words[words.len() - 1].to_lowercase());
        for (class_name, class_path) in index {
            if strip_suffix(class_name).to_lowercase() == last_word_goal {
                resolved.dfl.push(class_path.clone());
            }
        }
    }

    resolved
}

/// Among the accumulated DFL candidates, the first whose name mentions
/// furniture wins, otherwise the first accumulated.
pub fn pick_dfl_class(dfl_classes: &[SdfPath]) -> Option<&SdfPath> {
    dfl_classes
        .iter()
        .find(|class_path| class_path.name().contains("furniture"))
        .or_else(|| dfl_classes.first())
}

/// Resolves the prim's name against the ontology and attaches the semantic
/// label relationship(s). Re-running on an already tagged prim only ever
/// adds targets, never removes them.
pub fn match_and_tag(stage: &mut Stage, prim_path: &SdfPath, index: &OntologyIndex, config: &TagConfig) {
    let mut candidate = derive_candidate(prim_path.name());
    if let Some(synonym) = config.synonyms.get(&candidate) {
        candidate = synonym.clone();
    }

    let resolved = resolve_classes(&candidate, index);
    if resolved.soma.is_empty() && resolved.dfl.is_empty() {
        println!("prim_name: {} is not in the TBox", candidate);
    }

    stage.apply_api_schema(prim_path, SEMANTIC_TAG_API);

    if let Some(soma_class) = resolved.soma.first() {
        println!("prim_name: {} is in class {}", candidate, soma_class.name());
        stage.add_relationship_target(prim_path, SEMANTIC_LABELS_REL, soma_class.clone());
    }

    if let Some(dfl_class) = pick_dfl_class(&resolved.dfl) {
        println!("prim_name: {} is in class {}", candidate, dfl_class.name());
        stage.add_relationship_target(prim_path, SEMANTIC_LABELS_REL, dfl_class.clone());
    }
}
