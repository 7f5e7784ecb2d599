//! Composed view over a root layer and its sublayers.
//!
//! The root layer is the strongest; sublayers follow in authored order. All
//! mutations target the root layer, matching the scene engine's default edit
//! target. Queries resolve composed opinions strongest-first.

use std::fs;
use std::path::{Path, PathBuf};

use crate::usda::reader::UsdaReader;
use crate::usda::types::{Attribute, Layer, PrimSpec, Reference, SdfPath, Specifier, Value};
use crate::usda::writer::UsdaWriter;
use crate::ParserError;


pub struct Stage {
    root_path: PathBuf,
    root_layer: Layer,
    sub_layers: Vec<Layer>,
}

impl Stage {
    pub fn open(path: impl AsRef<Path>) -> Result<Stage, ParserError> {
        let path = path.as_ref();
        let src = fs::read_to_string(path)?;
        let root_layer = UsdaReader::parse_layer(&src)?;

        let mut stage = Stage {
            root_path: path.to_path_buf(),
            root_layer,
            sub_layers: Vec::new(),
        };
        stage.load_sub_layers()?;
        Ok(stage)
    }

    fn load_sub_layers(&mut self) -> Result<(), ParserError> {
        let base = self.root_path.parent().map(Path::to_path_buf).unwrap_or_default();

        self.sub_layers.clear();
        for sub_layer in &self.root_layer.sub_layer_paths {
            let sub_path = if Path::new(sub_layer).is_absolute() {
                PathBuf::from(sub_layer)
            } else {
                base.join(sub_layer.strip_prefix("./").unwrap_or(sub_layer))
            };
            let src = fs::read_to_string(&sub_path)?;
            self.sub_layers.push(UsdaReader::parse_layer(&src)?);
        }
        Ok(())
    }

    /// Replaces the root layer's sublayer list and reloads the sublayers.
    pub fn set_sub_layers(&mut self, paths: Vec<String>) -> Result<(), ParserError> {
        self.root_layer.sub_layer_paths = paths;
        self.load_sub_layers()
    }

    pub fn root_layer(&self) -> &Layer {
        &self.root_layer
    }

    fn layers(&self) -> impl Iterator<Item = &Layer> {
        std::iter::once(&self.root_layer).chain(self.sub_layers.iter())
    }

    fn specs_at<'a, 'p>(&'a self, path: &'p SdfPath) -> impl Iterator<Item = &'a PrimSpec> + use<'a, 'p> {
        self.layers().filter_map(move |layer| layer.find_spec(path))
    }

    /// All children of `path` across layers, strongest layer's order first,
    /// abstract prims included.
    pub fn children_of(&self, path: &SdfPath) -> Vec<SdfPath> {
        let mut children: Vec<SdfPath> = Vec::new();
        for layer in self.layers() {
            let layer_children = if path.is_absolute_root() {
                Some(&layer.roots)
            } else {
                layer.find_spec(path).map(|spec| &spec.children)
            };
            let Some(layer_children) = layer_children else {
                continue;
            };
            for child in layer_children {
                let child_path = path.join(&child.name);
                if !children.contains(&child_path) {
                    children.push(child_path);
                }
            }
        }
        children
    }

    /// Top-level prims of the composed stage.
    pub fn root_prims(&self) -> Vec<SdfPath> {
        self.children_of(&SdfPath::absolute_root())
    }

    /// Depth-first composed traversal, pruning abstract subtrees (the
    /// engine's default predicate).
    pub fn traverse(&self) -> Vec<SdfPath> {
        let mut prims = Vec::new();
        self.walk(&SdfPath::absolute_root(), false, &mut prims);
        prims
    }

    /// Depth-first composed traversal including abstract prims.
    pub fn traverse_all(&self) -> Vec<SdfPath> {
        let mut prims = Vec::new();
        self.walk(&SdfPath::absolute_root(), true, &mut prims);
        prims
    }

    fn walk(&self, parent: &SdfPath, include_abstract: bool, out: &mut Vec<SdfPath>) {
        for child in self.children_of(parent) {
            if !include_abstract && self.is_abstract(&child) {
                continue;
            }
            out.push(child.clone());
            self.walk(&child, include_abstract, out);
        }
    }

    /// Whether the defining spec for `path` is a class spec. Over-only prims
    /// are not abstract.
    pub fn is_abstract(&self, path: &SdfPath) -> bool {
        self.specs_at(path)
            .find(|spec| spec.specifier != Specifier::Over)
            .map(|spec| spec.specifier == Specifier::Class)
            .unwrap_or(false)
    }

    pub fn type_name(&self, path: &SdfPath) -> Option<&str> {
        self.specs_at(path)
            .find_map(|spec| spec.type_name.as_deref())
    }

    pub fn has_api_schema(&self, path: &SdfPath, schema: &str) -> bool {
        self.specs_at(path)
            .any(|spec| spec.api_schemas.iter().any(|applied| applied == schema))
    }

    /// Composed attribute lookup, strongest opinion wins.
    pub fn attribute(&self, path: &SdfPath, name: &str) -> Option<&Attribute> {
        self.specs_at(path).find_map(|spec| spec.attributes.get(name))
    }

    pub fn attribute_string(&self, path: &SdfPath, name: &str) -> Option<String> {
        match self.attribute(path, name)?.value.as_ref()? {
            Value::Str(text) => Some(text.clone()),
            Value::Token(word) => Some(word.clone()),
            _ => None,
        }
    }

    /// Composed relationship targets, strongest authored list wins.
    pub fn relationship_targets(&self, path: &SdfPath, name: &str) -> Vec<SdfPath> {
        self.specs_at(path)
            .find_map(|spec| spec.relationships.get(name))
            .cloned()
            .unwrap_or_default()
    }

    /// The prim's own reference entries in the root layer (non-inherited).
    pub fn local_references(&self, path: &SdfPath) -> Vec<Reference> {
        self.root_layer
            .find_spec(path)
            .map(|spec| spec.references.clone())
            .unwrap_or_default()
    }

    /// Replaces the prim's reference list in the root layer (clear + re-add).
    pub fn set_local_references(&mut self, path: &SdfPath, references: Vec<Reference>) {
        self.root_layer.ensure_spec_mut(path).references = references;
    }

    /// Applies an API schema to the prim in the root layer. Idempotent.
    pub fn apply_api_schema(&mut self, path: &SdfPath, schema: &str) {
        let spec = self.root_layer.ensure_spec_mut(path);
        if !spec.api_schemas.iter().any(|applied| applied == schema) {
            spec.api_schemas.push(schema.to_string());
        }
    }

    /// Appends a relationship target in the root layer. Adding an already
    /// present target is a no-op.
    pub fn add_relationship_target(&mut self, path: &SdfPath, name: &str, target: SdfPath) {
        let spec = self.root_layer.ensure_spec_mut(path);
        let targets = spec.relationships.entry(name.to_string()).or_insert_with(Vec::new);
        if !targets.contains(&target) {
            targets.push(target);
        }
    }

    pub fn set_attribute(&mut self, path: &SdfPath, name: &str, type_name: &str, value: Value) {
        let spec = self.root_layer.ensure_spec_mut(path);
        spec.attributes.insert(
            name.to_string(),
            Attribute {
                type_name: type_name.to_string(),
                custom: false,
                value: Some(value),
            },
        );
    }

    /// Removes the prim (and its whole subtree) from the root layer.
    pub fn remove_prim(&mut self, path: &SdfPath) -> bool {
        self.root_layer.remove_spec(path)
    }

    /// Synthesizes a class prim at `path` in the root layer, creating missing
    /// ancestors as `over` specs.
    pub fn create_class_prim(&mut self, path: &SdfPath) {
        let spec = self.root_layer.ensure_spec_mut(path);
        spec.specifier = Specifier::Class;
    }

    /// Saves the root layer back to the file it was opened from, atomically.
    pub fn save(&self) -> Result<(), ParserError> {
        UsdaWriter::save_atomic(&self.root_layer, &self.root_path)
    }

    /// Writes the root layer to another location, atomically.
    pub fn export(&self, path: impl AsRef<Path>) -> Result<(), ParserError> {
        UsdaWriter::save_atomic(&self.root_layer, path.as_ref())
    }
}
