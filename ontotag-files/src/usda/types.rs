use std::fmt;

use indexmap::IndexMap;

/// A slash-separated prim path, e.g. `/House/Kitchen/Fridgesurface_01`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SdfPath(String);

impl SdfPath {
    pub fn new(path: impl Into<String>) -> Self {
        SdfPath(path.into())
    }

    /// The absolute root path, parent of all top-level prims.
    pub fn absolute_root() -> Self {
        SdfPath("/".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_absolute_root(&self) -> bool {
        self.0 == "/"
    }

    /// The last path segment. Empty for the absolute root.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }

    pub fn parent(&self) -> Option<SdfPath> {
        if self.is_absolute_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(SdfPath::absolute_root()),
            Some(idx) => Some(SdfPath(self.0[..idx].to_string())),
            None => None,
        }
    }

    pub fn join(&self, child: &str) -> SdfPath {
        if self.is_absolute_root() {
            SdfPath(format!("/{}", child))
        } else {
            SdfPath(format!("{}/{}", self.0, child))
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|segment| !segment.is_empty())
    }
}

impl fmt::Display for SdfPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SdfPath {
    fn from(value: &str) -> Self {
        SdfPath::new(value)
    }
}

/// Prim specifier. `Class` prims are abstract (templates, not instances),
/// `Over` specs only carry opinions for a prim defined elsewhere.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Specifier {
    #[default]
    Def,
    Class,
    Over,
}

/// One reference entry: an external asset file plus the prim within it.
#[derive(Clone, Debug, PartialEq)]
pub struct Reference {
    pub asset_path: String,
    pub prim_path: Option<SdfPath>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Token(String),
    Asset(String),
    Tuple(Vec<Value>),
    List(Vec<Value>),
}

#[derive(Clone, Debug)]
pub struct Attribute {
    pub type_name: String,
    pub custom: bool,
    pub value: Option<Value>,
}

/// A single prim's authored data within one layer.
#[derive(Clone, Debug, Default)]
pub struct PrimSpec {
    pub specifier: Specifier,
    pub type_name: Option<String>,
    pub name: String,
    pub references: Vec<Reference>,
    pub api_schemas: Vec<String>,
    pub attributes: IndexMap<String, Attribute>,
    pub relationships: IndexMap<String, Vec<SdfPath>>,
    pub children: Vec<PrimSpec>,
}

impl PrimSpec {
    /// An empty `over` spec, used to author opinions for a prim whose
    /// definition lives in another layer (or deeper in this one).
    pub fn over(name: &str) -> PrimSpec {
        PrimSpec {
            specifier: Specifier::Over,
            name: name.to_string(),
            ..Default::default()
        }
    }
}

/// One scene-description file: layer metadata plus the root prim specs,
/// in authored order.
#[derive(Debug, Default)]
pub struct Layer {
    pub sub_layer_paths: Vec<String>,
    pub default_prim: Option<String>,
    pub roots: Vec<PrimSpec>,
}

impl Layer {
    pub fn find_spec(&self, path: &SdfPath) -> Option<&PrimSpec> {
        let mut segments = path.segments();
        let first = segments.next()?;
        let mut spec = self.roots.iter().find(|prim| prim.name == first)?;
        for segment in segments {
            spec = spec.children.iter().find(|prim| prim.name == segment)?;
        }
        Some(spec)
    }

    pub fn find_spec_mut(&mut self, path: &SdfPath) -> Option<&mut PrimSpec> {
        let mut segments = path.segments();
        let first = segments.next()?;
        let mut spec = self.roots.iter_mut().find(|prim| prim.name == first)?;
        for segment in segments {
            spec = spec.children.iter_mut().find(|prim| prim.name == segment)?;
        }
        Some(spec)
    }

    /// Returns the spec at `path`, creating it and any missing ancestors as
    /// empty `over` specs.
    pub fn ensure_spec_mut(&mut self, path: &SdfPath) -> &mut PrimSpec {
        let segments: Vec<&str> = path.segments().collect();
        assert!(!segments.is_empty(), "Can't create a spec for the absolute root");
        Self::ensure_in(&mut self.roots, &segments)
    }

    fn ensure_in<'a>(children: &'a mut Vec<PrimSpec>, segments: &[&str]) -> &'a mut PrimSpec {
        let position = children
            .iter()
            .position(|prim| prim.name == segments[0])
            .unwrap_or_else(|| {
                children.push(PrimSpec::over(segments[0]));
                children.len() - 1
            });

        if segments.len() == 1 {
            &mut children[position]
        } else {
            Self::ensure_in(&mut children[position].children, &segments[1..])
        }
    }

    /// Removes the spec at `path` (with its whole subtree). Returns whether
    /// anything was removed.
    pub fn remove_spec(&mut self, path: &SdfPath) -> bool {
        let Some(parent) = path.parent() else {
            return false;
        };

        let name = path.name().to_string();
        let children = if parent.is_absolute_root() {
            &mut self.roots
        } else {
            match self.find_spec_mut(&parent) {
                Some(spec) => &mut spec.children,
                None => return false,
            }
        };

        let len_before = children.len();
        children.retain(|prim| prim.name != name);
        children.len() != len_before
    }
}
