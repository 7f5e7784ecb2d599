use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::usda::types::{Layer, PrimSpec, Reference, Specifier, Value};
use crate::ParserError;

const INDENT: &str = "    ";

pub struct UsdaWriter {}

impl UsdaWriter {
    /// Serializes a layer back to its text form.
    pub fn write_layer(layer: &Layer) -> String {
        let mut out = String::from("#usda 1.0\n");

        if layer.default_prim.is_some() || !layer.sub_layer_paths.is_empty() {
            out.push_str("(\n");
            if let Some(default_prim) = &layer.default_prim {
                let _ = writeln!(out, "{}defaultPrim = {}", INDENT, quote(default_prim));
            }
            if !layer.sub_layer_paths.is_empty() {
                let _ = writeln!(out, "{}subLayers = [", INDENT);
                for sub_layer in &layer.sub_layer_paths {
                    let _ = writeln!(out, "{}{}@{}@", INDENT, INDENT, sub_layer);
                }
                let _ = writeln!(out, "{}]", INDENT);
            }
            out.push_str(")\n");
        }

        for prim in &layer.roots {
            out.push('\n');
            Self::write_prim(&mut out, prim, 0);
        }

        out
    }

    /// Writes the layer to a sibling temporary file and renames it over the
    /// destination, so the destination is only ever the previous version or
    /// the fully written new one.
    pub fn save_atomic(layer: &Layer, path: &Path) -> Result<(), ParserError> {
        let text = Self::write_layer(layer);

        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        fs::write(&tmp_path, text)?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    fn write_prim(out: &mut String, prim: &PrimSpec, depth: usize) {
        let pad = INDENT.repeat(depth);

        let specifier = match prim.specifier {
            Specifier::Def => "def",
            Specifier::Class => "class",
            Specifier::Over => "over",
        };
        match &prim.type_name {
            Some(type_name) => {
                let _ = write!(out, "{}{} {} {}", pad, specifier, type_name, quote(&prim.name));
            }
            None => {
                let _ = write!(out, "{}{} {}", pad, specifier, quote(&prim.name));
            }
        }

        if !prim.api_schemas.is_empty() || !prim.references.is_empty() {
            out.push_str(" (\n");
            if !prim.api_schemas.is_empty() {
                let schemas = prim
                    .api_schemas
                    .iter()
                    .map(|schema| quote(schema))
                    .collect::<Vec<_>>()
                    .join(", ");
                let _ = writeln!(out, "{}{}prepend apiSchemas = [{}]", pad, INDENT, schemas);
            }
            match prim.references.len() {
                0 => {}
                1 => {
                    let _ = writeln!(
                        out,
                        "{}{}prepend references = {}",
                        pad,
                        INDENT,
                        format_reference(&prim.references[0])
                    );
                }
                _ => {
                    let _ = writeln!(out, "{}{}prepend references = [", pad, INDENT);
                    for reference in &prim.references {
                        let _ = writeln!(out, "{}{}{}{},", pad, INDENT, INDENT, format_reference(reference));
                    }
                    let _ = writeln!(out, "{}{}]", pad, INDENT);
                }
            }
            let _ = write!(out, "{})", pad);
        }

        let _ = writeln!(out, "\n{}{{", pad);

        let body_pad = INDENT.repeat(depth + 1);
        for (name, attribute) in &prim.attributes {
            let custom = if attribute.custom { "custom " } else { "" };
            match &attribute.value {
                Some(value) => {
                    let _ = writeln!(
                        out,
                        "{}{}{} {} = {}",
                        body_pad,
                        custom,
                        attribute.type_name,
                        name,
                        format_value(value)
                    );
                }
                None => {
                    let _ = writeln!(out, "{}{}{} {}", body_pad, custom, attribute.type_name, name);
                }
            }
        }

        for (name, targets) in &prim.relationships {
            let list = targets
                .iter()
                .map(|target| format!("<{}>", target))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(out, "{}prepend rel {} = [{}]", body_pad, name, list);
        }

        for child in &prim.children {
            out.push('\n');
            Self::write_prim(out, child, depth + 1);
        }

        let _ = writeln!(out, "{}}}", pad);
    }
}

fn format_reference(reference: &Reference) -> String {
    match &reference.prim_path {
        Some(prim_path) => format!("@{}@<{}>", reference.asset_path, prim_path),
        None => format!("@{}@", reference.asset_path),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Bool(true) => "true".to_string(),
        Value::Bool(false) => "false".to_string(),
        Value::Int(number) => number.to_string(),
        Value::Float(number) => {
            if number.fract() == 0.0 && number.is_finite() {
                format!("{:.1}", number)
            } else {
                number.to_string()
            }
        }
        Value::Str(text) => quote(text),
        Value::Token(word) => word.clone(),
        Value::Asset(path) => format!("@{}@", path),
        Value::Tuple(elements) => {
            let inner = elements.iter().map(format_value).collect::<Vec<_>>().join(", ");
            format!("({})", inner)
        }
        Value::List(elements) => {
            let inner = elements.iter().map(format_value).collect::<Vec<_>>().join(", ");
            format!("[{}]", inner)
        }
    }
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}
