//! Template loading and management

use kubernetes_provider_generator_common::{GeneratorError, Result};
use std::collections::HashMap;
use tera::{Tera, Value};

/// Template name and source of every emitted file kind
const TEMPLATES: &[(&str, &str)] = &[
    ("macros", include_str!("../templates/macros.tera")),
    ("Cargo.toml", include_str!("../templates/Cargo.toml.tera")),
    ("README.md", include_str!("../templates/README.md.tera")),
    ("lib.rs", include_str!("../templates/lib.rs.tera")),
    ("types.rs", include_str!("../templates/types.rs.tera")),
    ("category_mod.rs", include_str!("../templates/category_mod.rs.tera")),
    ("resource.rs", include_str!("../templates/resource.rs.tera")),
    ("data_source.rs", include_str!("../templates/data_source.rs.tera")),
    ("manifest.rs", include_str!("../templates/manifest.rs.tera")),
];

/// Load all templates
pub fn load_templates() -> Result<Tera> {
    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);

    tera.register_filter("doc_comment", doc_comment_filter);
    tera.register_filter("rust_string", rust_string_filter);

    // added together so imports between templates resolve
    tera.add_raw_templates(TEMPLATES.iter().copied())
        .map_err(|e| GeneratorError::Template(format!("Failed to load templates: {:?}", e)))?;

    Ok(tera)
}

/// Render text as doc comment lines, each terminated by a newline
///
/// Lines are trimmed so indented text does not turn into doctests, and
/// opening code fences are marked as `text`. Null renders as nothing.
///
/// Args: `indent` (spaces, default 0), `prefix` (default `///`).
fn doc_comment_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let text = match value {
        Value::Null => return Ok(Value::String(String::new())),
        Value::String(s) => s.as_str(),
        _ => return Err(tera::Error::msg("doc_comment filter expects a string")),
    };
    let indent = args.get("indent").and_then(Value::as_u64).unwrap_or(0) as usize;
    let prefix = args.get("prefix").and_then(Value::as_str).unwrap_or("///");

    Ok(Value::String(doc_comment(text, indent, prefix)))
}

fn doc_comment(text: &str, indent: usize, prefix: &str) -> String {
    let padding = " ".repeat(indent);
    let mut in_fence = false;
    let mut out = String::new();
    for line in text.trim().lines() {
        let mut line = line.trim().to_string();
        if line.starts_with("```") {
            if !in_fence {
                line = "```text".to_string();
            }
            in_fence = !in_fence;
        }
        out.push_str(&padding);
        out.push_str(prefix);
        if !line.is_empty() {
            out.push(' ');
            out.push_str(&line);
        }
        out.push('\n');
    }
    if in_fence {
        out.push_str(&padding);
        out.push_str(prefix);
        out.push_str(" ```\n");
    }
    out
}

/// Quote a value as a Rust string literal
fn rust_string_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("rust_string filter expects a string"))?;
    Ok(Value::String(format!("{:?}", s)))
}
