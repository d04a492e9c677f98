//! Tera engine holding every expression of one template file.
//!
//! # Expression naming
//!
//! | Source                    | Registered name                 |
//! |---------------------------|---------------------------------|
//! | scalar expression `key`   | `key`                           |
//! | body string leaf          | `<body>/<dotted.path>`          |
//! | array element in a body   | `<body>/<dotted.path>[i]`       |
//!
//! Names are derived again at render time by walking the same body, so
//! nothing but the compiled [`Tera`] instance needs to be kept.

use serde_json::Value;
use tera::Tera;

use pairsync_core::Document;

use crate::error::RenderError;

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects raw expressions, then compiles them in one pass.
#[derive(Debug, Default)]
pub struct EngineBuilder {
    templates: Vec<(String, String)>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single named expression.
    pub fn expression(mut self, name: &str, source: &str) -> Self {
        self.templates.push((name.to_string(), source.to_string()));
        self
    }

    /// Register every string leaf of `body` under `prefix`.
    pub fn body(mut self, prefix: &str, body: &Document) -> Self {
        for (key, value) in body {
            collect_leaves(&leaf_name(prefix, key), value, &mut self.templates);
        }
        self
    }

    pub fn build(self) -> Result<TemplateEngine, RenderError> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        for (name, source) in self.templates {
            tera.add_raw_template(&name, &source)
                .map_err(|e| RenderError::tera(&name, e))?;
        }
        Ok(TemplateEngine { tera })
    }
}

fn leaf_name(parent: &str, key: &str) -> String {
    if parent.contains('/') {
        format!("{parent}.{key}")
    } else {
        format!("{parent}/{key}")
    }
}

fn collect_leaves(name: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::String(source) => out.push((name.to_string(), source.clone())),
        Value::Object(map) => {
            for (key, child) in map {
                collect_leaves(&leaf_name(name, key), child, out);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                collect_leaves(&format!("{name}[{i}]"), child, out);
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Compiled expressions of one pair template.
#[derive(Debug)]
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Render the expression registered as `name`.
    pub fn render(&self, name: &str, ctx: &tera::Context) -> Result<String, RenderError> {
        self.tera
            .render(name, ctx)
            .map_err(|e| RenderError::tera(name, e))
    }

    /// Render every string leaf of `body` (registered under `prefix`).
    /// Non-string leaves are copied through unchanged.
    pub fn render_body(
        &self,
        prefix: &str,
        body: &Document,
        ctx: &tera::Context,
    ) -> Result<Document, RenderError> {
        let mut out = Document::new();
        for (key, value) in body {
            let rendered = self.render_value(&leaf_name(prefix, key), value, ctx)?;
            out.insert(key.clone(), rendered);
        }
        Ok(out)
    }

    fn render_value(
        &self,
        name: &str,
        value: &Value,
        ctx: &tera::Context,
    ) -> Result<Value, RenderError> {
        Ok(match value {
            Value::String(_) => Value::String(self.render(name, ctx)?),
            Value::Object(map) => {
                let mut out = Document::new();
                for (key, child) in map {
                    out.insert(key.clone(), self.render_value(&leaf_name(name, key), child, ctx)?);
                }
                Value::Object(out)
            }
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, child)| self.render_value(&format!("{name}[{i}]"), child, ctx))
                    .collect::<Result<_, _>>()?,
            ),
            other => other.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
