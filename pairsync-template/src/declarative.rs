//! YAML-declared pair template.
//!
//! ```yaml
//! viewer_path: "/race/{{ row.Race | slugify }}"
//! recorder_path: "/race/{{ row.Race | slugify }}/recorder"
//! viewer:
//!   subject: "{{ row.Race }}"
//!   path: "{{ viewer_path }}"
//! recorder:
//!   subject: "{{ row.Race }} candidate recorder"
//!   path: "{{ recorder_path }}"
//! recorder_overrides:
//!   bp.viewer: "{{ viewer._id }}"
//! row_updates:
//!   Viewer: "https://example.org{{ viewer.path }}"
//!   Recorder: "https://example.org{{ recorder.path }}"
//! changed_column: Changed
//! ```

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use pairsync_core::{Document, PairTemplate, Row, TemplateError};

use crate::context::RowContext;
use crate::engine::{EngineBuilder, TemplateEngine};
use crate::error::RenderError;

/// Text written to `changed_column` when a row update altered a cell.
pub const CHANGED_MARK: &str = "changed";

/// Raw shape of a template file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateFile {
    pub viewer_path: String,
    pub recorder_path: String,
    pub viewer: Document,
    pub recorder: Document,
    /// Dotted field path → expression, applied just before a viewer is saved.
    #[serde(default)]
    pub viewer_overrides: IndexMap<String, String>,
    /// Dotted field path → expression, applied just before a recorder is
    /// saved. `viewer` is in scope.
    #[serde(default)]
    pub recorder_overrides: IndexMap<String, String>,
    /// Column → expression, written onto the row once the pair is resolved.
    #[serde(default)]
    pub row_updates: IndexMap<String, String>,
    /// Column flagged with [`CHANGED_MARK`] when a row update replaced a
    /// non-empty cell with a different value.
    #[serde(default)]
    pub changed_column: Option<String>,
}

/// [`PairTemplate`] driven by a [`TemplateFile`].
#[derive(Debug)]
pub struct DeclarativeTemplate {
    file: TemplateFile,
    engine: TemplateEngine,
    /// Rows enriched so far.
    sequence: usize,
    /// Rows per viewer path, filled by `setup`.
    occurrences: HashMap<String, usize>,
}

impl DeclarativeTemplate {
    /// Load and compile the template at `path`.
    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let contents = std::fs::read_to_string(path).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: TemplateFile =
            serde_yaml::from_str(&contents).map_err(|source| RenderError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!("loaded pair template {}", path.display());
        Self::from_file(file)
    }

    /// Compile an already-parsed template.
    pub fn from_file(file: TemplateFile) -> Result<Self, RenderError> {
        let mut builder = EngineBuilder::new()
            .expression("viewer_path", &file.viewer_path)
            .expression("recorder_path", &file.recorder_path)
            .body("viewer", &file.viewer)
            .body("recorder", &file.recorder);
        for (field, source) in &file.viewer_overrides {
            builder = builder.expression(&override_name("viewer", field), source);
        }
        for (field, source) in &file.recorder_overrides {
            builder = builder.expression(&override_name("recorder", field), source);
        }
        for (column, source) in &file.row_updates {
            builder = builder.expression(&row_update_name(column), source);
        }
        Ok(Self {
            engine: builder.build()?,
            file,
            sequence: 0,
            occurrences: HashMap::new(),
        })
    }

    /// Number of rows enriched so far in this run.
    pub fn sequence(&self) -> usize {
        self.sequence
    }

    fn context<'a>(&self, row: &'a Row) -> RowContext<'a> {
        RowContext::new(row, self.sequence)
    }

    /// Context with both paths resolved.
    fn path_context<'a>(&self, row: &'a Row) -> Result<RowContext<'a>, RenderError> {
        let mut ctx = self.context(row);
        let viewer_path = self.render_path("viewer_path", &ctx)?;
        ctx.recorder_path = Some(self.render_path("recorder_path", &ctx)?);
        ctx.occurrences = self.occurrences.get(&viewer_path).copied().unwrap_or(0);
        ctx.viewer_path = Some(viewer_path);
        Ok(ctx)
    }

    fn render_path(&self, name: &str, ctx: &RowContext<'_>) -> Result<String, RenderError> {
        let rendered = self.engine.render(name, &ctx.to_tera_context()?)?;
        Ok(rendered.trim().to_string())
    }

    fn apply_overrides(
        &self,
        role: &str,
        overrides: &IndexMap<String, String>,
        target: &mut Document,
        ctx: &RowContext<'_>,
    ) -> Result<(), RenderError> {
        if overrides.is_empty() {
            return Ok(());
        }
        let tera_ctx = ctx.to_tera_context()?;
        for field in overrides.keys() {
            let value = self.engine.render(&override_name(role, field), &tera_ctx)?;
            set_dotted(target, field, Value::String(value))?;
        }
        Ok(())
    }
}

impl PairTemplate for DeclarativeTemplate {
    fn viewer_path(&self, row: &Row) -> Result<String, TemplateError> {
        Ok(self.render_path("viewer_path", &self.context(row))?)
    }

    fn recorder_path(&self, row: &Row) -> Result<String, TemplateError> {
        Ok(self.render_path("recorder_path", &self.context(row))?)
    }

    fn viewer(&self, row: &Row) -> Result<Document, TemplateError> {
        let ctx = self.path_context(row)?;
        Ok(self
            .engine
            .render_body("viewer", &self.file.viewer, &ctx.to_tera_context()?)?)
    }

    fn recorder(&self, row: &Row) -> Result<Document, TemplateError> {
        let ctx = self.path_context(row)?;
        Ok(self
            .engine
            .render_body("recorder", &self.file.recorder, &ctx.to_tera_context()?)?)
    }

    fn overwrite_viewer_info(&self, viewer: &mut Document, row: &Row) -> Result<(), TemplateError> {
        let ctx = self.path_context(row)?;
        Ok(self.apply_overrides("viewer", &self.file.viewer_overrides, viewer, &ctx)?)
    }

    fn overwrite_recorder_info(
        &self,
        recorder: &mut Document,
        viewer: &Document,
        row: &Row,
    ) -> Result<(), TemplateError> {
        let mut ctx = self.path_context(row)?;
        ctx.viewer = Some(viewer);
        Ok(self.apply_overrides("recorder", &self.file.recorder_overrides, recorder, &ctx)?)
    }

    fn update_properties(
        &mut self,
        row: &mut Row,
        viewer: &Document,
        recorder: &Document,
    ) -> Result<(), TemplateError> {
        let updates = {
            let mut ctx = self.path_context(row)?;
            ctx.viewer = Some(viewer);
            ctx.recorder = Some(recorder);
            let tera_ctx = ctx.to_tera_context().map_err(TemplateError::from)?;
            self.file
                .row_updates
                .keys()
                .map(|column| {
                    self.engine
                        .render(&row_update_name(column), &tera_ctx)
                        .map(|value| (column.clone(), value))
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        let mut changed = false;
        for (column, value) in updates {
            match row.set(column, value.clone()) {
                Some(old) if !old.is_empty() && old != value => changed = true,
                _ => {}
            }
        }
        if let Some(column) = &self.file.changed_column {
            row.set(column.clone(), if changed { CHANGED_MARK } else { "" });
        }
        self.sequence += 1;
        Ok(())
    }

    fn setup(&mut self, rows: &[Row]) -> Result<(), TemplateError> {
        self.sequence = 0;
        self.occurrences.clear();
        for (index, row) in rows.iter().enumerate() {
            match self.viewer_path(row) {
                Ok(path) => *self.occurrences.entry(path).or_default() += 1,
                Err(err) => tracing::debug!("row {index}: viewer path not countable: {err}"),
            }
        }
        Ok(())
    }
}

fn override_name(role: &str, field: &str) -> String {
    format!("{role}_overrides/{field}")
}

fn row_update_name(column: &str) -> String {
    format!("row_updates/{column}")
}

/// Set `a.b.c` inside `target`, creating intermediate objects.
fn set_dotted(target: &mut Document, field: &str, value: Value) -> Result<(), RenderError> {
    let mut parts = field.split('.').peekable();
    let mut current = target;
    let mut walked = String::new();
    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            current.insert(part.to_string(), value);
            return Ok(());
        }
        if !walked.is_empty() {
            walked.push('.');
        }
        walked.push_str(part);
        let slot = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Document::new()));
        current = match slot {
            Value::Object(map) => map,
            _ => {
                return Err(RenderError::Shape {
                    field: field.to_string(),
                    blocked_by: walked,
                })
            }
        };
    }
    Ok(())
}
