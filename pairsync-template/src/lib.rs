//! # pairsync-template
//!
//! Tera-based [`PairTemplate`](pairsync_core::PairTemplate) declared in a
//! YAML file, for callers that do not want to write the mapping in Rust.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use pairsync_core::{PairTemplate, Row};
//! use pairsync_template::DeclarativeTemplate;
//!
//! fn show_paths(row: &Row) {
//!     if let Ok(template) = DeclarativeTemplate::load(Path::new("race-pair.yaml")) {
//!         if let Ok(path) = template.viewer_path(row) {
//!             println!("viewer at {path}");
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod declarative;
pub mod engine;
pub mod error;

pub use context::RowContext;
pub use declarative::{DeclarativeTemplate, TemplateFile, CHANGED_MARK};
pub use engine::{EngineBuilder, TemplateEngine};
pub use error::RenderError;
