//! pairsync core library — domain types, template contract, record store,
//! merge, errors.
//!
//! - [`types`] — rows, documents, identities, queries
//! - [`template`] — the [`PairTemplate`] contract
//! - [`store`] — the [`RecordStore`] contract plus memory and JSON-file backends
//! - [`merge`] — verbose deep merge producing [`MergeDiff`]s
//! - [`error`] — [`StoreError`], [`TemplateError`]

pub mod error;
pub mod merge;
pub mod store;
pub mod template;
pub mod types;

pub use error::{StoreError, TemplateError};
pub use merge::{merge_with_verbose, MergeDiff};
pub use store::{connect, JsonFileStore, MemoryStore, RecordStore};
pub use template::PairTemplate;
pub use types::{Document, Query, RecordId, Role, Row};
