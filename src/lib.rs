//! Datatable View - server-side adapter for the legacy dataTables.js protocol.
//!
//! This crate turns an already filtered and ordered record collection into
//! the AJAX payload a dataTables.js grid expects, and renders the HTML
//! skeleton the grid binds to on first page load.
//!
//! - `column` - Column declarations and their normalized form
//! - `resolver` - Per-column resolver selection and the default attribute-chain resolver
//! - `collection` - Record collections and pagination
//! - `response` - Legacy wire payload (`sEcho`, `iTotalRecords`, `aaData`, ...)
//! - `structure` - Table skeleton descriptor and its templates
//! - `view` - The view trait and the per-request driver
//!
//! # Architecture
//!
//! ```text
//! DatatableView ──options──> LegacyDatatable::new (once per request)
//!                               ├── DatatableOptions::resolve (query params)
//!                               └── ResolverRegistry (resolver per column)
//!
//! AJAX:  RecordCollection -> paginate -> row assembly -> ResponsePayload -> JSON
//! Page:  DatatableStructure -> handlebars skeleton
//! ```

mod collection;
pub mod column;
mod config;
mod error;
pub mod options;
mod request;
pub mod resolver;
mod response;
pub mod structure;
mod value;
mod view;

// Re-exports
pub use collection::{paginate, RecordCollection};
pub use column::{get_field_definition, ColumnDefinition, ColumnPart, RawColumn, ResolverOverride};
pub use config::DatatableSettings;
pub use error::{AttributeError, DatatableError, DefinitionError, Result};
pub use options::DatatableOptions;
pub use request::DatatableRequest;
pub use resolver::{
    CellValue, ColumnResolver, MethodTable, Preload, ResolvedValue, ResolverCall,
    ResolverRegistry,
};
pub use response::{ResponsePayload, RowRecord};
pub use structure::{
    ColumnAttributes, ColumnInfo, ColumnOrdering, DatatableStructure, FieldMeta, ModelMeta,
    ModelSchema, SortDirection, StructureRenderer,
};
pub use value::{Callable, Record, RowSource, Value};
pub use view::{DatatableResponse, DatatableView, LegacyDatatable};
