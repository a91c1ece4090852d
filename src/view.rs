//! Datatable view and per-request driver
//!
//! A [`DatatableView`] supplies configuration, the record collection, custom
//! column resolvers and the preload hook. [`LegacyDatatable`] is the
//! per-request context: it resolves options and selects resolvers once at
//! construction, then serves either the AJAX payload or the page context
//! carrying the table skeleton.
//!
//! # Example
//!
//! ```
//! use datatable_view::{
//!     DatatableOptions, DatatableRequest, DatatableSettings, DatatableView, LegacyDatatable,
//!     RawColumn, Record, RecordCollection, Result, RowSource,
//! };
//! use std::sync::Arc;
//!
//! struct Entries;
//!
//! impl DatatableView for Entries {
//!     fn get_datatable_options(&self) -> DatatableOptions {
//!         DatatableOptions::with_columns(vec![RawColumn::pair("Headline", "headline")])
//!     }
//!
//!     fn get_object_list(&self, _options: &DatatableOptions) -> Result<RecordCollection> {
//!         let row = Record::new(1).with("headline", "Hello");
//!         Ok(RecordCollection::from_records(vec![Arc::new(row) as Arc<dyn RowSource>]))
//!     }
//! }
//!
//! let request = DatatableRequest::new("/entries/").with_query_string("ajax=true&sEcho=1");
//! let datatable = LegacyDatatable::new(&Entries, &request, DatatableSettings::default()).unwrap();
//! let body = datatable.get_ajax().unwrap();
//! assert_eq!(
//!     body,
//!     r#"{"sEcho":"1","iTotalRecords":1,"iTotalDisplayRecords":1,"aaData":[{"DT_RowId":1,"0":"Hello"}]}"#
//! );
//! ```

use crate::collection::RecordCollection;
use crate::config::DatatableSettings;
use crate::error::Result;
use crate::options::DatatableOptions;
use crate::request::DatatableRequest;
use crate::resolver::{CellValue, ColumnResolver, Preload, ResolverRegistry};
use crate::response::{ResponsePayload, RowRecord};
use crate::structure::{DatatableStructure, ModelMeta};
use crate::value::RowSource;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const DEFAULT_CONTEXT_NAME: &str = "datatable";

/// A view exposing a datatable.
///
/// Custom column data comes from [`DatatableView::resolver_method`], looked up
/// as `get_column_<name>_data` or `get_column_<index>_data` (see
/// [`crate::resolver`]).
pub trait DatatableView {
    /// Configured options, called once per request.
    fn get_datatable_options(&self) -> DatatableOptions;

    /// Rows already searched and ordered per `options`, with their counts.
    fn get_object_list(&self, options: &DatatableOptions) -> Result<RecordCollection>;

    /// Resolver registered on the view under `name`.
    fn resolver_method(&self, _name: &str) -> Option<ColumnResolver> {
        None
    }

    /// Computed once per row before any column is resolved; the result is
    /// passed to every custom resolver of that row.
    fn preload_record_data(&self, _row: &dyn RowSource) -> Preload {
        Preload::default()
    }

    fn model(&self) -> Option<&dyn ModelMeta> {
        None
    }

    /// Page context key for the skeleton.
    fn datatable_context_name(&self) -> &str {
        DEFAULT_CONTEXT_NAME
    }
}

/// What a request produces.
#[derive(Debug)]
pub enum DatatableResponse {
    Json {
        body: String,
        content_type: &'static str,
    },
    Page {
        context_name: String,
        structure: DatatableStructure,
    },
}

/// Per-request datatable context.
pub struct LegacyDatatable<'a> {
    view: &'a dyn DatatableView,
    request: &'a DatatableRequest,
    settings: DatatableSettings,
    options: DatatableOptions,
    registry: ResolverRegistry,
}

impl<'a> LegacyDatatable<'a> {
    /// Resolve the view's options against the request and select a resolver
    /// for every column.
    ///
    /// # Errors
    /// Malformed column declarations and unknown resolver method names.
    pub fn new(
        view: &'a dyn DatatableView,
        request: &'a DatatableRequest,
        settings: DatatableSettings,
    ) -> Result<Self> {
        let options = view.get_datatable_options().resolve(&request.query)?;
        let registry = ResolverRegistry::build(&options.columns, view)?;
        Ok(Self {
            view,
            request,
            settings,
            options,
            registry,
        })
    }

    pub fn options(&self) -> &DatatableOptions {
        &self.options
    }

    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    /// AJAX requests get the JSON payload, everything else the page context.
    pub fn get(&self) -> Result<DatatableResponse> {
        if self.request.is_ajax() {
            return Ok(DatatableResponse::Json {
                body: self.get_ajax()?,
                content_type: JSON_CONTENT_TYPE,
            });
        }
        Ok(DatatableResponse::Page {
            context_name: self.view.datatable_context_name().to_string(),
            structure: self.get_datatable()?,
        })
    }

    /// Serialized AJAX payload.
    pub fn get_ajax(&self) -> Result<String> {
        let object_list = self.get_object_list()?;
        let response = self.get_json_response_object(&object_list)?;
        self.serialize_to_json(&response)
    }

    pub fn get_object_list(&self) -> Result<RecordCollection> {
        self.view.get_object_list(&self.options)
    }

    /// Payload for `object_list`; counts are taken from the collection as is.
    pub fn get_json_response_object(
        &self,
        object_list: &RecordCollection,
    ) -> Result<ResponsePayload> {
        let page = self.paginate_object_list(object_list);
        let rows = page
            .iter()
            .map(|row| self.get_record_data(row.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            total = object_list.total_initial_record_count(),
            filtered = object_list.unpaged_record_count(),
            rows = rows.len(),
            start_offset = self.options.start_offset,
            page_length = self.options.page_length,
            "Assembled datatable payload"
        );

        Ok(ResponsePayload {
            echo: self.request.echo().map(str::to_string),
            total_record_count: object_list.total_initial_record_count(),
            filtered_record_count: object_list.unpaged_record_count(),
            rows,
        })
    }

    pub fn paginate_object_list<'c>(
        &self,
        object_list: &'c RecordCollection,
    ) -> &'c [std::sync::Arc<dyn RowSource>] {
        object_list.paginate(&self.options)
    }

    pub fn serialize_to_json(&self, response: &ResponsePayload) -> Result<String> {
        response.to_json(self.settings.debug)
    }

    /// Display values of every column for `row`, keyed by column index.
    pub fn get_record_data(&self, row: &dyn RowSource) -> Result<RowRecord> {
        let cells = self
            .get_row_cells(row)?
            .into_iter()
            .map(|cell| cell.display)
            .collect();
        Ok(RowRecord {
            row_id: row.pk(),
            cells,
        })
    }

    /// Display and search values of every column for `row`.
    pub fn get_row_cells(&self, row: &dyn RowSource) -> Result<Vec<CellValue>> {
        let preload = self.view.preload_record_data(row).into_parts();
        (0..self.registry.len())
            .map(|i| self.registry.resolve(i, row, &preload, self.view))
            .collect()
    }

    /// Display and search values of column `index` for `row`.
    ///
    /// Runs the preload hook for this cell alone; prefer
    /// [`LegacyDatatable::get_row_cells`] for whole rows.
    pub fn get_column_data(&self, index: usize, row: &dyn RowSource) -> Result<CellValue> {
        let preload = self.view.preload_record_data(row).into_parts();
        self.registry.resolve(index, row, &preload, self.view)
    }

    /// Skeleton descriptor for the page.
    pub fn get_datatable(&self) -> Result<DatatableStructure> {
        DatatableStructure::new(&self.request.path, &self.options, self.view.model())
    }

    /// Page context with the rendered skeleton under the view's context name.
    pub fn get_context_data(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        let mut context = serde_json::Map::new();
        context.insert(
            self.view.datatable_context_name().to_string(),
            serde_json::Value::String(self.get_datatable()?.render()?),
        );
        Ok(context)
    }
}
