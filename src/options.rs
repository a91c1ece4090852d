//! Datatable options
//!
//! Options are configured once per view (usually from YAML) and resolved
//! against the legacy dataTables.js query parameters at request entry. The
//! resolved copy is owned by the request context and never mutated after.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::column::{get_field_definition, ColumnDefinition, RawColumn};
use crate::error::{DefinitionError, Result};

pub const DEFAULT_PAGE_LENGTH: i64 = 25;
pub const MINIMUM_PAGE_LENGTH: i64 = 5;
pub const DEFAULT_STRUCTURE_TEMPLATE: &str = "datatableview/legacy_structure.html";
pub const DEFAULT_RESULT_COUNTER_ID: &str = "id_count";

/// Query parameter names of the legacy dataTables.js protocol
pub mod params {
    pub const START_OFFSET: &str = "iDisplayStart";
    pub const PAGE_LENGTH: &str = "iDisplayLength";
    pub const SEARCH: &str = "sSearch";
    pub const NUM_SORTING_COLUMNS: &str = "iSortingCols";
    pub const SORT_COLUMN_PREFIX: &str = "iSortCol_";
    pub const SORT_DIRECTION_PREFIX: &str = "sSortDir_";
    pub const ECHO: &str = "sEcho";
}

/// Configuration for one datatable
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatatableOptions {
    /// Table headers
    pub columns: Vec<RawColumn>,
    /// Signed field names, `-` prefix for descending
    pub ordering: Vec<String>,
    /// Results to skip ahead
    pub start_offset: usize,
    /// Length of a single result page, -1 for unpaged
    pub page_length: i64,
    /// Client search string
    pub search: String,
    /// Extra paths to search; not displayed
    pub search_fields: Vec<String>,
    /// Table headers not allowed to be sorted
    pub unsortable_columns: Vec<String>,
    /// Table headers generated, but hidden by the client
    pub hidden_columns: Vec<String>,
    pub structure_template: String,
    /// HTML element ID to display the total results
    pub result_counter_id: String,
}

impl Default for DatatableOptions {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            ordering: Vec::new(),
            start_offset: 0,
            page_length: DEFAULT_PAGE_LENGTH,
            search: String::new(),
            search_fields: Vec::new(),
            unsortable_columns: Vec::new(),
            hidden_columns: Vec::new(),
            structure_template: DEFAULT_STRUCTURE_TEMPLATE.to_string(),
            result_counter_id: DEFAULT_RESULT_COUNTER_ID.to_string(),
        }
    }
}

impl DatatableOptions {
    pub fn with_columns(columns: Vec<RawColumn>) -> Self {
        Self {
            columns,
            ..Self::default()
        }
    }

    pub fn from_yaml(source: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Whether the response is limited to one page.
    pub fn is_paged(&self) -> bool {
        self.page_length != -1
    }

    /// Normalize every column declaration.
    pub fn definitions(&self) -> std::result::Result<Vec<ColumnDefinition>, DefinitionError> {
        self.columns.iter().map(get_field_definition).collect()
    }

    /// Index of the column identified by `name` (its display name or first
    /// source field). Malformed declarations never match.
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|raw| {
            get_field_definition(raw)
                .map(|column| column.answers_to(name))
                .unwrap_or(false)
        })
    }

    /// Apply the legacy query parameters to a copy of these options.
    ///
    /// Unparseable or out-of-range parameters are ignored.
    ///
    /// # Errors
    /// Fails when a column declaration cannot be normalized.
    pub fn resolve(&self, query: &BTreeMap<String, String>) -> Result<Self> {
        let definitions = self.definitions()?;
        let mut options = self.clone();

        if let Some(raw) = query.get(params::START_OFFSET) {
            options.start_offset = raw.trim().parse::<i64>().unwrap_or(0).max(0) as usize;
        }

        if let Some(raw) = query.get(params::PAGE_LENGTH) {
            options.page_length = match raw.trim().parse::<i64>() {
                Ok(-1) => -1,
                Ok(n) if n < MINIMUM_PAGE_LENGTH => MINIMUM_PAGE_LENGTH,
                Ok(n) => n,
                Err(_) => DEFAULT_PAGE_LENGTH,
            };
        }

        if let Some(raw) = query.get(params::SEARCH) {
            options.search = raw.trim().to_string();
        }

        let ordering = self.requested_ordering(query, &definitions);
        if !ordering.is_empty() {
            tracing::trace!(?ordering, "Request ordering replaces configured ordering");
            options.ordering = ordering;
        }

        Ok(options)
    }

    fn requested_ordering(
        &self,
        query: &BTreeMap<String, String>,
        definitions: &[ColumnDefinition],
    ) -> Vec<String> {
        let num_sorting_columns = query
            .get(params::NUM_SORTING_COLUMNS)
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .unwrap_or(0);

        let mut ordering = Vec::new();
        for i in 0..num_sorting_columns {
            let Some(column) = query
                .get(&format!("{}{}", params::SORT_COLUMN_PREFIX, i))
                .and_then(|raw| raw.trim().parse::<usize>().ok())
                .and_then(|index| definitions.get(index))
            else {
                continue;
            };

            if self
                .unsortable_columns
                .iter()
                .any(|name| column.answers_to(name))
            {
                continue;
            }

            let name = match column.fields().first() {
                Some(field) => field.as_str(),
                None => column.lookup_name(),
            };
            let descending = query
                .get(&format!("{}{}", params::SORT_DIRECTION_PREFIX, i))
                .is_some_and(|dir| dir.trim() == "desc");

            ordering.push(if descending {
                format!("-{}", name)
            } else {
                name.to_string()
            });
        }
        ordering
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn query(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn sample_options() -> DatatableOptions {
        DatatableOptions::from_yaml(
            r#"
columns:
  - id
  - ["Headline", "headline"]
  - ["Author", ["author__first", "author__last"]]
  - ["Virtual", null, "get_virtual_data"]
ordering: ["-id"]
unsortable_columns: ["Author"]
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let options = DatatableOptions::default();
        assert_eq!(options.page_length, 25);
        assert_eq!(options.start_offset, 0);
        assert_eq!(options.structure_template, "datatableview/legacy_structure.html");
        assert_eq!(options.result_counter_id, "id_count");
        assert!(options.is_paged());
    }

    #[test]
    fn test_json_options_match_yaml() {
        let options = DatatableOptions::from_json(
            r#"{"columns": ["id", ["Headline", "headline"]], "page_length": -1}"#,
        )
        .unwrap();
        assert_eq!(options.get_column_index("Headline"), Some(1));
        assert!(!options.is_paged());
        assert_eq!(options.result_counter_id, "id_count");
    }

    #[test]
    fn test_get_column_index() {
        let options = sample_options();
        assert_eq!(options.get_column_index("id"), Some(0));
        assert_eq!(options.get_column_index("headline"), Some(1));
        assert_eq!(options.get_column_index("Headline"), Some(1));
        assert_eq!(options.get_column_index("author__first"), Some(2));
        assert_eq!(options.get_column_index("Virtual"), Some(3));
        assert_eq!(options.get_column_index("missing"), None);
    }

    #[test]
    fn test_resolve_paging_and_search() {
        let options = sample_options();
        let resolved = options
            .resolve(&query(&[
                ("iDisplayStart", "50"),
                ("iDisplayLength", "10"),
                ("sSearch", "  term "),
            ]))
            .unwrap();
        assert_eq!(resolved.start_offset, 50);
        assert_eq!(resolved.page_length, 10);
        assert_eq!(resolved.search, "term");
        assert_eq!(resolved.ordering, vec!["-id".to_string()]);
    }

    #[test]
    fn test_resolve_page_length_edge_cases() {
        let options = sample_options();
        let unpaged = options.resolve(&query(&[("iDisplayLength", "-1")])).unwrap();
        assert!(!unpaged.is_paged());

        let tiny = options.resolve(&query(&[("iDisplayLength", "2")])).unwrap();
        assert_eq!(tiny.page_length, MINIMUM_PAGE_LENGTH);

        let junk = options
            .resolve(&query(&[("iDisplayLength", "lots"), ("iDisplayStart", "-3")]))
            .unwrap();
        assert_eq!(junk.page_length, DEFAULT_PAGE_LENGTH);
        assert_eq!(junk.start_offset, 0);
    }

    #[test]
    fn test_resolve_sorting() {
        let options = sample_options();
        let resolved = options
            .resolve(&query(&[
                ("iSortingCols", "4"),
                ("iSortCol_0", "1"),
                ("sSortDir_0", "desc"),
                ("iSortCol_1", "2"),
                ("sSortDir_1", "asc"),
                ("iSortCol_2", "3"),
                ("sSortDir_2", "asc"),
                ("iSortCol_3", "99"),
            ]))
            .unwrap();
        // Author is unsortable and index 99 is out of range
        assert_eq!(
            resolved.ordering,
            vec!["-headline".to_string(), "Virtual".to_string()]
        );
    }

    #[test]
    fn test_resolve_rejects_bad_columns() {
        let options = DatatableOptions::from_yaml("columns: [[a, b, c, d]]").unwrap();
        assert!(options.resolve(&BTreeMap::new()).is_err());
    }
}
