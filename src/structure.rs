//! Table skeleton for the initial page
//!
//! `DatatableStructure` holds no row data. It describes the columns (display
//! name plus `data-*` attributes) so that dataTables.js can bind to the
//! rendered `<table>` and fetch rows over AJAX.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use handlebars::Handlebars;
use serde::{Deserialize, Serialize};

use crate::column::ColumnDefinition;
use crate::error::{DatatableError, Result};
use crate::options::{DatatableOptions, DEFAULT_STRUCTURE_TEMPLATE};

const LEGACY_STRUCTURE_TEMPLATE: &str = r#"<table class="datatable display" data-url="{{url}}" data-result-counter-id="{{result_counter_id}}">
    <thead>
        <tr>
            {{#each column_info}}
            <th{{{attrs}}}>{{pretty_name}}</th>
            {{/each}}
        </tr>
    </thead>
    <tbody></tbody>
</table>
"#;

static DEFAULT_RENDERER: LazyLock<StructureRenderer> = LazyLock::new(StructureRenderer::new);

/// Field metadata reported by model introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    pub name: String,
    /// Human-readable label
    pub verbose_name: String,
}

/// Model introspection for the row type behind a table.
pub trait ModelMeta {
    /// Every field name on the model, relations included.
    fn field_names(&self) -> Vec<String>;

    fn field(&self, name: &str) -> Option<FieldMeta>;
}

/// Static model description, e.g. loaded next to the table options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelSchema {
    pub fields: Vec<FieldMeta>,
}

impl ModelSchema {
    pub fn with_field(mut self, name: &str, verbose_name: &str) -> Self {
        self.fields.push(FieldMeta {
            name: name.to_string(),
            verbose_name: verbose_name.to_string(),
        });
        self
    }
}

impl ModelMeta for ModelSchema {
    fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    fn field(&self, name: &str) -> Option<FieldMeta> {
        self.fields.iter().find(|f| f.name == name).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("asc"),
            SortDirection::Desc => f.write_str("desc"),
        }
    }
}

/// Active sort of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnOrdering {
    /// Position within the ordering option
    pub order: usize,
    pub column_index: usize,
    pub direction: SortDirection,
}

/// Render attributes of one column header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnAttributes {
    pub sortable: bool,
    pub visible: bool,
    pub ordering: Option<ColumnOrdering>,
}

impl ColumnAttributes {
    /// Attribute name/value pairs, sorted by name.
    pub fn to_attrs(&self) -> Vec<(&'static str, String)> {
        let mut attrs = vec![("data-sortable", self.sortable.to_string())];
        if let Some(ordering) = &self.ordering {
            attrs.push((
                "data-sorting",
                format!(
                    "{},{},{}",
                    ordering.order, ordering.column_index, ordering.direction
                ),
            ));
        }
        attrs.push(("data-visible", self.visible.to_string()));
        attrs
    }

    /// Flatten to an HTML attribute string with a leading space per attribute.
    pub fn flatatt(&self) -> String {
        self.to_attrs()
            .into_iter()
            .map(|(name, value)| format!(" {}=\"{}\"", name, handlebars::html_escape(&value)))
            .collect()
    }
}

/// Display name and flattened attributes of one column header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub pretty_name: String,
    pub attrs: String,
}

/// Handlebars registry for skeleton templates.
///
/// The legacy skeleton is registered under
/// `datatableview/legacy_structure.html`.
pub struct StructureRenderer {
    handlebars: Handlebars<'static>,
}

impl Default for StructureRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl StructureRenderer {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars
            .register_template_string(DEFAULT_STRUCTURE_TEMPLATE, LEGACY_STRUCTURE_TEMPLATE)
            .expect("built-in structure template is valid");
        Self { handlebars }
    }

    /// Register (or replace) a skeleton template.
    pub fn register_template(&mut self, name: &str, source: &str) -> Result<()> {
        self.handlebars.register_template_string(name, source)?;
        Ok(())
    }

    pub fn render(&self, structure: &DatatableStructure) -> Result<String> {
        let mut context = match serde_json::to_value(&structure.options)? {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        context.insert("url".into(), serde_json::Value::String(structure.url.clone()));
        context.insert(
            "column_info".into(),
            serde_json::to_value(structure.get_column_info())?,
        );

        Ok(self
            .handlebars
            .render(&structure.options.structure_template, &context)?)
    }
}

/// Skeleton descriptor embedded into the page context.
#[derive(Debug, Clone)]
pub struct DatatableStructure {
    url: String,
    options: DatatableOptions,
    columns: Vec<ColumnDefinition>,
    model_fields: Vec<FieldMeta>,
    ordering: BTreeMap<String, ColumnOrdering>,
}

impl DatatableStructure {
    /// Build the descriptor, computing the active column orderings.
    ///
    /// Ordering entries that name no column are skipped.
    ///
    /// # Errors
    /// Fails when a column declaration cannot be normalized.
    pub fn new(
        url: impl Into<String>,
        options: &DatatableOptions,
        model: Option<&dyn ModelMeta>,
    ) -> Result<Self> {
        let columns = options.definitions().map_err(DatatableError::from)?;
        let model_fields = model
            .map(|m| {
                m.field_names()
                    .into_iter()
                    .map(|name| {
                        m.field(&name).unwrap_or_else(|| FieldMeta {
                            verbose_name: name.clone(),
                            name,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut ordering = BTreeMap::new();
        for (i, name) in options.ordering.iter().enumerate() {
            let plain_name = name.trim_start_matches(['-', '+']);
            let Some(column_index) = options.get_column_index(plain_name) else {
                tracing::debug!(ordering = %name, "Ordering names no column, skipped");
                continue;
            };
            let direction = if name.starts_with('-') {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            };
            ordering.insert(
                plain_name.to_string(),
                ColumnOrdering {
                    order: i,
                    column_index,
                    direction,
                },
            );
        }

        Ok(Self {
            url: url.into(),
            options: options.clone(),
            columns,
            model_fields,
            ordering,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Active orderings keyed by sign-stripped name.
    pub fn ordering(&self) -> &BTreeMap<String, ColumnOrdering> {
        &self.ordering
    }

    /// Display name and attributes per column, in declaration order.
    pub fn get_column_info(&self) -> Vec<ColumnInfo> {
        self.columns
            .iter()
            .map(|column| {
                let (pretty_name, ordering_name) = self.column_names(column);
                ColumnInfo {
                    pretty_name,
                    attrs: self.get_column_attributes(&ordering_name).flatatt(),
                }
            })
            .collect()
    }

    /// Columns whose first source field is a model field order by that
    /// field and borrow its label when no display name was given.
    fn column_names(&self, column: &ColumnDefinition) -> (String, String) {
        let model_field = column
            .fields()
            .first()
            .and_then(|first| self.model_fields.iter().find(|f| &f.name == first));

        match (model_field, column.pretty_name()) {
            (Some(field), Some(pretty)) => (pretty.to_string(), field.name.clone()),
            (Some(field), None) => (field.verbose_name.clone(), field.name.clone()),
            (None, _) => {
                let name = column.lookup_name().to_string();
                (name.clone(), name)
            }
        }
    }

    pub fn get_column_attributes(&self, name: &str) -> ColumnAttributes {
        ColumnAttributes {
            sortable: !self.options.unsortable_columns.iter().any(|c| c == name),
            visible: !self.options.hidden_columns.iter().any(|c| c == name),
            ordering: self.ordering.get(name).copied(),
        }
    }

    /// Render with the built-in templates.
    pub fn render(&self) -> Result<String> {
        DEFAULT_RENDERER.render(self)
    }
}

impl fmt::Display for DatatableStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let html = self.render().map_err(|e| {
            tracing::warn!(error = %e, "Failed to render datatable structure");
            fmt::Error
        })?;
        f.write_str(&html)
    }
}

impl<'a> IntoIterator for &'a DatatableStructure {
    type Item = ColumnInfo;
    type IntoIter = std::vec::IntoIter<ColumnInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.get_column_info().into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::RawColumn;
    use pretty_assertions::assert_eq;

    fn options() -> DatatableOptions {
        DatatableOptions {
            columns: vec![
                RawColumn::field("id"),
                RawColumn::pair("Headline", "headline"),
                RawColumn::field("name"),
                RawColumn::pair("Virtual", crate::column::ColumnPart::Null),
            ],
            ordering: vec!["-name".into(), "missing".into(), "+Headline".into()],
            unsortable_columns: vec!["Virtual".into()],
            hidden_columns: vec!["id".into()],
            ..Default::default()
        }
    }

    fn model() -> ModelSchema {
        ModelSchema::default()
            .with_field("id", "ID")
            .with_field("headline", "headline")
            .with_field("name", "full name")
    }

    #[test]
    fn test_ordering_map() {
        let structure = DatatableStructure::new("/entries/", &options(), None).unwrap();
        assert_eq!(
            structure.ordering().get("name"),
            Some(&ColumnOrdering {
                order: 0,
                column_index: 2,
                direction: SortDirection::Desc,
            })
        );
        assert!(!structure.ordering().contains_key("missing"));
        assert_eq!(
            structure.ordering().get("Headline"),
            Some(&ColumnOrdering {
                order: 2,
                column_index: 1,
                direction: SortDirection::Asc,
            })
        );
    }

    #[test]
    fn test_column_info_with_model() {
        let model = model();
        let structure = DatatableStructure::new("/entries/", &options(), Some(&model)).unwrap();
        let info = structure.get_column_info();

        assert_eq!(info[0].pretty_name, "ID");
        assert_eq!(info[0].attrs, r#" data-sortable="true" data-visible="false""#);
        // model field used as ordering name
        assert_eq!(info[1].pretty_name, "Headline");
        assert_eq!(info[1].attrs, r#" data-sortable="true" data-visible="true""#);
        assert_eq!(info[2].pretty_name, "full name");
        assert_eq!(
            info[2].attrs,
            r#" data-sortable="true" data-sorting="0,2,desc" data-visible="true""#
        );
        assert_eq!(info[3].pretty_name, "Virtual");
        assert_eq!(info[3].attrs, r#" data-sortable="false" data-visible="true""#);
    }

    #[test]
    fn test_column_info_without_model() {
        let structure = DatatableStructure::new("/entries/", &options(), None).unwrap();
        let info: Vec<ColumnInfo> = structure.into_iter().collect();
        assert_eq!(info[0].pretty_name, "id");
        assert_eq!(
            info[1].attrs,
            r#" data-sortable="true" data-sorting="2,1,asc" data-visible="true""#
        );
    }

    #[test]
    fn test_attrs_sorted_by_name() {
        let attrs = ColumnAttributes {
            sortable: false,
            visible: true,
            ordering: Some(ColumnOrdering {
                order: 1,
                column_index: 0,
                direction: SortDirection::Asc,
            }),
        };
        let names: Vec<&str> = attrs.to_attrs().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["data-sortable", "data-sorting", "data-visible"]);
    }

    #[test]
    fn test_render_skeleton() {
        let structure = DatatableStructure::new("/entries/?x&y", &options(), None).unwrap();
        let html = structure.to_string();
        assert!(html.starts_with(
            r#"<table class="datatable display" data-url="/entries/?x&amp;y" data-result-counter-id="id_count">"#
        ));
        assert!(html.contains(
            r#"<th data-sortable="true" data-sorting="2,1,asc" data-visible="true">Headline</th>"#
        ));
        assert!(html.contains(r#"<th data-sortable="false" data-visible="true">Virtual</th>"#));
    }

    #[test]
    fn test_custom_template() {
        let mut renderer = StructureRenderer::new();
        renderer
            .register_template("compact", "{{#each column_info}}[{{pretty_name}}]{{/each}} {{page_length}}")
            .unwrap();
        let mut options = options();
        options.structure_template = "compact".into();
        let structure = DatatableStructure::new("/", &options, None).unwrap();
        assert_eq!(renderer.render(&structure).unwrap(), "[id][Headline][name][Virtual] 25");
    }

    #[test]
    fn test_unknown_template_is_an_error() {
        let mut options = options();
        options.structure_template = "missing.html".into();
        let structure = DatatableStructure::new("/", &options, None).unwrap();
        assert!(matches!(structure.render(), Err(DatatableError::Template(_))));
    }
}
