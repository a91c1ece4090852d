//! Column value resolution
//!
//! Every (row, column) pair resolves to a [`CellValue`]: the display value
//! sent to the client and a plain-text search value. The strategy for a
//! column is chosen once per request, first match wins:
//!
//! 1. Resolver override on the declaration (callback, or method name on the view)
//! 2. `get_column_<mangled display name>_data` on the view
//! 3. `get_column_<index>_data` on the view
//! 4. The default attribute-chain resolver
//!
//! Mangling replaces every run of non-word characters (and underscores) with
//! a single `_`, so `"Region: Subdivision Type"` looks up
//! `get_column_Region_Subdivision_Type_data`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::column::{get_field_definition, ColumnDefinition, RawColumn, ResolverOverride};
use crate::error::{AttributeError, DatatableError, Result};
use crate::value::{RowSource, Value};
use crate::view::DatatableView;

/// Separator between segments of a related-field path
pub const PATH_SEPARATOR: &str = "__";

static MANGLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\W_]+").unwrap());

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Replace runs of non-word characters with a single underscore.
pub fn mangle_name(name: &str) -> String {
    MANGLE_RE.replace_all(name, "_").into_owned()
}

/// Remove HTML-like tags, leaving the text between them.
pub fn strip_tags(text: &str) -> String {
    TAG_RE.replace_all(text, "").into_owned()
}

/// Method name for a column looked up by its mangled name.
pub fn named_method(name: &str) -> String {
    format!("get_column_{}_data", mangle_name(name))
}

/// Method name for a column looked up by its position.
pub fn indexed_method(index: usize) -> String {
    format!("get_column_{}_data", index)
}

/// Output of a resolver: a single value or an explicit (display, search) pair.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedValue {
    Single(Value),
    Pair(Value, Value),
}

impl From<Value> for ResolvedValue {
    fn from(value: Value) -> Self {
        ResolvedValue::Single(value)
    }
}

impl From<&str> for ResolvedValue {
    fn from(value: &str) -> Self {
        ResolvedValue::Single(value.into())
    }
}

impl From<String> for ResolvedValue {
    fn from(value: String) -> Self {
        ResolvedValue::Single(value.into())
    }
}

impl From<i64> for ResolvedValue {
    fn from(value: i64) -> Self {
        ResolvedValue::Single(value.into())
    }
}

impl ResolvedValue {
    pub fn pair(display: impl Into<Value>, search: impl Into<Value>) -> Self {
        ResolvedValue::Pair(display.into(), search.into())
    }
}

/// Stringified cell: display value and plain-text search value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellValue {
    pub display: String,
    pub search: String,
}

impl From<ResolvedValue> for CellValue {
    fn from(value: ResolvedValue) -> Self {
        match value {
            ResolvedValue::Pair(display, search) => CellValue {
                display: display.to_string(),
                search: search.to_string(),
            },
            ResolvedValue::Single(value) => {
                let display = value.to_string();
                let search = strip_tags(&display);
                CellValue { display, search }
            }
        }
    }
}

/// Arguments handed to a custom resolver.
pub struct ResolverCall<'a> {
    /// Positional values from the preload hook
    pub args: &'a [Value],
    /// Keyword values from the preload hook
    pub kwargs: &'a BTreeMap<String, Value>,
    /// What the default resolver produces for this cell, `None` if it failed
    pub default_value: Option<Value>,
    /// The raw column declaration
    pub field_data: &'a RawColumn,
    pub view: &'a dyn DatatableView,
}

type ResolverFn =
    dyn Fn(&dyn RowSource, &ResolverCall<'_>) -> std::result::Result<ResolvedValue, AttributeError>
        + Send
        + Sync;

/// A named custom column resolver.
#[derive(Clone)]
pub struct ColumnResolver {
    name: String,
    func: Arc<ResolverFn>,
}

impl ColumnResolver {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&dyn RowSource, &ResolverCall<'_>) -> std::result::Result<ResolvedValue, AttributeError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(
        &self,
        row: &dyn RowSource,
        call: &ResolverCall<'_>,
    ) -> std::result::Result<ResolvedValue, AttributeError> {
        (self.func)(row, call)
    }
}

impl fmt::Debug for ColumnResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ColumnResolver({})", self.name)
    }
}

/// Name-to-resolver table a view can delegate method lookup to.
///
/// Built once at startup and shared read-only between requests.
#[derive(Debug, Clone, Default)]
pub struct MethodTable {
    methods: BTreeMap<String, ColumnResolver>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolver under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: &str, func: F) -> &mut Self
    where
        F: Fn(&dyn RowSource, &ResolverCall<'_>) -> std::result::Result<ResolvedValue, AttributeError>
            + Send
            + Sync
            + 'static,
    {
        self.methods
            .insert(name.to_string(), ColumnResolver::new(name, func));
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<ColumnResolver> {
        self.methods.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<ColumnResolver> {
        self.methods.get(name).cloned()
    }
}

/// Output of the view's preload hook, computed once per row.
#[derive(Debug, Clone)]
pub enum Preload {
    /// Supplied as keyword arguments
    Kwargs(BTreeMap<String, Value>),
    /// Supplied as positional arguments
    Args(Vec<Value>),
    /// Wrapped as a single positional argument
    Single(Value),
}

impl Default for Preload {
    fn default() -> Self {
        Preload::Args(Vec::new())
    }
}

impl Preload {
    pub fn into_parts(self) -> Preloaded {
        match self {
            Preload::Kwargs(kwargs) => Preloaded {
                args: Vec::new(),
                kwargs,
            },
            Preload::Args(args) => Preloaded {
                args,
                kwargs: BTreeMap::new(),
            },
            Preload::Single(value) => Preloaded {
                args: vec![value],
                kwargs: BTreeMap::new(),
            },
        }
    }
}

/// Preload hook output split into resolver arguments.
#[derive(Debug, Clone, Default)]
pub struct Preloaded {
    pub args: Vec<Value>,
    pub kwargs: BTreeMap<String, Value>,
}

/// Strategy chosen for one column.
#[derive(Debug, Clone)]
pub enum Resolution {
    Custom(ColumnResolver),
    Default,
}

impl Resolution {
    pub fn is_custom(&self) -> bool {
        matches!(self, Resolution::Custom(_))
    }
}

/// Choose how column `index` is resolved on `view`.
///
/// # Errors
/// `UnknownResolver` when the declaration names a method the view lacks.
pub fn select_resolver(
    index: usize,
    column: &ColumnDefinition,
    view: &dyn DatatableView,
) -> Result<Resolution> {
    match column.resolver() {
        Some(ResolverOverride::Callback(resolver)) => {
            return Ok(Resolution::Custom(resolver.clone()))
        }
        Some(ResolverOverride::Method(name)) => {
            return match view.resolver_method(name) {
                Some(resolver) => Ok(Resolution::Custom(resolver)),
                None => {
                    tracing::warn!(column = index, method = %name, "Unknown resolver method");
                    Err(DatatableError::UnknownResolver { name: name.clone() })
                }
            };
        }
        None => {}
    }

    if let Some(resolver) = view.resolver_method(&named_method(column.lookup_name())) {
        return Ok(Resolution::Custom(resolver));
    }

    if let Some(resolver) = view.resolver_method(&indexed_method(index)) {
        return Ok(Resolution::Custom(resolver));
    }

    Ok(Resolution::Default)
}

/// Resolve `column` by walking each source field path across `row`.
///
/// A single non-null value is used as is; several are joined with a space.
/// Display and search values are identical.
///
/// # Errors
/// Only failures raised by invoked callables propagate. Missing attributes
/// and missing related objects resolve to null.
pub fn resolve_default(
    row: &dyn RowSource,
    column: &ColumnDefinition,
) -> std::result::Result<ResolvedValue, AttributeError> {
    let mut values = Vec::new();
    for field in column.fields() {
        let value = match chain_lookup(row, field)? {
            Value::Record(record) => Value::Text(record.display()),
            other => other,
        };
        if !value.is_null() {
            values.push(value);
        }
    }

    let value = if values.len() == 1 {
        values.remove(0)
    } else {
        Value::Text(
            values
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(" "),
        )
    };
    Ok(ResolvedValue::Pair(value.clone(), value))
}

/// Fold `path` over `row`, one attribute per segment.
fn chain_lookup(row: &dyn RowSource, path: &str) -> std::result::Result<Value, AttributeError> {
    let mut bits = path
        .split(PATH_SEPARATOR)
        .flat_map(|segment| segment.split('.'));

    let Some(first) = bits.next() else {
        return Ok(Value::Null);
    };
    let mut value = lookup_step(row, first)?;
    for bit in bits {
        value = match value {
            Value::Record(related) => lookup_step(related.as_ref(), bit)?,
            _ => Value::Null,
        };
    }
    Ok(value)
}

fn lookup_step(obj: &dyn RowSource, bit: &str) -> std::result::Result<Value, AttributeError> {
    match obj.attribute(bit) {
        Ok(Value::Callable(callable)) if callable.is_invocable() => callable.call(),
        Ok(value) => Ok(value),
        Err(e) if e.is_absorbable() => Ok(Value::Null),
        Err(e) => Err(e),
    }
}

/// A normalized column with its chosen resolution strategy.
#[derive(Debug, Clone)]
pub struct RegisteredColumn {
    pub raw: RawColumn,
    pub definition: ColumnDefinition,
    pub resolution: Resolution,
}

/// Per-request resolver table, one entry per declared column.
#[derive(Debug, Clone, Default)]
pub struct ResolverRegistry {
    columns: Vec<RegisteredColumn>,
}

impl ResolverRegistry {
    /// Normalize `columns` and select a resolver for each against `view`.
    pub fn build(columns: &[RawColumn], view: &dyn DatatableView) -> Result<Self> {
        let mut registered = Vec::with_capacity(columns.len());
        for (index, raw) in columns.iter().enumerate() {
            let definition = get_field_definition(raw)?;
            let resolution = select_resolver(index, &definition, view)?;
            tracing::trace!(
                column = index,
                name = definition.lookup_name(),
                custom = resolution.is_custom(),
                "Column resolver selected"
            );
            registered.push(RegisteredColumn {
                raw: raw.clone(),
                definition,
                resolution,
            });
        }
        Ok(Self {
            columns: registered,
        })
    }

    pub fn columns(&self) -> &[RegisteredColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Resolve column `index` for `row`.
    ///
    /// `preload` is the row's preload hook output, computed once per row by
    /// the caller.
    ///
    /// # Errors
    /// `UnknownColumn` when `index` is out of range.
    pub fn resolve(
        &self,
        index: usize,
        row: &dyn RowSource,
        preload: &Preloaded,
        view: &dyn DatatableView,
    ) -> Result<CellValue> {
        let column = self
            .columns
            .get(index)
            .ok_or(DatatableError::UnknownColumn {
                index,
                count: self.columns.len(),
            })?;
        let value = match &column.resolution {
            Resolution::Custom(resolver) => {
                let default_value = match resolve_default(row, &column.definition) {
                    Ok(ResolvedValue::Pair(_, search)) | Ok(ResolvedValue::Single(search)) => {
                        Some(search)
                    }
                    Err(_) => None,
                };
                let call = ResolverCall {
                    args: &preload.args,
                    kwargs: &preload.kwargs,
                    default_value,
                    field_data: &column.raw,
                    view,
                };
                resolver.call(row, &call)?
            }
            Resolution::Default => resolve_default(row, &column.definition)?,
        };
        Ok(CellValue::from(value))
    }
}
