//! Column declarations and their normalized form
//!
//! A column is declared as a bare field name or as a 1-3 element group:
//!
//! ```text
//! "name"                                   -> fields only
//! ["Pretty", "field"]                      -> display name + fields
//! ["Pretty", ["a", "b"]]                   -> display name + several fields
//! ["Pretty", "field", "get_pretty_data"]   -> + resolver override (method name)
//! ```
//!
//! Callback overrides cannot come from configuration text; they are attached
//! with [`ColumnPart::Resolver`] when building declarations in code.

use std::fmt;

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::DefinitionError;
use crate::resolver::ColumnResolver;

/// One element of a grouped column declaration.
#[derive(Clone, Deserialize)]
#[serde(from = "PartRepr")]
pub enum ColumnPart {
    Null,
    Text(String),
    Fields(Vec<Option<String>>),
    Resolver(ColumnResolver),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PartRepr {
    Text(String),
    Fields(Vec<Option<String>>),
    Null(()),
}

impl From<PartRepr> for ColumnPart {
    fn from(repr: PartRepr) -> Self {
        match repr {
            PartRepr::Text(s) => ColumnPart::Text(s),
            PartRepr::Fields(v) => ColumnPart::Fields(v),
            PartRepr::Null(()) => ColumnPart::Null,
        }
    }
}

impl From<&str> for ColumnPart {
    fn from(s: &str) -> Self {
        ColumnPart::Text(s.to_string())
    }
}

impl From<Vec<&str>> for ColumnPart {
    fn from(fields: Vec<&str>) -> Self {
        ColumnPart::Fields(fields.into_iter().map(|f| Some(f.to_string())).collect())
    }
}

impl From<ColumnResolver> for ColumnPart {
    fn from(resolver: ColumnResolver) -> Self {
        ColumnPart::Resolver(resolver)
    }
}

impl Serialize for ColumnPart {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ColumnPart::Null => serializer.serialize_none(),
            ColumnPart::Text(s) => serializer.serialize_str(s),
            ColumnPart::Fields(fields) => {
                let mut seq = serializer.serialize_seq(Some(fields.len()))?;
                for field in fields {
                    seq.serialize_element(field)?;
                }
                seq.end()
            }
            ColumnPart::Resolver(r) => serializer.serialize_str(r.name()),
        }
    }
}

impl fmt::Debug for ColumnPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnPart::Null => f.write_str("Null"),
            ColumnPart::Text(s) => write!(f, "Text({:?})", s),
            ColumnPart::Fields(v) => write!(f, "Fields({:?})", v),
            ColumnPart::Resolver(r) => write!(f, "Resolver({})", r.name()),
        }
    }
}

/// A raw column declaration as configured on a view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawColumn {
    Field(String),
    Parts(Vec<ColumnPart>),
}

impl RawColumn {
    pub fn field(name: impl Into<String>) -> Self {
        RawColumn::Field(name.into())
    }

    /// `(display_name, fields)`
    pub fn pair(pretty_name: &str, fields: impl Into<ColumnPart>) -> Self {
        RawColumn::Parts(vec![ColumnPart::from(pretty_name), fields.into()])
    }

    /// `(display_name, fields, resolver_override)`
    pub fn triple(
        pretty_name: &str,
        fields: impl Into<ColumnPart>,
        resolver: impl Into<ColumnPart>,
    ) -> Self {
        RawColumn::Parts(vec![
            ColumnPart::from(pretty_name),
            fields.into(),
            resolver.into(),
        ])
    }
}

impl From<&str> for RawColumn {
    fn from(name: &str) -> Self {
        RawColumn::field(name)
    }
}

/// Resolver attached directly to a column declaration.
#[derive(Clone)]
pub enum ResolverOverride {
    /// Name of a resolver method looked up on the view.
    Method(String),
    Callback(ColumnResolver),
}

impl fmt::Debug for ResolverOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverOverride::Method(name) => write!(f, "Method({})", name),
            ResolverOverride::Callback(r) => write!(f, "Callback({})", r.name()),
        }
    }
}

/// Canonical `{display_name, source_fields, resolver_override}` triple.
#[derive(Debug, Clone)]
pub struct ColumnDefinition {
    pretty_name: Option<String>,
    fields: Vec<String>,
    resolver: Option<ResolverOverride>,
}

impl ColumnDefinition {
    pub fn pretty_name(&self) -> Option<&str> {
        self.pretty_name.as_deref()
    }

    /// Source field paths, `__`-separated.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn resolver(&self) -> Option<&ResolverOverride> {
        self.resolver.as_ref()
    }

    /// Name used to look up resolver methods: the display name when present,
    /// otherwise the first source field.
    pub fn lookup_name(&self) -> &str {
        match self.pretty_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => self.fields.first().map(String::as_str).unwrap_or_default(),
        }
    }

    /// Whether `name` identifies this column for ordering purposes.
    pub fn answers_to(&self, name: &str) -> bool {
        self.pretty_name.as_deref() == Some(name)
            || self.fields.first().map(String::as_str) == Some(name)
    }
}

/// Normalize a raw declaration into its component parts, even if some are
/// missing.
///
/// # Errors
/// `InvalidDefinition` for groups that are not 1, 2 or 3 elements long, and
/// `UnexpectedPart` when an element has the wrong kind for its position.
pub fn get_field_definition(raw: &RawColumn) -> Result<ColumnDefinition, DefinitionError> {
    let single;
    let parts: &[ColumnPart] = match raw {
        RawColumn::Field(name) => {
            single = [ColumnPart::Text(name.clone())];
            &single
        }
        RawColumn::Parts(parts) => parts,
    };

    let (pretty_name, fields, resolver) = match parts {
        [fields] => (None, fields_of(fields, 0)?, None),
        [pretty, fields] => (pretty_name_of(pretty)?, fields_of(fields, 1)?, None),
        [pretty, fields, resolver] => (
            pretty_name_of(pretty)?,
            fields_of(fields, 1)?,
            resolver_of(resolver)?,
        ),
        other => return Err(DefinitionError::InvalidDefinition { len: other.len() }),
    };

    let definition = ColumnDefinition {
        pretty_name,
        fields,
        resolver,
    };
    if definition.lookup_name().is_empty() {
        return Err(DefinitionError::Empty);
    }
    Ok(definition)
}

fn pretty_name_of(part: &ColumnPart) -> Result<Option<String>, DefinitionError> {
    match part {
        ColumnPart::Null => Ok(None),
        ColumnPart::Text(s) => Ok(Some(s.clone())),
        _ => Err(DefinitionError::UnexpectedPart {
            position: 0,
            expected: "a display name",
        }),
    }
}

fn fields_of(part: &ColumnPart, position: usize) -> Result<Vec<String>, DefinitionError> {
    match part {
        ColumnPart::Null => Ok(Vec::new()),
        ColumnPart::Text(s) => Ok(vec![s.clone()]),
        ColumnPart::Fields(fields) => Ok(fields.iter().flatten().cloned().collect()),
        ColumnPart::Resolver(_) => Err(DefinitionError::UnexpectedPart {
            position,
            expected: "a field name or list of field names",
        }),
    }
}

fn resolver_of(part: &ColumnPart) -> Result<Option<ResolverOverride>, DefinitionError> {
    match part {
        ColumnPart::Null => Ok(None),
        ColumnPart::Text(name) if name.is_empty() => Ok(None),
        ColumnPart::Text(name) => Ok(Some(ResolverOverride::Method(name.clone()))),
        ColumnPart::Resolver(r) => Ok(Some(ResolverOverride::Callback(r.clone()))),
        ColumnPart::Fields(_) => Err(DefinitionError::UnexpectedPart {
            position: 2,
            expected: "a resolver or resolver method name",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolvedValue;

    #[test]
    fn test_bare_field_name() {
        let column = get_field_definition(&RawColumn::field("name")).unwrap();
        assert_eq!(column.pretty_name(), None);
        assert_eq!(column.fields(), ["name"]);
        assert!(column.resolver().is_none());
    }

    #[test]
    fn test_pretty_name_and_field() {
        let column = get_field_definition(&RawColumn::pair("Pretty", "field")).unwrap();
        assert_eq!(column.pretty_name(), Some("Pretty"));
        assert_eq!(column.fields(), ["field"]);
    }

    #[test]
    fn test_multiple_fields_with_callback() {
        let cb = ColumnResolver::new("cb", |_, _| Ok(ResolvedValue::from("x")));
        let column = get_field_definition(&RawColumn::triple("Pretty", vec!["a", "b"], cb)).unwrap();
        assert_eq!(column.fields(), ["a", "b"]);
        match column.resolver() {
            Some(ResolverOverride::Callback(r)) => assert_eq!(r.name(), "cb"),
            other => panic!("expected callback override, got {:?}", other),
        }
    }

    #[test]
    fn test_method_name_override() {
        let column =
            get_field_definition(&RawColumn::triple("Pretty", "field", "get_pretty")).unwrap();
        assert!(matches!(
            column.resolver(),
            Some(ResolverOverride::Method(name)) if name == "get_pretty"
        ));
    }

    #[test]
    fn test_none_fields_are_filtered() {
        let raw = RawColumn::Parts(vec![
            ColumnPart::from("Pretty"),
            ColumnPart::Fields(vec![Some("a".into()), None, Some("b".into())]),
        ]);
        let column = get_field_definition(&raw).unwrap();
        assert_eq!(column.fields(), ["a", "b"]);

        let virtual_column =
            get_field_definition(&RawColumn::Parts(vec!["Virtual".into(), ColumnPart::Null]))
                .unwrap();
        assert!(virtual_column.fields().is_empty());
        assert_eq!(virtual_column.lookup_name(), "Virtual");
    }

    #[test]
    fn test_invalid_lengths() {
        let four = RawColumn::Parts(vec!["a".into(), "b".into(), "c".into(), "d".into()]);
        assert_eq!(
            get_field_definition(&four).unwrap_err(),
            DefinitionError::InvalidDefinition { len: 4 }
        );
        assert_eq!(
            get_field_definition(&RawColumn::Parts(vec![])).unwrap_err(),
            DefinitionError::InvalidDefinition { len: 0 }
        );
    }

    #[test]
    fn test_empty_column_rejected() {
        let raw = RawColumn::Parts(vec![ColumnPart::Null, ColumnPart::Null]);
        assert_eq!(get_field_definition(&raw).unwrap_err(), DefinitionError::Empty);
    }

    #[test]
    fn test_deserialize_declarations() {
        let yaml = r#"
- name
- ["Pretty", "field"]
- ["Both", ["a", null, "b"]]
- ["Virtual", null, "get_virtual_data"]
"#;
        let columns: Vec<RawColumn> = serde_yaml::from_str(yaml).unwrap();
        let defs: Vec<_> = columns
            .iter()
            .map(|c| get_field_definition(c).unwrap())
            .collect();
        assert_eq!(defs[0].fields(), ["name"]);
        assert_eq!(defs[1].pretty_name(), Some("Pretty"));
        assert_eq!(defs[2].fields(), ["a", "b"]);
        assert!(defs[3].fields().is_empty());
        assert!(matches!(defs[3].resolver(), Some(ResolverOverride::Method(_))));
    }
}
