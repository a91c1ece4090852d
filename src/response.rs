//! AJAX response payload
//!
//! Wire format of the legacy dataTables.js protocol:
//!
//! ```text
//! {
//!   "sEcho": "3",
//!   "iTotalRecords": 120,
//!   "iTotalDisplayRecords": 14,
//!   "aaData": [{"DT_RowId": 7, "0": "...", "1": "..."}]
//! }
//! ```
//!
//! `s~` names are strings, `i~` integers and `aa~` arrays.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::Result;
use crate::value::Value;

/// Key carrying the row's primary identifier
pub const ROW_ID_KEY: &str = "DT_RowId";

/// One row: primary identifier plus stringified display values by column index.
#[derive(Debug, Clone, PartialEq)]
pub struct RowRecord {
    pub row_id: Value,
    pub cells: Vec<String>,
}

impl Serialize for RowRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len() + 1))?;
        map.serialize_entry(ROW_ID_KEY, &self.row_id)?;
        for (i, cell) in self.cells.iter().enumerate() {
            map.serialize_entry(&i.to_string(), cell)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponsePayload {
    #[serde(rename = "sEcho")]
    pub echo: Option<String>,

    #[serde(rename = "iTotalRecords")]
    pub total_record_count: usize,

    #[serde(rename = "iTotalDisplayRecords")]
    pub filtered_record_count: usize,

    #[serde(rename = "aaData")]
    pub rows: Vec<RowRecord>,
}

impl ResponsePayload {
    /// Serialize to JSON; `pretty` indents with 4 spaces.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        if !pretty {
            return Ok(serde_json::to_string(self)?);
        }
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        // serde_json only writes valid UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn payload() -> ResponsePayload {
        ResponsePayload {
            echo: Some("3".into()),
            total_record_count: 120,
            filtered_record_count: 14,
            rows: vec![RowRecord {
                row_id: Value::Int(7),
                cells: vec!["a".into(), "<b>b</b>".into()],
            }],
        }
    }

    #[test]
    fn test_compact_wire_format() {
        assert_eq!(
            payload().to_json(false).unwrap(),
            r#"{"sEcho":"3","iTotalRecords":120,"iTotalDisplayRecords":14,"aaData":[{"DT_RowId":7,"0":"a","1":"<b>b</b>"}]}"#
        );
    }

    #[test]
    fn test_missing_echo_is_null() {
        let mut payload = payload();
        payload.echo = None;
        payload.rows.clear();
        assert_eq!(
            payload.to_json(false).unwrap(),
            r#"{"sEcho":null,"iTotalRecords":120,"iTotalDisplayRecords":14,"aaData":[]}"#
        );
    }

    #[test]
    fn test_pretty_uses_four_spaces() {
        let json = payload().to_json(true).unwrap();
        assert!(json.starts_with("{\n    \"sEcho\": \"3\",\n"));
        assert!(json.contains("\n            \"DT_RowId\": 7,"));
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["aaData"][0]["1"], "<b>b</b>");
    }
}
