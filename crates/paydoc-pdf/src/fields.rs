//! Document Fields
//!
//! The caller-supplied label/value mapping. There is no schema: any JSON
//! object is accepted, and entries keep the order they arrived in.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Ordered label -> value pairs
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentFields {
    entries: Vec<(String, String)>,
}

impl DocumentFields {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an entry, keeping any earlier entry with the same label
    pub fn push(&mut self, label: impl Into<String>, value: impl Into<String>) {
        self.entries.push((label.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, v)| (l.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Body lines as they appear in the document, `"<label>: <value>"`
    pub fn lines(&self) -> Vec<String> {
        self.iter()
            .map(|(label, value)| format!("{label}: {value}"))
            .collect()
    }
}

impl<L: Into<String>, V: Into<String>> FromIterator<(L, V)> for DocumentFields {
    fn from_iter<I: IntoIterator<Item = (L, V)>>(iter: I) -> Self {
        let mut fields = Self::new();
        for (label, value) in iter {
            fields.push(label, value);
        }
        fields
    }
}

/// Strings render verbatim, null as empty, anything else as compact JSON.
fn value_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

struct FieldsVisitor;

impl<'de> Visitor<'de> for FieldsVisitor {
    type Value = DocumentFields;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object of document fields")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut fields = DocumentFields::new();
        while let Some((label, value)) = map.next_entry::<String, serde_json::Value>()? {
            fields.push(label, value_text(value));
        }
        Ok(fields)
    }
}

impl<'de> Deserialize<'de> for DocumentFields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FieldsVisitor)
    }
}

impl Serialize for DocumentFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, value) in &self.entries {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preserves_input_order() {
        let fields: DocumentFields =
            serde_json::from_str(r#"{"Zeta": "1", "Alpha": "2", "Mid": "3"}"#).unwrap();
        let labels: Vec<_> = fields.iter().map(|(l, _)| l).collect();
        assert_eq!(labels, ["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn test_lines() {
        let fields: DocumentFields =
            serde_json::from_str(r#"{"Company Name": "Acme", "Tax ID": "123"}"#).unwrap();
        assert_eq!(fields.lines(), ["Company Name: Acme", "Tax ID: 123"]);
    }

    #[test]
    fn test_non_string_values() {
        let fields: DocumentFields = serde_json::from_str(
            r#"{"Employees": 42, "Active": true, "Fax": null, "Tags": ["a", "b"]}"#,
        )
        .unwrap();
        assert_eq!(
            fields.lines(),
            ["Employees: 42", "Active: true", "Fax: ", r#"Tags: ["a","b"]"#]
        );
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(serde_json::from_str::<DocumentFields>("[1, 2]").is_err());
        assert!(serde_json::from_str::<DocumentFields>("\"text\"").is_err());
    }

    #[test]
    fn test_empty_object() {
        let fields: DocumentFields = serde_json::from_str("{}").unwrap();
        assert!(fields.is_empty());
    }
}
