//! Raw stored documents and the query vocabulary stores understand

use crate::TloId;
use serde_json::{Map, Value};

/// A stored document: a JSON object as it sits in the store
///
/// Documents may be in any historical schema, so they are only turned into a
/// [`crate::Tlo`] after migration.
pub type Document = Map<String, Value>;

/// Field holding the document identifier
pub const ID_FIELD: &str = "_id";

/// Field holding the schema version
pub const SCHEMA_VERSION_FIELD: &str = "schema_version";

/// Field holding the relationship edges
pub const RELATIONSHIPS_FIELD: &str = "relationships";

/// Field holding the source entries
pub const SOURCE_FIELD: &str = "source";

/// Read the schema version of a raw document
///
/// Missing or non-numeric versions read as 0, which callers treat as an
/// unrecognized document.
pub fn schema_version_of(doc: &Document) -> u32 {
    doc.get(SCHEMA_VERSION_FIELD)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0)
}

/// Read the identifier of a raw document
pub fn id_of(doc: &Document) -> Option<TloId> {
    doc.get(ID_FIELD)
        .and_then(Value::as_str)
        .and_then(|s| TloId::from_string(s).ok())
}

/// A condition on a top-level string field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldCondition {
    /// Field equals the given string
    Equals {
        /// Top-level field name
        field: String,
        /// Expected value
        value: String,
    },

    /// Field is missing, null or the empty string
    Absent {
        /// Top-level field name
        field: String,
    },
}

/// Criteria for finding documents of one kind
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    /// Restrict to these identifiers
    pub ids: Option<Vec<TloId>>,

    /// Restrict to documents below this schema version
    pub schema_version_below: Option<u32>,

    /// Restrict to identifiers ordered after this one
    pub id_after: Option<TloId>,

    /// Restrict to documents carrying at least one of these source names
    pub source_names: Option<Vec<String>>,

    /// Additional conditions on top-level fields
    pub conditions: Vec<FieldCondition>,

    /// Maximum results to return
    pub limit: Option<usize>,
}

impl DocumentFilter {
    /// Filter matching a single identifier
    pub fn by_id(id: TloId) -> Self {
        Self {
            ids: Some(vec![id]),
            ..Default::default()
        }
    }

    /// Add an equality condition
    pub fn field_equals(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.conditions.push(FieldCondition::Equals {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Add an absence condition
    pub fn field_absent(mut self, field: impl Into<String>) -> Self {
        self.conditions.push(FieldCondition::Absent {
            field: field.into(),
        });
        self
    }

    /// Restrict to documents with at least one of these sources
    pub fn with_sources<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_names = Some(names.into_iter().map(Into::into).collect());
        self
    }
}

/// Which top-level fields a find returns
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Projection {
    /// The whole document
    #[default]
    All,

    /// Only these fields (plus `_id` and `schema_version`)
    Fields(Vec<String>),
}

impl Projection {
    /// Projection returning only identity fields
    pub fn ids_only() -> Self {
        Projection::Fields(Vec::new())
    }

    /// Apply the projection to a document
    pub fn apply(&self, doc: Document) -> Document {
        match self {
            Projection::All => doc,
            Projection::Fields(fields) => doc
                .into_iter()
                .filter(|(key, _)| {
                    key == ID_FIELD
                        || key == SCHEMA_VERSION_FIELD
                        || fields.iter().any(|f| f == key)
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_schema_version_defaults_to_zero() {
        assert_eq!(schema_version_of(&doc(json!({"schema_version": 3}))), 3);
        assert_eq!(schema_version_of(&doc(json!({}))), 0);
        assert_eq!(schema_version_of(&doc(json!({"schema_version": "two"}))), 0);
    }

    #[test]
    fn test_projection_keeps_identity_fields() {
        let id = TloId::new();
        let d = doc(json!({
            "_id": id.to_string(),
            "schema_version": 3,
            "name": "Zeus",
            "source": [],
        }));

        let projected = Projection::Fields(vec!["name".to_string()]).apply(d);
        assert_eq!(projected.len(), 3);
        assert!(projected.contains_key("name"));
        assert!(!projected.contains_key("source"));
        assert_eq!(id_of(&projected), Some(id));
    }
}
