//! Built-in migration steps
//!
//! Each function rewrites one document in place. They never touch the
//! schema version field.

use anyhow::{anyhow, bail, Context};
use provenant_domain::document::{RELATIONSHIPS_FIELD, SOURCE_FIELD};
use provenant_domain::{Confidence, Document, RelationshipType, TloKind, Tlp};
use serde_json::{Map, Value};

/// Legacy edge field names and their current spelling
const EDGE_FIELD_RENAMES: [(&str, &str); 5] = [
    ("value", "target_id"),
    ("type", "target_kind"),
    ("rel_confidence", "confidence"),
    ("rel_reason", "reason"),
    ("date", "created"),
];

/// Legacy indicator type names
const INDICATOR_TYPE_RENAMES: [(&str, &str); 6] = [
    ("URI - URL", "URI"),
    ("URI - Domain Name", "Domain"),
    ("Address - ipv4-addr", "IPv4 Address"),
    ("Address - ipv6-addr", "IPv6 Address"),
    ("Address - e-mail", "Email Address"),
    ("Hash - MD5", "MD5"),
];

/// Field holding an indicator's type
const INDICATOR_TYPE_FIELD: &str = "type";

/// Field holding the bucket list
const BUCKET_LIST_FIELD: &str = "bucket_list";

/// Borrow an array field, creating it when missing or null
fn array_field<'a>(doc: &'a mut Document, field: &str) -> anyhow::Result<&'a mut Vec<Value>> {
    if doc.get(field).map_or(true, Value::is_null) {
        doc.insert(field.to_string(), Value::Array(Vec::new()));
    }
    match doc.get_mut(field) {
        Some(Value::Array(items)) => Ok(items),
        Some(other) => bail!("field '{}' is not an array: {}", field, other),
        None => Err(anyhow!("field '{}' is missing", field)),
    }
}

fn as_object<'a>(value: &'a mut Value, what: &str) -> anyhow::Result<&'a mut Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => bail!("{} is not an object: {}", what, other),
    }
}

fn default_string(map: &mut Map<String, Value>, field: &str, default: &str) {
    if map.get(field).map_or(true, Value::is_null) {
        map.insert(field.to_string(), Value::String(default.to_string()));
    }
}

/// v1 → v2: rename legacy edge fields and canonicalize labels
pub fn normalize_relationships(doc: &mut Document) -> anyhow::Result<()> {
    let edges = array_field(doc, RELATIONSHIPS_FIELD)?;

    for (index, edge) in edges.iter_mut().enumerate() {
        let edge = as_object(edge, "relationship edge")?;

        for (legacy, current) in EDGE_FIELD_RENAMES {
            if edge.contains_key(current) {
                continue;
            }
            if let Some(value) = edge.remove(legacy) {
                edge.insert(current.to_string(), value);
            }
        }

        let label = edge
            .get("relationship")
            .and_then(Value::as_str)
            .with_context(|| format!("edge {} has no relationship label", index))?;
        let relationship = RelationshipType::parse(label)
            .with_context(|| format!("edge {} has unknown relationship '{}'", index, label))?;
        edge.insert(
            "relationship".to_string(),
            Value::String(relationship.as_str().to_string()),
        );

        let kind_name = edge
            .get("target_kind")
            .and_then(Value::as_str)
            .with_context(|| format!("edge {} has no target kind", index))?;
        let kind = TloKind::parse(kind_name)
            .with_context(|| format!("edge {} has unknown target kind '{}'", index, kind_name))?;
        edge.insert(
            "target_kind".to_string(),
            Value::String(kind.as_str().to_string()),
        );

        let confidence = edge
            .get("confidence")
            .and_then(Value::as_str)
            .and_then(Confidence::parse)
            .unwrap_or_default();
        edge.insert(
            "confidence".to_string(),
            Value::String(confidence.as_str().to_string()),
        );

        default_string(edge, "analyst", "");
        default_string(edge, "reason", "");
    }

    Ok(())
}

/// v2 → v3: default source instance fields and split the bucket list
pub fn normalize_sources(doc: &mut Document) -> anyhow::Result<()> {
    let sources = array_field(doc, SOURCE_FIELD)?;

    for entry in sources.iter_mut() {
        let entry = as_object(entry, "source entry")?;
        let name = entry
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        if name.is_empty() {
            bail!("source entry without a name");
        }

        let instances = match entry.get_mut("instances") {
            Some(Value::Array(instances)) => instances,
            _ => bail!("source '{}' has no instance list", name),
        };

        for instance in instances.iter_mut() {
            let instance = as_object(instance, "source instance")?;
            default_string(instance, "tlp", Tlp::Red.as_str());
            default_string(instance, "method", "");
            default_string(instance, "reference", "");
        }
    }

    if let Some(Value::String(buckets)) = doc.get(BUCKET_LIST_FIELD) {
        let buckets: Vec<Value> = buckets
            .split(',')
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(|b| Value::String(b.to_string()))
            .collect();
        doc.insert(BUCKET_LIST_FIELD.to_string(), Value::Array(buckets));
    }

    for entry in array_field(doc, "releasability")?.iter_mut() {
        let entry = as_object(entry, "releasability entry")?;
        if entry.get("instances").map_or(true, Value::is_null) {
            entry.insert("instances".to_string(), Value::Array(Vec::new()));
        }
        default_string(entry, "analyst", "");
    }

    Ok(())
}

/// Indicator v3 → v4: rename legacy indicator types
pub fn rename_indicator_types(doc: &mut Document) -> anyhow::Result<()> {
    let Some(current) = doc.get(INDICATOR_TYPE_FIELD).and_then(Value::as_str) else {
        return Ok(());
    };

    if let Some((_, renamed)) = INDICATOR_TYPE_RENAMES
        .iter()
        .find(|(legacy, _)| *legacy == current)
    {
        doc.insert(
            INDICATOR_TYPE_FIELD.to_string(),
            Value::String(renamed.to_string()),
        );
    }

    Ok(())
}
