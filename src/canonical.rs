//! Canonical schema document: the normalized, serializable form that every
//! downstream consumer (flattening, persistence, connector resolution)
//! operates on. JSON field names are the wire contract and must not drift.

use serde::{Deserialize, Serialize};

use crate::ast;

/// The implicit schema for unqualified names. Substituted once, here;
/// no other module compares against the literal.
pub const DEFAULT_SCHEMA: &str = "public";

/// The wire form is a JSON array of schemas.
pub type Document = Vec<Schema>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub note: Option<String>,
    pub tables: Vec<Table>,
    pub enums: Vec<Enum>,
    pub refs: Vec<Ref>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub note: Option<String>,
    pub fields: Vec<Field>,
    /// Absent while the table sits inside a document; stamped by flattening
    /// so the table stays self-describing on its own.
    #[serde(rename = "schemaName", skip_serializing_if = "Option::is_none", default)]
    pub schema_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pk: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub not_null: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub unique: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub note: Option<String>,
    #[serde(rename = "fieldDefault", skip_serializing_if = "Option::is_none", default)]
    pub field_default: Option<FieldDefault>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefault {
    pub value: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enum {
    pub name: String,
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    pub id: u32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ref {
    pub id: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    pub from: Endpoint,
    pub to: Endpoint,
    /// Derived reference key. Always `ref_key(from, to)`; recomputed on any
    /// endpoint change, never patched in place.
    #[serde(rename = "refDef")]
    pub ref_def: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub schema: String,
    pub table: String,
    pub relation: String,
    #[serde(rename = "fieldNames")]
    pub field_names: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum MalformedSchemaError {
    #[error("ref {id} has {count} endpoints, expected 2")]
    EndpointCount { id: u32, count: usize },
}

/// Stable string identity for a reference, derived from both endpoints.
/// Order-sensitive: the parser's from/to order is preserved, not sorted.
pub fn ref_key(from: &Endpoint, to: &Endpoint) -> String {
    format!("{}~{}", endpoint_key(from), endpoint_key(to))
}

fn endpoint_key(ep: &Endpoint) -> String {
    format!(
        "{}|{}|{}|{}",
        ep.schema,
        ep.table,
        ep.field_names.join(","),
        ep.relation
    )
}

/// Convert the parser AST into the canonical document.
pub fn canonicalize(db: &ast::Database) -> Result<Document, MalformedSchemaError> {
    db.schemas.iter().map(canonicalize_schema).collect()
}

fn canonicalize_schema(schema: &ast::Schema) -> Result<Schema, MalformedSchemaError> {
    Ok(Schema {
        name: schema.name.clone(),
        note: schema.note.clone(),
        tables: schema.tables.iter().map(canonicalize_table).collect(),
        enums: schema.enums.iter().map(canonicalize_enum).collect(),
        refs: schema
            .refs
            .iter()
            .map(canonicalize_ref)
            .collect::<Result<_, _>>()?,
    })
}

fn canonicalize_table(table: &ast::Table) -> Table {
    Table {
        name: table.name.clone(),
        alias: table.alias.clone(),
        note: table.note.clone(),
        fields: table.fields.iter().map(canonicalize_field).collect(),
        schema_name: None,
    }
}

fn canonicalize_field(field: &ast::Field) -> Field {
    Field {
        name: field.name.clone(),
        field_type: field.field_type.type_name.clone(),
        pk: field.pk.then_some(true),
        not_null: field.not_null,
        unique: field.unique.then_some(true),
        note: field.note.clone(),
        field_default: field.dbdefault.as_ref().map(|d| FieldDefault {
            value: d.value.clone(),
            kind: d.kind.as_str().to_string(),
        }),
    }
}

fn canonicalize_enum(en: &ast::Enum) -> Enum {
    Enum {
        name: en.name.clone(),
        values: en
            .values
            .iter()
            .map(|v| EnumValue {
                id: v.id,
                name: v.name.clone(),
                note: v.note.clone(),
            })
            .collect(),
    }
}

fn canonicalize_ref(r: &ast::Ref) -> Result<Ref, MalformedSchemaError> {
    let [from, to] = match r.endpoints.as_slice() {
        [a, b] => [a, b],
        other => {
            return Err(MalformedSchemaError::EndpointCount {
                id: r.id,
                count: other.len(),
            });
        }
    };

    let from = canonicalize_endpoint(from);
    let to = canonicalize_endpoint(to);
    let ref_def = ref_key(&from, &to);

    Ok(Ref {
        id: r.id,
        name: r.name.clone(),
        from,
        to,
        ref_def,
    })
}

fn canonicalize_endpoint(ep: &ast::RefEndpoint) -> Endpoint {
    Endpoint {
        schema: ep
            .schema_name
            .clone()
            .unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
        table: ep.table_name.clone(),
        relation: ep.relation.as_str().to_string(),
        field_names: ep.field_names.clone(),
    }
}
