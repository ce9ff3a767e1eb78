//! Parser-side AST: the nested shapes the DBML parser produces, before
//! canonicalization flattens them into the wire form.

#[derive(Debug, Clone, PartialEq)]
pub struct Database {
    pub schemas: Vec<Schema>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub name: String,
    pub note: Option<String>,
    pub tables: Vec<Table>,
    pub enums: Vec<Enum>,
    pub refs: Vec<Ref>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub alias: Option<String>,
    pub note: Option<String>,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub pk: bool,
    /// Tri-state: `None` means nullability was never stated.
    pub not_null: Option<bool>,
    pub unique: bool,
    pub note: Option<String>,
    pub dbdefault: Option<DefaultValue>,
}

/// The parser keeps the type nested; canonicalization reads `type_name`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldType {
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefaultValue {
    pub value: String,
    pub kind: DefaultKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultKind {
    Number,
    String,
    Boolean,
    Expression,
}

impl DefaultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Expression => "expression",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enum {
    pub name: String,
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub id: u32,
    pub name: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ref {
    pub id: u32,
    pub name: Option<String>,
    pub endpoints: Vec<RefEndpoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefEndpoint {
    /// `None` for unqualified endpoints; the canonicalizer substitutes the
    /// default schema.
    pub schema_name: Option<String>,
    pub table_name: String,
    pub field_names: Vec<String>,
    pub relation: Relation,
}

/// Cardinality marker for one side of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    One,
    Many,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::One => "1",
            Self::Many => "*",
        }
    }
}
