//! Duplicate a table: derive the copy's name, rewrite the source text and
//! structured state, and repoint every ref that touched the old name.

use crate::canonical::{DEFAULT_SCHEMA, Document, Table, ref_key};

/// Suffix appended to the source table's name. Collisions with an existing
/// `*_copy` table are not checked; the host may rename afterwards.
const COPY_SUFFIX: &str = "_copy";

#[derive(Debug, thiserror::Error)]
pub enum DuplicateError {
    #[error("no table declaration found in source text")]
    NameNotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Duplicated {
    pub table_def: String,
    pub table: Table,
    pub document: Document,
}

/// Produce the duplicate's text, table, and document. The inputs are never
/// mutated; the copy is a full structural clone. Every ref endpoint naming
/// the old table in its schema is redirected to the new name and its refDef
/// re-derived from the updated endpoints.
pub fn duplicate_table(
    table_def: &str,
    table: &Table,
    document: &Document,
) -> Result<Duplicated, DuplicateError> {
    let old_name = extract_table_name(table_def).ok_or(DuplicateError::NameNotFound)?;
    let new_name = format!("{}{}", old_name, COPY_SUFFIX);

    let new_def = replace_ident(table_def, &old_name, &new_name);

    let mut new_table = table.clone();
    new_table.name = new_name.clone();

    let schema_name = table.schema_name.as_deref().unwrap_or(DEFAULT_SCHEMA);
    let mut new_document = document.clone();
    for schema in &mut new_document {
        if schema.name == schema_name {
            let mut copy = new_table.clone();
            // Tables inside a document carry no schema stamp.
            copy.schema_name = None;
            schema.tables.push(copy);
        }
        for r in &mut schema.refs {
            let mut touched = false;
            if r.from.table == old_name && r.from.schema == schema_name {
                r.from.table = new_name.clone();
                touched = true;
            }
            if r.to.table == old_name && r.to.schema == schema_name {
                r.to.table = new_name.clone();
                touched = true;
            }
            if touched {
                r.ref_def = ref_key(&r.from, &r.to);
            }
        }
    }

    Ok(Duplicated {
        table_def: new_def,
        table: new_table,
        document: new_document,
    })
}

/// Pull the table name out of a `Table [schema.]name {` declaration.
/// Aliases and settings after the name are ignored.
pub fn extract_table_name(table_def: &str) -> Option<String> {
    let lower = table_def.to_ascii_lowercase();
    let mut search = 0;

    while let Some(pos) = lower[search..].find("table") {
        let start = search + pos;
        let end = start + "table".len();
        search = end;

        let boundary_before = table_def[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !is_ident_char(c));
        let boundary_after = table_def[end..].chars().next().is_some_and(char::is_whitespace);
        if !boundary_before || !boundary_after {
            continue;
        }

        let rest = &table_def[end..];
        let brace = match rest.find('{') {
            Some(b) => b,
            None => continue,
        };
        let name_token = match rest[..brace].split_whitespace().next() {
            Some(t) => t,
            None => continue,
        };
        let name = name_token.rsplit('.').next().unwrap_or(name_token);
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }

    None
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Replace whole identifier tokens equal to `old` with `new`. Occurrences
/// embedded in longer identifiers or words are left alone, so a table name
/// that also appears inside a note or a column name survives unchanged.
fn replace_ident(text: &str, old: &str, new: &str) -> String {
    if old.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = 0;

    while let Some(pos) = text[rest..].find(old) {
        let start = rest + pos;
        let end = start + old.len();

        let boundary_before = text[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !is_ident_char(c));
        let boundary_after = text[end..].chars().next().is_none_or(|c| !is_ident_char(c));

        out.push_str(&text[rest..start]);
        if boundary_before && boundary_after {
            out.push_str(new);
        } else {
            out.push_str(old);
        }
        rest = end;
    }

    out.push_str(&text[rest..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::canonicalize;
    use crate::flatten::{flatten_refs, flatten_tables};
    use crate::parser::Parser;

    fn canonical(input: &str) -> Document {
        let db = Parser::new(input).unwrap().parse().unwrap();
        canonicalize(&db).unwrap()
    }

    #[test]
    fn test_extract_plain_name() {
        assert_eq!(
            extract_table_name("Table orders {\n  id int\n}").as_deref(),
            Some("orders")
        );
    }

    #[test]
    fn test_extract_name_without_space_before_brace() {
        assert_eq!(
            extract_table_name("Table table_name{\n  id int\n}").as_deref(),
            Some("table_name")
        );
    }

    #[test]
    fn test_extract_schema_qualified_name() {
        assert_eq!(
            extract_table_name("Table auth.users { id int }").as_deref(),
            Some("users")
        );
    }

    #[test]
    fn test_extract_ignores_alias() {
        assert_eq!(
            extract_table_name("Table users as U { id int }").as_deref(),
            Some("users")
        );
    }

    #[test]
    fn test_extract_missing_declaration() {
        assert_eq!(extract_table_name("Enum status { active }"), None);
        assert_eq!(extract_table_name("tablegroup g { a b }"), None);
    }

    #[test]
    fn test_replace_ident_is_token_aware() {
        let text = "Table orders { orders_total int }\n// orders ship daily";
        let out = replace_ident(text, "orders", "orders_copy");
        assert_eq!(
            out,
            "Table orders_copy { orders_total int }\n// orders_copy ship daily"
        );
    }

    #[test]
    fn test_duplicate_renames_and_repoints_refs() {
        let source = "Table orders { id int [pk] }";
        let doc = canonical(
            "Table orders { id int [pk] }\nTable invoices { order_id int }\nRef: orders.id < invoices.order_id",
        );
        let table = flatten_tables(&doc)[0].clone();

        let dup = duplicate_table(source, &table, &doc).unwrap();

        assert_eq!(dup.table.name, "orders_copy");
        assert_eq!(dup.table_def, "Table orders_copy { id int [pk] }");

        let refs = flatten_refs(&dup.document);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].from.table, "orders_copy");
        assert_eq!(refs[0].to.table, "invoices");
        assert_eq!(refs[0].ref_def, ref_key(&refs[0].from, &refs[0].to));
        assert_eq!(
            refs[0].ref_def,
            "public|orders_copy|id|1~public|invoices|order_id|*"
        );
    }

    #[test]
    fn test_duplicate_recomputes_ref_def_instead_of_patching() {
        let doc = canonical(
            "Table orders { id int [pk] }\nTable invoices { order_id int }\nRef: orders.id < invoices.order_id",
        );
        let table = flatten_tables(&doc)[0].clone();
        let before = flatten_refs(&doc)[0].ref_def.clone();

        let dup = duplicate_table("Table orders { id int [pk] }", &table, &doc).unwrap();
        let after = flatten_refs(&dup.document)[0].ref_def.clone();

        assert_ne!(before, after);
        assert!(after.contains("|orders_copy|"));
    }

    #[test]
    fn test_duplicate_appends_copy_to_owning_schema() {
        let doc = canonical("Table orders { id int [pk] }");
        let table = flatten_tables(&doc)[0].clone();

        let dup = duplicate_table("Table orders { id int [pk] }", &table, &doc).unwrap();
        let names: Vec<&str> = dup.document[0]
            .tables
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["orders", "orders_copy"]);
        assert_eq!(dup.document[0].tables[1].schema_name, None);
    }

    #[test]
    fn test_duplicate_leaves_unrelated_refs_untouched() {
        let doc = canonical(
            "Table orders { id int [pk] }\nTable a { id int }\nTable b { a_id int }\nRef: a.id < b.a_id",
        );
        let table = flatten_tables(&doc)[0].clone();
        let before = flatten_refs(&doc)[0].clone();

        let dup = duplicate_table("Table orders { id int [pk] }", &table, &doc).unwrap();
        let after = flatten_refs(&dup.document)[0].clone();

        assert_eq!(before, after);
    }

    #[test]
    fn test_duplicate_does_not_touch_same_name_in_other_schema() {
        let doc = canonical(
            "Table orders { id int [pk] }\nTable archive.orders { id int }\nRef: archive.orders.id < archive.lines.order_id",
        );
        let table = flatten_tables(&doc)[0].clone();
        assert_eq!(table.schema_name.as_deref(), Some("public"));

        let dup = duplicate_table("Table orders { id int [pk] }", &table, &doc).unwrap();
        let refs = flatten_refs(&dup.document);
        assert_eq!(refs[0].from.table, "orders");
        assert_eq!(refs[0].from.schema, "archive");
    }

    #[test]
    fn test_duplicate_without_declaration_fails() {
        let doc = canonical("Table orders { id int }");
        let table = flatten_tables(&doc)[0].clone();
        assert!(matches!(
            duplicate_table("not a declaration", &table, &doc),
            Err(DuplicateError::NameNotFound)
        ));
    }

    #[test]
    fn test_duplicate_is_a_deep_copy() {
        let doc = canonical("Table orders { id int [pk] }");
        let table = flatten_tables(&doc)[0].clone();

        let mut dup = duplicate_table("Table orders { id int [pk] }", &table, &doc).unwrap();
        dup.table.fields[0].name = "mutated".to_string();

        assert_eq!(table.fields[0].name, "id");
        assert_eq!(doc[0].tables[0].fields[0].name, "id");
    }
}
