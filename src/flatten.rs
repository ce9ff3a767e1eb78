//! Flat projections of a canonical document: addressable table and ref
//! lists that stay self-describing outside their schema context.

use crate::canonical::{Document, Ref, Table};

/// Every table in document order, stamped with its owning schema's name.
pub fn flatten_tables(doc: &Document) -> Vec<Table> {
    let mut tables = Vec::new();
    for schema in doc {
        for table in &schema.tables {
            let mut t = table.clone();
            t.schema_name = Some(schema.name.clone());
            tables.push(t);
        }
    }
    tables
}

/// Every ref in document order. Endpoints already carry their schema.
pub fn flatten_refs(doc: &Document) -> Vec<Ref> {
    doc.iter().flat_map(|s| s.refs.iter().cloned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::{canonicalize, ref_key};
    use crate::parser::Parser;

    fn canonical(input: &str) -> Document {
        let db = Parser::new(input).unwrap().parse().unwrap();
        canonicalize(&db).unwrap()
    }

    #[test]
    fn test_flatten_tables_stamps_schema() {
        let doc = canonical("Table users { id int }\nTable auth.tokens { id int }");
        let tables = flatten_tables(&doc);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].name, "users");
        assert_eq!(tables[0].schema_name.as_deref(), Some("public"));
        assert_eq!(tables[1].name, "tokens");
        assert_eq!(tables[1].schema_name.as_deref(), Some("auth"));
    }

    #[test]
    fn test_flatten_preserves_document_order() {
        let doc = canonical("Table b { id int }\nTable a { id int }");
        let tables = flatten_tables(&doc);
        let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_flattened_ref_def_matches_recomputed_key() {
        let doc = canonical(
            "Table t1 { id int [pk] }\nTable t2 { id int }\nRef: t1.id < t2.id\nRef: auth.users.id < t2.user_id",
        );
        let refs = flatten_refs(&doc);
        assert_eq!(refs.len(), 2);
        for r in &refs {
            assert_eq!(r.ref_def, ref_key(&r.from, &r.to));
        }
    }
}
