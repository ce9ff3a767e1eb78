pub mod ast;
pub mod canonical;
pub mod connector;
pub mod duplicate;
pub mod flatten;
pub mod group;
pub mod lexer;
pub mod message;
pub mod node;
pub mod parser;
pub mod render;
pub mod store;

use wasm_bindgen::prelude::*;

use canonical::canonicalize;
use parser::Parser;
use render::CardRenderer;

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Parse DBML source into canonical document JSON.
#[wasm_bindgen(js_name = "dbmlToCanonical")]
pub fn dbml_to_canonical(source: &str) -> Result<String, String> {
    let mut parser = Parser::new(source).map_err(|e| e.to_string())?;
    let database = parser.parse().map_err(|e| e.to_string())?;
    let document = canonicalize(&database).map_err(|e| e.to_string())?;

    serde_json::to_string(&document).map_err(|e| e.to_string())
}

/// Render every table in the source as a text card.
#[wasm_bindgen(js_name = "renderTableCards")]
pub fn render_table_cards(source: &str) -> Result<String, String> {
    let mut parser = Parser::new(source).map_err(|e| e.to_string())?;
    let database = parser.parse().map_err(|e| e.to_string())?;
    let document = canonicalize(&database).map_err(|e| e.to_string())?;

    let renderer = CardRenderer::default();
    Ok(flatten::flatten_tables(&document)
        .iter()
        .map(|t| renderer.render(t))
        .collect::<Vec<_>>()
        .join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::StrokeCap;
    use crate::store::{ConnectorStore, MemoryStore, NodeStore};

    #[test]
    fn test_dbml_to_canonical_round_trip() {
        let json =
            dbml_to_canonical("Table t1 { id int [pk] }\nTable t2 { id int }\nRef: t1.id < t2.id")
                .unwrap();
        let doc: canonical::Document = serde_json::from_str(&json).unwrap();

        assert_eq!(doc.len(), 1);
        assert_eq!(doc[0].tables.len(), 2);
        assert_eq!(doc[0].refs.len(), 1);

        let r = &doc[0].refs[0];
        assert_eq!(r.from.schema, "public");
        assert_eq!(r.from.table, "t1");
        assert_eq!(r.from.field_names, vec!["id"]);
        assert_eq!(r.from.relation, "1");
        assert_eq!(r.to.table, "t2");
        assert_eq!(r.ref_def, canonical::ref_key(&r.from, &r.to));
    }

    #[test]
    fn test_dbml_to_canonical_surfaces_parse_error() {
        let err = dbml_to_canonical("Table { }").unwrap_err();
        assert!(err.contains("Unexpected token"));
    }

    #[test]
    fn test_end_to_end_edit_then_connect() {
        // Edit two sibling nodes, then resolve connectors between them
        // twice; the second pass must not add an edge.
        let source = "Table t1 { id int [pk] }\nTable t2 { id int }\nRef: t1.id < t2.id";
        let json = dbml_to_canonical(source).unwrap();

        let mut store = MemoryStore::new();
        let n1 = store.add_node("1:1");
        let n2 = store.add_node("1:2");

        let doc: canonical::Document = serde_json::from_str(&json).unwrap();
        let tables = flatten::flatten_tables(&doc);
        node::set_table(&mut store, &n1, &tables[0]);
        node::set_document(&mut store, &n1, &doc);
        node::set_table(&mut store, &n2, &tables[1]);
        node::set_siblings(&mut store, &n1, &[n1.clone(), n2.clone()]);

        let first = node::connect(&mut store, &n1);
        assert_eq!(first.created.len(), 1);
        assert_eq!(first.created[0].start_cap, StrokeCap::None);
        assert_eq!(first.created[0].end_cap, StrokeCap::ArrowLines);

        let second = node::connect(&mut store, &n1);
        assert!(second.created.is_empty());
        assert_eq!(store.connectors().len(), 1);
    }

    #[test]
    fn test_end_to_end_duplicate_then_connect() {
        // Duplicating a node and connecting draws the copy's edges, not
        // duplicates of the original's.
        let source = "Table orders { id int [pk] }";
        let json = dbml_to_canonical(source).unwrap();
        let doc: canonical::Document = serde_json::from_str(&json).unwrap();

        let mut store = MemoryStore::new();
        let a = store.add_node("a");
        node::set_table_def(&mut store, &a, source);
        node::set_table(&mut store, &a, &flatten::flatten_tables(&doc)[0]);
        node::set_document(&mut store, &a, &doc);

        let b = store.add_node("b");
        node::add_copy(&mut store, &a, b.clone()).unwrap();

        let ctx = node::edit_context(&store, &a);
        assert_eq!(ctx.sibling_tables.len(), 1);
        assert_eq!(ctx.sibling_tables[0].table.name, "orders_copy");

        // No refs anywhere yet, so connecting creates nothing.
        let resolution = node::connect(&mut store, &b);
        assert!(resolution.created.is_empty());
        assert!(store.connectors().is_empty());
        assert!(store.is_live(&b));
    }

    #[test]
    fn test_render_table_cards_joins_all_tables() {
        let cards = render_table_cards("Table a { id int }\nTable auth.b { id int }").unwrap();
        assert!(cards.contains("| a"));
        assert!(cards.contains("auth.b"));
    }
}
