//! Plain-text table cards. Presentation is the host's job; this renderer
//! exists for the CLI and for eyeballing a node's state in tests.

use unicode_width::UnicodeWidthStr;

use crate::canonical::{DEFAULT_SCHEMA, Field, Table};

/// The default schema is elided from display names.
pub fn display_table_name(schema: &str, name: &str) -> String {
    if schema == DEFAULT_SCHEMA {
        name.to_string()
    } else {
        format!("{}.{}", schema, name)
    }
}

pub struct CardRenderer {
    pub show_notes: bool,
}

impl Default for CardRenderer {
    fn default() -> Self {
        Self { show_notes: true }
    }
}

impl CardRenderer {
    pub fn render(&self, table: &Table) -> String {
        let title = display_table_name(
            table.schema_name.as_deref().unwrap_or(DEFAULT_SCHEMA),
            &table.name,
        );

        let rows: Vec<(&'static str, String, &str, &'static str)> = table
            .fields
            .iter()
            .map(|f| (marker(f), field_label(f), f.field_type.as_str(), note_flag(f)))
            .collect();

        let name_width = rows
            .iter()
            .map(|(_, name, _, _)| UnicodeWidthStr::width(name.as_str()))
            .max()
            .unwrap_or(0);
        let type_width = rows
            .iter()
            .map(|(_, _, typ, _)| UnicodeWidthStr::width(*typ))
            .max()
            .unwrap_or(0);

        // marker(2) + gap + name + gap + type + gap + flag(1)
        let body_width = 2 + 1 + name_width + 2 + type_width + 1 + 1;
        let inner = body_width.max(UnicodeWidthStr::width(title.as_str()));

        let mut out = String::new();
        push_border(&mut out, inner);
        push_row(&mut out, &title, inner);
        if self.show_notes {
            if let Some(note) = &table.note {
                push_row(&mut out, note, inner);
            }
        }
        push_border(&mut out, inner);
        for (mark, name, typ, flag) in &rows {
            let line = format!(
                "{} {}{}  {}{} {}",
                mark,
                name,
                " ".repeat(name_width - UnicodeWidthStr::width(name.as_str())),
                " ".repeat(type_width - UnicodeWidthStr::width(*typ)),
                typ,
                flag,
            );
            push_row(&mut out, &line, inner);
        }
        push_border(&mut out, inner);
        out
    }
}

/// Nullability: only an explicit `not_null: false` renders the `?` suffix.
fn field_label(f: &Field) -> String {
    match f.not_null {
        Some(false) => format!("{}?", f.name),
        _ => f.name.clone(),
    }
}

fn marker(f: &Field) -> &'static str {
    if f.pk == Some(true) {
        "pk"
    } else if f.unique == Some(true) {
        " u"
    } else {
        "  "
    }
}

fn note_flag(f: &Field) -> &'static str {
    if f.note.is_some() || f.field_default.is_some() {
        "*"
    } else {
        " "
    }
}

fn push_border(out: &mut String, inner: usize) {
    out.push('+');
    out.push_str(&"-".repeat(inner + 2));
    out.push_str("+\n");
}

fn push_row(out: &mut String, content: &str, inner: usize) {
    let pad = inner - UnicodeWidthStr::width(content);
    out.push_str("| ");
    out.push_str(content);
    out.push_str(&" ".repeat(pad));
    out.push_str(" |\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::canonicalize;
    use crate::flatten::flatten_tables;
    use crate::parser::Parser;

    fn first_table(input: &str) -> Table {
        let db = Parser::new(input).unwrap().parse().unwrap();
        flatten_tables(&canonicalize(&db).unwrap())[0].clone()
    }

    #[test]
    fn test_display_name_elides_public() {
        assert_eq!(display_table_name("public", "users"), "users");
        assert_eq!(display_table_name("auth", "users"), "auth.users");
    }

    #[test]
    fn test_card_title_and_markers() {
        let table = first_table(
            "Table auth.users {\n  id int [pk]\n  email text [unique]\n  bio text [null]\n}",
        );
        let card = CardRenderer::default().render(&table);

        assert!(card.contains("auth.users"));
        assert!(card.contains("pk id"));
        assert!(card.contains(" u email"));
        assert!(card.contains("bio?"));
    }

    #[test]
    fn test_card_note_toggle() {
        let table = first_table("Table t {\n  id int\n  Note: 'people'\n}");

        let with = CardRenderer { show_notes: true }.render(&table);
        assert!(with.contains("people"));

        let without = CardRenderer { show_notes: false }.render(&table);
        assert!(!without.contains("people"));
    }

    #[test]
    fn test_card_flags_default_values() {
        let table = first_table("Table t { active bool [default: \"1\"] }");
        let card = CardRenderer::default().render(&table);
        assert!(card.contains("*"));
    }

    #[test]
    fn test_card_lines_align() {
        let table = first_table("Table t {\n  id int [pk]\n  long_name_field varchar(255)\n}");
        let card = CardRenderer::default().render(&table);
        let widths: Vec<usize> = card
            .lines()
            .map(UnicodeWidthStr::width)
            .collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_card_handles_wide_characters() {
        let table = first_table("Table t { \"名前\" text }");
        let card = CardRenderer::default().render(&table);
        let widths: Vec<usize> = card.lines().map(UnicodeWidthStr::width).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
    }
}
