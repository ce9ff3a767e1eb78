use crate::ast::*;
use crate::canonical::DEFAULT_SCHEMA;
use crate::lexer::{LexError, Lexer, Token};

/// Note attached to the implicit default schema, matching the upstream
/// parser's output for unqualified declarations.
const DEFAULT_SCHEMA_NOTE: &str = "Default Public Schema";

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Lex error: {0}")]
    Lex(#[from] LexError),
    #[error("Unexpected token: {0:?}, expected {1}")]
    Unexpected(Token, &'static str),
    #[error("Unexpected end of input")]
    UnexpectedEof,
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    ref_seq: u32,
}

impl Parser {
    pub fn new(input: &str) -> Result<Self, ParseError> {
        let tokens = Lexer::new(input).tokenize()?;
        Ok(Self {
            tokens,
            pos: 0,
            ref_seq: 0,
        })
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> &Token {
        let tok = self.tokens.get(self.pos).unwrap_or(&Token::Eof);
        self.pos += 1;
        tok
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        let tok = self.advance().clone();
        if tok == expected {
            Ok(())
        } else {
            Err(ParseError::Unexpected(tok, "specific token"))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.advance().clone() {
            Token::Ident(s) => Ok(s),
            tok => Err(ParseError::Unexpected(tok, "identifier")),
        }
    }

    /// Names may be bare identifiers or quoted strings ("order items").
    fn expect_name(&mut self) -> Result<String, ParseError> {
        match self.advance().clone() {
            Token::Ident(s) | Token::Str(s) => Ok(s),
            tok => Err(ParseError::Unexpected(tok, "name")),
        }
    }

    fn expect_string(&mut self) -> Result<String, ParseError> {
        match self.advance().clone() {
            Token::Str(s) => Ok(s),
            tok => Err(ParseError::Unexpected(tok, "string literal")),
        }
    }

    /// DBML keywords are case-insensitive.
    fn check_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), Token::Ident(s) if s.eq_ignore_ascii_case(kw))
    }

    fn next_ref_id(&mut self) -> u32 {
        self.ref_seq += 1;
        self.ref_seq
    }

    pub fn parse(&mut self) -> Result<Database, ParseError> {
        let mut schemas: Vec<Schema> = Vec::new();

        while *self.peek() != Token::Eof {
            if self.check_keyword("table") {
                self.advance();
                let (schema_name, table, inline_refs) = self.parse_table()?;
                let idx = ensure_schema(&mut schemas, schema_name.as_deref());
                schemas[idx].tables.push(table);
                for r in inline_refs {
                    attach_ref(&mut schemas, r);
                }
            } else if self.check_keyword("enum") {
                self.advance();
                let (schema_name, en) = self.parse_enum()?;
                let idx = ensure_schema(&mut schemas, schema_name.as_deref());
                schemas[idx].enums.push(en);
            } else if self.check_keyword("ref") {
                self.advance();
                for r in self.parse_ref()? {
                    attach_ref(&mut schemas, r);
                }
            } else if self.check_keyword("project") || self.check_keyword("tablegroup") {
                // Accepted for input compatibility, not modeled.
                self.advance();
                self.skip_braced()?;
            } else {
                return Err(ParseError::Unexpected(
                    self.peek().clone(),
                    "Table, Enum, Ref, Project, or TableGroup",
                ));
            }
        }

        Ok(Database { schemas })
    }

    /// `name` or `schema.name`.
    fn parse_qualified_name(&mut self) -> Result<(Option<String>, String), ParseError> {
        let first = self.expect_name()?;
        if *self.peek() == Token::Dot {
            self.advance();
            let second = self.expect_name()?;
            Ok((Some(first), second))
        } else {
            Ok((None, first))
        }
    }

    fn parse_table(&mut self) -> Result<(Option<String>, Table, Vec<Ref>), ParseError> {
        let (schema_name, name) = self.parse_qualified_name()?;

        let alias = if self.check_keyword("as") {
            self.advance();
            Some(self.expect_name()?)
        } else {
            None
        };

        // Table settings (headercolor etc.) are accepted and dropped.
        if *self.peek() == Token::LBracket {
            self.skip_settings()?;
        }

        self.expect(Token::LBrace)?;

        let mut fields = Vec::new();
        let mut note = None;
        let mut inline_refs = Vec::new();

        while *self.peek() != Token::RBrace {
            if *self.peek() == Token::Eof {
                return Err(ParseError::UnexpectedEof);
            }
            if self.check_keyword("note") && *self.peek_at(1) == Token::Colon {
                self.advance();
                self.advance();
                note = Some(self.expect_string()?);
            } else if self.check_keyword("indexes") && *self.peek_at(1) == Token::LBrace {
                self.advance();
                self.skip_braced()?;
            } else {
                let (field, inline_ref) = self.parse_field(schema_name.as_deref(), &name)?;
                fields.push(field);
                inline_refs.extend(inline_ref);
            }
        }

        self.expect(Token::RBrace)?;

        Ok((
            schema_name,
            Table {
                name,
                alias,
                note,
                fields,
            },
            inline_refs,
        ))
    }

    fn parse_field(
        &mut self,
        schema_name: Option<&str>,
        table_name: &str,
    ) -> Result<(Field, Option<Ref>), ParseError> {
        let name = self.expect_name()?;
        let field_type = self.parse_field_type()?;

        let mut field = Field {
            name,
            field_type,
            pk: false,
            not_null: None,
            unique: false,
            note: None,
            dbdefault: None,
        };

        let mut inline_ref = None;
        if *self.peek() == Token::LBracket {
            inline_ref = self.parse_field_settings(&mut field, schema_name, table_name)?;
        }

        Ok((field, inline_ref))
    }

    /// `int`, `varchar(255)`, `auth.status` - kept as one flat string.
    fn parse_field_type(&mut self) -> Result<FieldType, ParseError> {
        let mut type_name = self.expect_ident()?;

        if *self.peek() == Token::Dot {
            self.advance();
            type_name.push('.');
            type_name.push_str(&self.expect_ident()?);
        }

        if *self.peek() == Token::LParen {
            self.advance();
            let mut args: Vec<String> = Vec::new();
            loop {
                match self.advance().clone() {
                    Token::RParen => break,
                    Token::Num(n) => args.push(n),
                    Token::Ident(s) => args.push(s),
                    Token::Comma => {}
                    Token::Eof => return Err(ParseError::UnexpectedEof),
                    tok => return Err(ParseError::Unexpected(tok, "type argument")),
                }
            }
            type_name.push('(');
            type_name.push_str(&args.join(","));
            type_name.push(')');
        }

        Ok(FieldType { type_name })
    }

    fn parse_field_settings(
        &mut self,
        field: &mut Field,
        schema_name: Option<&str>,
        table_name: &str,
    ) -> Result<Option<Ref>, ParseError> {
        self.expect(Token::LBracket)?;
        let mut inline_ref = None;

        loop {
            match self.peek().clone() {
                Token::RBracket => {
                    self.advance();
                    break;
                }
                Token::Comma => {
                    self.advance();
                }
                Token::Eof => return Err(ParseError::UnexpectedEof),
                Token::Ident(word) => {
                    self.advance();
                    match word.to_ascii_lowercase().as_str() {
                        "pk" => field.pk = true,
                        "primary" => {
                            if self.check_keyword("key") {
                                self.advance();
                            }
                            field.pk = true;
                        }
                        "not" => {
                            if self.check_keyword("null") {
                                self.advance();
                                field.not_null = Some(true);
                            }
                        }
                        "null" => field.not_null = Some(false),
                        "unique" => field.unique = true,
                        "increment" => {}
                        "default" => {
                            self.expect(Token::Colon)?;
                            field.dbdefault = Some(self.parse_default_value()?);
                        }
                        "note" => {
                            self.expect(Token::Colon)?;
                            field.note = Some(self.expect_string()?);
                        }
                        "ref" => {
                            self.expect(Token::Colon)?;
                            inline_ref =
                                Some(self.parse_inline_ref(field, schema_name, table_name)?);
                        }
                        _ => self.skip_setting_value(),
                    }
                }
                tok => return Err(ParseError::Unexpected(tok, "field setting")),
            }
        }

        Ok(inline_ref)
    }

    /// Unknown settings tolerate both bare flags and `key: value` pairs.
    fn skip_setting_value(&mut self) {
        if *self.peek() == Token::Colon {
            self.advance();
            self.advance();
        }
    }

    fn parse_default_value(&mut self) -> Result<DefaultValue, ParseError> {
        match self.advance().clone() {
            Token::Num(n) => Ok(DefaultValue {
                value: n,
                kind: DefaultKind::Number,
            }),
            Token::Dash => match self.advance().clone() {
                Token::Num(n) => Ok(DefaultValue {
                    value: format!("-{}", n),
                    kind: DefaultKind::Number,
                }),
                tok => Err(ParseError::Unexpected(tok, "number")),
            },
            Token::Str(s) => Ok(DefaultValue {
                value: s,
                kind: DefaultKind::String,
            }),
            Token::Expr(e) => Ok(DefaultValue {
                value: e,
                kind: DefaultKind::Expression,
            }),
            Token::Ident(s) => {
                let kind = if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false") {
                    DefaultKind::Boolean
                } else {
                    DefaultKind::String
                };
                Ok(DefaultValue { value: s, kind })
            }
            tok => Err(ParseError::Unexpected(tok, "default value")),
        }
    }

    /// `ref: > users.id` inside a field settings block becomes a
    /// document-level ref whose `from` side is the current field.
    fn parse_inline_ref(
        &mut self,
        field: &Field,
        schema_name: Option<&str>,
        table_name: &str,
    ) -> Result<Ref, ParseError> {
        let (from_rel, to_rel) = self.parse_relation_op()?;
        let (to_schema, to_table, to_fields) = self.parse_endpoint()?;
        let id = self.next_ref_id();

        Ok(Ref {
            id,
            name: None,
            endpoints: vec![
                RefEndpoint {
                    schema_name: schema_name.map(str::to_string),
                    table_name: table_name.to_string(),
                    field_names: vec![field.name.clone()],
                    relation: from_rel,
                },
                RefEndpoint {
                    schema_name: to_schema,
                    table_name: to_table,
                    field_names: to_fields,
                    relation: to_rel,
                },
            ],
        })
    }

    fn parse_relation_op(&mut self) -> Result<(Relation, Relation), ParseError> {
        match self.advance().clone() {
            Token::Lt => Ok((Relation::One, Relation::Many)),
            Token::Gt => Ok((Relation::Many, Relation::One)),
            Token::Dash => Ok((Relation::One, Relation::One)),
            Token::LtGt => Ok((Relation::Many, Relation::Many)),
            tok => Err(ParseError::Unexpected(tok, "relation operator")),
        }
    }

    /// `table.col`, `schema.table.col`, `table.(a, b)`, `schema.table.(a, b)`.
    fn parse_endpoint(&mut self) -> Result<(Option<String>, String, Vec<String>), ParseError> {
        let mut parts = vec![self.expect_name()?];
        let mut composite: Option<Vec<String>> = None;

        while *self.peek() == Token::Dot {
            self.advance();
            if *self.peek() == Token::LParen {
                self.advance();
                let mut list = vec![self.expect_name()?];
                while *self.peek() == Token::Comma {
                    self.advance();
                    list.push(self.expect_name()?);
                }
                self.expect(Token::RParen)?;
                composite = Some(list);
                break;
            }
            parts.push(self.expect_name()?);
        }

        match composite {
            Some(fields) => match parts.len() {
                1 => Ok((None, parts.swap_remove(0), fields)),
                2 => {
                    let table = parts.pop().unwrap_or_default();
                    let schema = parts.pop();
                    Ok((schema, table, fields))
                }
                _ => Err(ParseError::Unexpected(
                    self.peek().clone(),
                    "qualified column",
                )),
            },
            None => match parts.len() {
                2 => {
                    let field = parts.pop().unwrap_or_default();
                    let table = parts.pop().unwrap_or_default();
                    Ok((None, table, vec![field]))
                }
                3 => {
                    let field = parts.pop().unwrap_or_default();
                    let table = parts.pop().unwrap_or_default();
                    let schema = parts.pop();
                    Ok((schema, table, vec![field]))
                }
                _ => Err(ParseError::Unexpected(
                    self.peek().clone(),
                    "qualified column",
                )),
            },
        }
    }

    /// `Ref [name]: a.b < c.d [settings]` or `Ref [name] { ... }`.
    fn parse_ref(&mut self) -> Result<Vec<Ref>, ParseError> {
        let name = match self.peek().clone() {
            Token::Ident(s) => {
                self.advance();
                Some(s)
            }
            _ => None,
        };

        match self.advance().clone() {
            Token::Colon => Ok(vec![self.parse_ref_body(name)?]),
            Token::LBrace => {
                let mut refs = Vec::new();
                while *self.peek() != Token::RBrace {
                    if *self.peek() == Token::Eof {
                        return Err(ParseError::UnexpectedEof);
                    }
                    refs.push(self.parse_ref_body(None)?);
                }
                self.expect(Token::RBrace)?;
                Ok(refs)
            }
            tok => Err(ParseError::Unexpected(tok, "':' or '{'")),
        }
    }

    fn parse_ref_body(&mut self, name: Option<String>) -> Result<Ref, ParseError> {
        let (from_schema, from_table, from_fields) = self.parse_endpoint()?;
        let (from_rel, to_rel) = self.parse_relation_op()?;
        let (to_schema, to_table, to_fields) = self.parse_endpoint()?;

        // Ref settings (delete/update actions) are accepted and dropped.
        if *self.peek() == Token::LBracket {
            self.skip_settings()?;
        }

        let id = self.next_ref_id();
        Ok(Ref {
            id,
            name,
            endpoints: vec![
                RefEndpoint {
                    schema_name: from_schema,
                    table_name: from_table,
                    field_names: from_fields,
                    relation: from_rel,
                },
                RefEndpoint {
                    schema_name: to_schema,
                    table_name: to_table,
                    field_names: to_fields,
                    relation: to_rel,
                },
            ],
        })
    }

    fn parse_enum(&mut self) -> Result<(Option<String>, Enum), ParseError> {
        let (schema_name, name) = self.parse_qualified_name()?;
        self.expect(Token::LBrace)?;

        let mut values = Vec::new();
        while *self.peek() != Token::RBrace {
            if *self.peek() == Token::Eof {
                return Err(ParseError::UnexpectedEof);
            }
            let value_name = self.expect_name()?;
            let mut note = None;
            if *self.peek() == Token::LBracket {
                self.advance();
                while *self.peek() != Token::RBracket {
                    if *self.peek() == Token::Eof {
                        return Err(ParseError::UnexpectedEof);
                    }
                    if self.check_keyword("note") {
                        self.advance();
                        self.expect(Token::Colon)?;
                        note = Some(self.expect_string()?);
                    } else {
                        self.advance();
                    }
                }
                self.expect(Token::RBracket)?;
            }
            values.push(EnumValue {
                id: values.len() as u32 + 1,
                name: value_name,
                note,
            });
        }

        self.expect(Token::RBrace)?;
        Ok((schema_name, Enum { name, values }))
    }

    /// Skip `[ ... ]` without interpreting it.
    fn skip_settings(&mut self) -> Result<(), ParseError> {
        self.expect(Token::LBracket)?;
        loop {
            match self.advance().clone() {
                Token::RBracket => return Ok(()),
                Token::Eof => return Err(ParseError::UnexpectedEof),
                _ => {}
            }
        }
    }

    /// Skip everything up to and including a balanced `{ ... }`.
    fn skip_braced(&mut self) -> Result<(), ParseError> {
        while *self.peek() != Token::LBrace {
            if *self.peek() == Token::Eof {
                return Err(ParseError::UnexpectedEof);
            }
            self.advance();
        }
        self.advance();
        let mut depth = 1usize;
        loop {
            match self.advance().clone() {
                Token::LBrace => depth += 1,
                Token::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Token::Eof => return Err(ParseError::UnexpectedEof),
                _ => {}
            }
        }
    }
}

fn ensure_schema(schemas: &mut Vec<Schema>, name: Option<&str>) -> usize {
    let name = name.unwrap_or(DEFAULT_SCHEMA);
    if let Some(idx) = schemas.iter().position(|s| s.name == name) {
        return idx;
    }
    let note = (name == DEFAULT_SCHEMA).then(|| DEFAULT_SCHEMA_NOTE.to_string());
    schemas.push(Schema {
        name: name.to_string(),
        note,
        tables: Vec::new(),
        enums: Vec::new(),
        refs: Vec::new(),
    });
    schemas.len() - 1
}

/// A ref lives in its `from` endpoint's schema.
fn attach_ref(schemas: &mut Vec<Schema>, r: Ref) {
    let schema_name = r.endpoints.first().and_then(|e| e.schema_name.clone());
    let idx = ensure_schema(schemas, schema_name.as_deref());
    schemas[idx].refs.push(r);
}
