//! Record declarations loaded from a JSON document.
//!
//! ```json
//! { "records": [
//!     { "name": "Child", "fields": [
//!         { "name": "a", "type": "int" },
//!         { "name": "b", "type": "str | null" },
//!         { "name": "c", "type": "str", "default": "hello world" } ] },
//!     { "name": "Parent", "fields": [
//!         { "name": "children", "type": "list[optional[Child]]" } ] } ] }
//! ```
//!
//! Type text: `any`, `null`, `bool`, `int`, `float`, `str`, `list[T]`,
//! `map[K, V]`, `optional[T]`, `A | B`, parentheses, and the name of any
//! record declared earlier in the same document.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::data::Data;
use crate::error::SchemaError;
use crate::path_de::from_str_with_path;
use crate::record::{RecordRef, RecordType};
use crate::ty::TypeExpr;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaDoc {
    records: Vec<RecordDecl>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecordDecl {
    name: String,
    #[serde(default)]
    fields: Vec<FieldDecl>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldDecl {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    /// `Some(Value::Null)` for an explicit `"default": null`.
    #[serde(default, deserialize_with = "present")]
    default: Option<Value>,
}

fn present<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(de).map(Some)
}

#[derive(Debug, Default, Clone)]
pub struct Schema {
    records: IndexMap<String, RecordRef>,
}

impl Schema {
    pub fn from_json(src: &str) -> Result<Self, SchemaError> {
        let doc: SchemaDoc = from_str_with_path(src)?;
        let mut schema = Schema::default();
        for decl in doc.records {
            if schema.records.contains_key(&decl.name) {
                return Err(SchemaError::DuplicateRecord(decl.name));
            }
            let mut builder = RecordType::builder(decl.name.clone());
            for field in decl.fields {
                let ty = schema.parse_type(&field.ty).map_err(|err| match err {
                    SchemaError::UnknownRecord { name, .. } => SchemaError::UnknownRecord {
                        record: decl.name.clone(),
                        field: field.name.clone(),
                        name,
                    },
                    other => other,
                })?;
                builder = match field.default {
                    Some(default) => builder.field_with_default(field.name, ty, Data::from(default)),
                    None => builder.field(field.name, ty),
                };
            }
            schema.records.insert(decl.name, builder.build());
        }
        Ok(schema)
    }

    pub fn get(&self, name: &str) -> Option<&RecordRef> {
        self.records.get(name)
    }

    pub fn records(&self) -> impl Iterator<Item = &RecordRef> {
        self.records.values()
    }

    /// Parses type text against the records declared so far.
    pub fn parse_type(&self, text: &str) -> Result<TypeExpr, SchemaError> {
        let invalid = |message: String| SchemaError::Type {
            text: text.to_owned(),
            message,
        };
        let tokens = tokenize(text).map_err(invalid)?;
        let mut parser = TypeParser {
            text,
            tokens: &tokens,
            pos: 0,
            schema: self,
        };
        let ty = parser.union()?;
        if let Some(token) = parser.peek() {
            return Err(invalid(format!("unexpected `{token}` after type")));
        }
        Ok(ty)
    }
}

// ------------------------------- Type text -------------------------------- //

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'s> {
    Ident(&'s str),
    Punct(char), // one of []|,()
}

impl std::fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Ident(name) => f.write_str(name),
            Token::Punct(c) => write!(f, "{c}"),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<Token<'_>>, String> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '[' | ']' | '|' | ',' | '(' | ')' => tokens.push(Token::Punct(c)),
            c if c.is_alphanumeric() || c == '_' => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, next)) = chars.peek() {
                    if !(next.is_alphanumeric() || next == '_') {
                        break;
                    }
                    end = i + next.len_utf8();
                    chars.next();
                }
                tokens.push(Token::Ident(&text[start..end]));
            }
            other => return Err(format!("unexpected character `{other}`")),
        }
    }
    Ok(tokens)
}

struct TypeParser<'t, 's> {
    text: &'s str,
    tokens: &'t [Token<'s>],
    pos: usize,
    schema: &'t Schema,
}

impl<'s> TypeParser<'_, 's> {
    fn peek(&self) -> Option<Token<'s>> {
        self.tokens.get(self.pos).copied()
    }

    fn error(&self, message: String) -> SchemaError {
        SchemaError::Type {
            text: self.text.to_owned(),
            message,
        }
    }

    fn expect(&mut self, punct: char) -> Result<(), SchemaError> {
        match self.peek() {
            Some(Token::Punct(c)) if c == punct => {
                self.pos += 1;
                Ok(())
            }
            Some(other) => Err(self.error(format!("expected `{punct}`, found `{other}`"))),
            None => Err(self.error(format!("expected `{punct}`, found end of input"))),
        }
    }

    fn union(&mut self) -> Result<TypeExpr, SchemaError> {
        let mut arms = vec![self.term()?];
        while self.peek() == Some(Token::Punct('|')) {
            self.pos += 1;
            arms.push(self.term()?);
        }
        Ok(TypeExpr::union(arms))
    }

    fn term(&mut self) -> Result<TypeExpr, SchemaError> {
        let token = self.peek();
        self.pos += 1;
        match token {
            Some(Token::Punct('(')) => {
                let inner = self.union()?;
                self.expect(')')?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => self.named(name),
            Some(other) => Err(self.error(format!("expected a type, found `{other}`"))),
            None => Err(self.error("expected a type, found end of input".into())),
        }
    }

    fn named(&mut self, name: &'s str) -> Result<TypeExpr, SchemaError> {
        let ty = match name {
            "any" => TypeExpr::Any,
            "null" => TypeExpr::Null,
            "bool" => TypeExpr::Bool,
            "int" => TypeExpr::Int,
            "float" => TypeExpr::Float,
            "str" => TypeExpr::Str,
            "list" => {
                self.expect('[')?;
                let item = self.union()?;
                self.expect(']')?;
                TypeExpr::list(item)
            }
            "optional" => {
                self.expect('[')?;
                let inner = self.union()?;
                self.expect(']')?;
                TypeExpr::optional(inner)
            }
            "map" => {
                self.expect('[')?;
                let key = self.union()?;
                self.expect(',')?;
                let value = self.union()?;
                self.expect(']')?;
                TypeExpr::map(key, value)
            }
            record => match self.schema.get(record) {
                Some(ty) => TypeExpr::record(ty),
                None => {
                    return Err(SchemaError::UnknownRecord {
                        record: String::new(),
                        field: String::new(),
                        name: record.to_owned(),
                    });
                }
            },
        };
        Ok(ty)
    }
}
