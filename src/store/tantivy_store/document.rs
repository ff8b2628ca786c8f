use crate::error::{DocShardError, Result};
use crate::schema::{EntitySchema, FieldType};
use crate::types::{DocumentId, Payload};
use serde_json::Value;
use std::collections::HashMap;
use tantivy::schema::{
    Field, FieldType as TantivyFieldType, OwnedValue, Schema as TantivySchema, FAST, INDEXED,
    STORED, STRING, TEXT,
};
use tantivy::{TantivyDocument, Term};

pub const ID_FIELD: &str = "_id";
pub const SOURCE_FIELD: &str = "_source";

/// Translate an entity schema into a Tantivy schema.
///
/// Every declared field gets a typed, indexed column; the full merged
/// document is kept as JSON in `_source` so undeclared passthrough fields and
/// date strings survive a round trip.
pub fn build_tantivy_schema(schema: &EntitySchema) -> TantivySchema {
    let mut builder = TantivySchema::builder();

    builder.add_text_field(ID_FIELD, STRING | STORED);
    builder.add_text_field(SOURCE_FIELD, STORED);

    for field in schema.fields() {
        match field.field_type {
            FieldType::Long | FieldType::Integer | FieldType::Date => {
                builder.add_i64_field(&field.name, INDEXED | FAST);
            }
            FieldType::Double | FieldType::Float => {
                builder.add_f64_field(&field.name, INDEXED | FAST);
            }
            FieldType::Keyword => {
                builder.add_text_field(&field.name, STRING);
            }
            FieldType::Text => {
                builder.add_text_field(&field.name, TEXT);
            }
            FieldType::Boolean => {
                builder.add_bool_field(&field.name, INDEXED | FAST);
            }
        }
    }

    builder.build()
}

#[derive(Debug, Clone, Copy)]
enum Column {
    I64,
    F64,
    Str,
    Bool,
}

/// Converts between stored payloads and Tantivy documents of one index.
///
/// Built from the Tantivy schema alone, so it works for indices reopened
/// from disk as well as freshly created ones.
pub struct DocumentConverter {
    id_field: Field,
    source_field: Field,
    columns: HashMap<String, (Field, Column)>,
}

impl DocumentConverter {
    pub fn new(tantivy_schema: &TantivySchema) -> Result<Self> {
        let id_field = tantivy_schema
            .get_field(ID_FIELD)
            .map_err(|_| DocShardError::Tantivy(format!("missing {} field", ID_FIELD)))?;
        let source_field = tantivy_schema
            .get_field(SOURCE_FIELD)
            .map_err(|_| DocShardError::Tantivy(format!("missing {} field", SOURCE_FIELD)))?;

        let mut columns = HashMap::new();
        for (field, entry) in tantivy_schema.fields() {
            if field == id_field || field == source_field {
                continue;
            }
            let column = match entry.field_type() {
                TantivyFieldType::I64(_) => Column::I64,
                TantivyFieldType::F64(_) => Column::F64,
                TantivyFieldType::Str(_) => Column::Str,
                TantivyFieldType::Bool(_) => Column::Bool,
                _ => continue,
            };
            columns.insert(entry.name().to_string(), (field, column));
        }

        Ok(DocumentConverter {
            id_field,
            source_field,
            columns,
        })
    }

    pub fn id_term(&self, doc_id: DocumentId) -> Term {
        Term::from_field_text(self.id_field, &doc_id.to_string())
    }

    pub fn to_tantivy(&self, doc_id: DocumentId, source: &Payload) -> Result<TantivyDocument> {
        let mut tantivy_doc = TantivyDocument::new();
        tantivy_doc.add_text(self.id_field, doc_id.to_string());
        tantivy_doc.add_text(self.source_field, serde_json::to_string(source)?);

        for (name, value) in source {
            let Some(&(field, column)) = self.columns.get(name) else {
                continue;
            };
            match (column, value) {
                (Column::I64, Value::Number(n)) => {
                    let i = n.as_i64().ok_or_else(|| DocShardError::TypeMismatch {
                        field: name.clone(),
                        expected: "i64".to_string(),
                        actual: n.to_string(),
                    })?;
                    tantivy_doc.add_i64(field, i);
                }
                (Column::F64, Value::Number(n)) => {
                    let f = n.as_f64().ok_or_else(|| DocShardError::TypeMismatch {
                        field: name.clone(),
                        expected: "f64".to_string(),
                        actual: n.to_string(),
                    })?;
                    tantivy_doc.add_f64(field, f);
                }
                (Column::Str, Value::String(s)) => tantivy_doc.add_text(field, s),
                (Column::Bool, Value::Bool(b)) => tantivy_doc.add_bool(field, *b),
                // nulls and date strings only live in _source
                _ => {}
            }
        }

        Ok(tantivy_doc)
    }

    pub fn from_tantivy(&self, tantivy_doc: &TantivyDocument) -> Result<Payload> {
        let source = tantivy_doc
            .get_first(self.source_field)
            .and_then(|v| {
                let owned: OwnedValue = v.into();
                match owned {
                    OwnedValue::Str(s) => Some(s),
                    _ => None,
                }
            })
            .ok_or_else(|| DocShardError::InvalidDocument(format!("missing {}", SOURCE_FIELD)))?;

        Ok(serde_json::from_str(&source)?)
    }
}
