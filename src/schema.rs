//! Entity schemas: the declared field-name -> storage-type contract of one
//! logical record kind.
//!
//! A schema is built once (usually into a `static`) and shared read-only by
//! every tenant and every upsert.

use crate::error::{DocShardError, Result};
use crate::types::{json_type_name, Payload};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Storage type of a declared field, named after the store's mapping types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Long,
    Integer,
    Double,
    Float,
    /// Epoch milliseconds or a date string.
    Date,
    /// Exact-match string.
    Keyword,
    /// Analyzed free text.
    Text,
    Boolean,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Long => "long",
            FieldType::Integer => "integer",
            FieldType::Double => "double",
            FieldType::Float => "float",
            FieldType::Date => "date",
            FieldType::Keyword => "keyword",
            FieldType::Text => "text",
            FieldType::Boolean => "boolean",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (FieldType::Long | FieldType::Date, Value::Number(n)) => n.is_i64(),
            (FieldType::Integer, Value::Number(n)) => n
                .as_i64()
                .is_some_and(|i| i32::try_from(i).is_ok()),
            (FieldType::Double | FieldType::Float, Value::Number(_)) => true,
            (FieldType::Date, Value::String(_)) => true,
            (FieldType::Keyword | FieldType::Text, Value::String(_)) => true,
            (FieldType::Boolean, Value::Bool(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do with payload keys the schema does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownFieldPolicy {
    /// Fail the write with [`DocShardError::SchemaViolation`].
    #[default]
    Reject,
    /// Hand undeclared fields to the store untyped.
    Passthrough,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub field_type: FieldType,
}

static PREFIX_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_]*$").expect("static regex"));

#[derive(Debug, Clone)]
pub struct EntitySchema {
    prefix: String,
    fields: IndexMap<String, FieldType>,
    identity_field: String,
    timestamp_field: String,
    unknown_fields: UnknownFieldPolicy,
}

impl EntitySchema {
    pub fn builder(prefix: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(prefix)
    }

    /// Entity-type name, also the physical index-name prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn identity_field(&self) -> &str {
        &self.identity_field
    }

    pub fn timestamp_field(&self) -> &str {
        &self.timestamp_field
    }

    pub fn unknown_fields(&self) -> UnknownFieldPolicy {
        self.unknown_fields
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        name == self.identity_field || name == self.timestamp_field
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields.get(name).copied()
    }

    /// Declared fields in declaration order, reserved fields first.
    pub fn fields(&self) -> impl Iterator<Item = FieldDefinition> + '_ {
        self.fields.iter().map(|(name, field_type)| FieldDefinition {
            name: name.clone(),
            field_type: *field_type,
        })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check every payload key against the declaration.
    ///
    /// Reserved keys are accepted as-is since the upsert path overwrites
    /// them. Declared keys must carry a value compatible with their type;
    /// `null` is always accepted.
    pub fn validate(&self, payload: &Payload) -> Result<()> {
        for (key, value) in payload {
            if self.is_reserved(key) {
                continue;
            }
            match self.fields.get(key) {
                Some(field_type) => {
                    if !field_type.accepts(value) {
                        return Err(DocShardError::TypeMismatch {
                            field: key.clone(),
                            expected: field_type.to_string(),
                            actual: json_type_name(value).to_string(),
                        });
                    }
                }
                None => {
                    if self.unknown_fields == UnknownFieldPolicy::Reject {
                        return Err(DocShardError::SchemaViolation {
                            entity: self.prefix.clone(),
                            field: key.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Field mapping in the store's index-creation format.
    pub fn mapping(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, field_type)| (name.clone(), json!({ "type": field_type.as_str() })))
            .collect();
        let dynamic = match self.unknown_fields {
            UnknownFieldPolicy::Reject => "strict",
            UnknownFieldPolicy::Passthrough => "true",
        };
        json!({
            "dynamic": dynamic,
            "properties": properties,
        })
    }
}

/// Builder for [`EntitySchema`].
///
/// The identity and write-timestamp fields are reserved: the upsert path
/// always overwrites them with the document id and the server write time,
/// whatever the caller sent. Declare them with [`SchemaBuilder::identity_field`]
/// and [`SchemaBuilder::timestamp_field`]; `add_field` refuses their names.
pub struct SchemaBuilder {
    prefix: String,
    identity_field: String,
    timestamp_field: String,
    fields: Vec<FieldDefinition>,
    unknown_fields: UnknownFieldPolicy,
}

impl SchemaBuilder {
    pub const DEFAULT_IDENTITY_FIELD: &'static str = "id";
    pub const DEFAULT_TIMESTAMP_FIELD: &'static str = "timestamp";

    pub fn new(prefix: impl Into<String>) -> Self {
        SchemaBuilder {
            prefix: prefix.into(),
            identity_field: Self::DEFAULT_IDENTITY_FIELD.to_string(),
            timestamp_field: Self::DEFAULT_TIMESTAMP_FIELD.to_string(),
            fields: Vec::new(),
            unknown_fields: UnknownFieldPolicy::Reject,
        }
    }

    /// Reserved field carrying the document id (mapped as `long`).
    pub fn identity_field(mut self, name: impl Into<String>) -> Self {
        self.identity_field = name.into();
        self
    }

    /// Reserved field carrying the server write time in epoch millis (mapped as `date`).
    pub fn timestamp_field(mut self, name: impl Into<String>) -> Self {
        self.timestamp_field = name.into();
        self
    }

    pub fn add_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(FieldDefinition {
            name: name.into(),
            field_type,
        });
        self
    }

    pub fn unknown_fields(mut self, policy: UnknownFieldPolicy) -> Self {
        self.unknown_fields = policy;
        self
    }

    pub fn build(self) -> Result<EntitySchema> {
        if !PREFIX_PATTERN.is_match(&self.prefix) {
            return Err(DocShardError::InvalidSchema(format!(
                "prefix '{}' must be non-empty lowercase [a-z0-9_]",
                self.prefix
            )));
        }
        check_field_name(&self.identity_field)?;
        check_field_name(&self.timestamp_field)?;
        if self.identity_field == self.timestamp_field {
            return Err(DocShardError::InvalidSchema(format!(
                "identity and timestamp fields are both '{}'",
                self.identity_field
            )));
        }

        let mut fields = IndexMap::with_capacity(self.fields.len() + 2);
        fields.insert(self.identity_field.clone(), FieldType::Long);
        fields.insert(self.timestamp_field.clone(), FieldType::Date);

        for field in self.fields {
            check_field_name(&field.name)?;
            if field.name == self.identity_field || field.name == self.timestamp_field {
                return Err(DocShardError::InvalidSchema(format!(
                    "'{}' is a reserved field of '{}'",
                    field.name, self.prefix
                )));
            }
            if fields.insert(field.name.clone(), field.field_type).is_some() {
                return Err(DocShardError::InvalidSchema(format!(
                    "field '{}' declared twice in '{}'",
                    field.name, self.prefix
                )));
            }
        }

        Ok(EntitySchema {
            prefix: self.prefix,
            fields,
            identity_field: self.identity_field,
            timestamp_field: self.timestamp_field,
            unknown_fields: self.unknown_fields,
        })
    }
}

fn check_field_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DocShardError::InvalidSchema(
            "field name must not be empty".to_string(),
        ));
    }
    if name.starts_with('_') {
        return Err(DocShardError::InvalidSchema(format!(
            "field '{}' uses the '_' metadata namespace",
            name
        )));
    }
    Ok(())
}
