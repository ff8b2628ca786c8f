use crate::error::{DocShardError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Field-name -> value mapping handed to the store. Keeps insertion order.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Logical document identifier, unique within a tenant and entity type.
///
/// Ranges over `0..=i64::MAX` so it always fits the `long` identity column.
/// Build one with [`DocumentId::new`] or `TryFrom` from the looser forms an
/// API layer receives (`u64`, `i64`, decimal strings, JSON numbers); every
/// path rejects negative, non-integer and out-of-range input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct DocumentId(u64);

impl DocumentId {
    /// Largest accepted id, `i64::MAX`.
    pub const MAX: u64 = i64::MAX as u64;

    pub fn new(id: u64) -> Result<Self> {
        if id > Self::MAX {
            return Err(DocShardError::InvalidDocumentId(format!(
                "{} exceeds the maximum id {}",
                id,
                Self::MAX
            )));
        }
        Ok(DocumentId(id))
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<DocumentId> for u64 {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

impl TryFrom<u64> for DocumentId {
    type Error = DocShardError;

    fn try_from(id: u64) -> Result<Self> {
        DocumentId::new(id)
    }
}

impl From<u32> for DocumentId {
    fn from(id: u32) -> Self {
        DocumentId(id as u64)
    }
}

impl TryFrom<i64> for DocumentId {
    type Error = DocShardError;

    fn try_from(id: i64) -> Result<Self> {
        u64::try_from(id)
            .map(DocumentId)
            .map_err(|_| DocShardError::InvalidDocumentId(format!("{} is negative", id)))
    }
}

impl TryFrom<i32> for DocumentId {
    type Error = DocShardError;

    fn try_from(id: i32) -> Result<Self> {
        DocumentId::try_from(id as i64)
    }
}

impl FromStr for DocumentId {
    type Err = DocShardError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.starts_with('-') {
            return Err(DocShardError::InvalidDocumentId(format!(
                "'{}' is negative",
                s
            )));
        }
        let id = trimmed
            .parse::<u64>()
            .map_err(|_| DocShardError::InvalidDocumentId(format!("'{}' is not an integer", s)))?;
        DocumentId::new(id)
    }
}

impl TryFrom<&str> for DocumentId {
    type Error = DocShardError;

    fn try_from(s: &str) -> Result<Self> {
        s.parse()
    }
}

impl TryFrom<&serde_json::Value> for DocumentId {
    type Error = DocShardError;

    fn try_from(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    DocumentId::new(u)
                } else if let Some(i) = n.as_i64() {
                    DocumentId::try_from(i)
                } else {
                    Err(DocShardError::InvalidDocumentId(format!(
                        "{} is not an integer",
                        n
                    )))
                }
            }
            serde_json::Value::String(s) => s.parse(),
            other => Err(DocShardError::InvalidDocumentId(format!(
                "expected integer, got {}",
                json_type_name(other)
            ))),
        }
    }
}

// Characters OpenSearch refuses in index names, plus whitespace, ':' and '%'.
static TENANT_FORBIDDEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/*?"<>|,#:%\s]"#).expect("static regex"));

/// Tenant ("virtual organization") name, case-folded for physical naming.
///
/// The original spelling is kept for display; [`TenantId::normalized`] is
/// what ends up in index names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantId {
    raw: String,
    normalized: String,
}

impl TenantId {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(DocShardError::InvalidTenant(
                "tenant must not be empty".to_string(),
            ));
        }
        if TENANT_FORBIDDEN.is_match(raw) {
            return Err(DocShardError::InvalidTenant(format!(
                "'{}' contains characters not allowed in index names",
                raw
            )));
        }
        if raw.starts_with(['_', '-', '+']) {
            return Err(DocShardError::InvalidTenant(format!(
                "'{}' must not start with '_', '-' or '+'",
                raw
            )));
        }
        Ok(TenantId {
            raw: raw.to_string(),
            normalized: raw.to_lowercase(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for TenantId {
    type Err = DocShardError;

    fn from_str(s: &str) -> Result<Self> {
        TenantId::parse(s)
    }
}

pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        serde_json::Value::Number(_) => "float",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
