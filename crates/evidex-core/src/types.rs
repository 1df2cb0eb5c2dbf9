//! Domain types shared by the keyword, vector and hybrid engines.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

pub type ChunkId = String;
pub type OwnerId = String;

/// Open key/value metadata attached to a chunk. Ordered so that serialized
/// forms and filter evaluation are deterministic.
pub type Metadata = BTreeMap<String, MetaValue>;

/// Exact-match conjunction over metadata keys.
pub type MetaFilter = BTreeMap<String, MetaValue>;

/// Content kind of a chunk. Only used to format citations.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Slide,
    Transcript,
    Url,
    #[default]
    Text,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::Slide => "slide",
            ChunkKind::Transcript => "transcript",
            ChunkKind::Url => "url",
            ChunkKind::Text => "text",
        }
    }
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of value kinds a metadata entry may hold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<String>),
}

impl MetaValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Reads a scalar from text as written on a command line or in a query
    /// string: bool, then integer, then finite float, else string.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "true" => return MetaValue::Bool(true),
            "false" => return MetaValue::Bool(false),
            _ => {}
        }
        if let Ok(i) = raw.parse::<i64>() {
            return MetaValue::Int(i);
        }
        match raw.parse::<f64>() {
            Ok(x) if x.is_finite() => MetaValue::Float(x),
            _ => MetaValue::Str(raw.to_string()),
        }
    }

    /// Floats must be finite; everything else is always valid.
    pub fn is_valid(&self) -> bool {
        match self {
            MetaValue::Float(f) => f.is_finite(),
            _ => true,
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Bool(b) => write!(f, "{b}"),
            MetaValue::Int(i) => write!(f, "{i}"),
            MetaValue::Float(x) => write!(f, "{x}"),
            MetaValue::Str(s) => f.write_str(s),
            MetaValue::List(items) => f.write_str(&items.join(",")),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::Str(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        MetaValue::Str(s)
    }
}

impl From<i64> for MetaValue {
    fn from(i: i64) -> Self {
        MetaValue::Int(i)
    }
}

impl From<i32> for MetaValue {
    fn from(i: i32) -> Self {
        MetaValue::Int(i64::from(i))
    }
}

impl From<f64> for MetaValue {
    fn from(x: f64) -> Self {
        MetaValue::Float(x)
    }
}

impl From<bool> for MetaValue {
    fn from(b: bool) -> Self {
        MetaValue::Bool(b)
    }
}

impl From<Vec<String>> for MetaValue {
    fn from(items: Vec<String>) -> Self {
        MetaValue::List(items)
    }
}

/// Returns true when every filter entry is present in `meta` with an equal value.
pub fn matches_filter(meta: &Metadata, filter: &MetaFilter) -> bool {
    filter.iter().all(|(k, v)| meta.get(k) == Some(v))
}

/// A unit of retrievable text owned by one logical entity.
///
/// - `id`: stable, unique within the owner
/// - `owner_id`: entity/tenant the chunk belongs to
/// - `kind`/`source`/`location_hint`: citation inputs (page or timestamp)
/// - `metadata`: open map, also used for vector-index filtering
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub id: ChunkId,
    pub owner_id: OwnerId,
    pub text: String,
    #[serde(default)]
    pub kind: ChunkKind,
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_hint: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Chunk {
    pub fn new(id: impl Into<String>, owner_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            text: text.into(),
            kind: ChunkKind::Text,
            source: String::new(),
            location_hint: None,
            metadata: Metadata::new(),
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: ChunkKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    #[must_use]
    pub fn with_location(mut self, hint: impl Into<String>) -> Self {
        self.location_hint = Some(hint.into());
        self
    }

    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Checks the invariants the engines rely on.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::Contract("chunk id must not be empty".into()));
        }
        for (key, value) in &self.metadata {
            if key.is_empty() {
                return Err(Error::Contract(format!("chunk {}: empty metadata key", self.id)));
            }
            if !value.is_valid() {
                return Err(Error::Contract(format!("chunk {}: metadata '{}' is not finite", self.id, key)));
            }
        }
        Ok(())
    }
}

/// Indicates which engine produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Vector,
    Text,
}

/// The minimal surface returned by all engines.
///
/// `id` matches `Chunk::id`. `score` is engine-specific but
/// higher is always better. `source` labels the origin engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub id: ChunkId,
    pub score: f32,
    pub source: SourceKind,
}

impl SearchHit {
    pub fn new(id: impl Into<String>, score: f32, source: SourceKind) -> Self {
        Self { id: id.into(), score, source }
    }
}

/// A ranked passage handed to the answer-generation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evidence {
    pub id: ChunkId,
    pub kind: ChunkKind,
    /// `p12`, `t=03:21`, or the raw source string.
    pub location: String,
    pub snippet: String,
    /// Fused score clamped to `[0, 1]`.
    pub confidence: f32,
}
