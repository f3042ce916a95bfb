use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;

use crate::error::{Result, StudioError};

/// One output of a generation: a remote URL or the image bytes themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ResultRef {
    Url(String),
    Inline(#[serde(serialize_with = "serialize_base64")] Vec<u8>),
}

fn serialize_base64<S: serde::Serializer>(
    bytes: &[u8],
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&STANDARD.encode(bytes))
}

impl ResultRef {
    /// Classifies a reference string reported by the service: `http(s)://`
    /// is a URL, anything else must be base64 (bare or a `data:` URI).
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return Ok(ResultRef::Url(trimmed.to_string()));
        }

        let payload = match trimmed.strip_prefix("data:") {
            Some(rest) => rest
                .split_once(";base64,")
                .map(|(_, data)| data)
                .ok_or_else(|| StudioError::malformed("data URI without base64 payload"))?,
            None => trimmed,
        };

        if payload.is_empty() {
            return Err(StudioError::malformed("empty result reference"));
        }

        STANDARD
            .decode(payload)
            .map(ResultRef::Inline)
            .map_err(|e| StudioError::malformed(format!("unrecognised result reference: {}", e)))
    }

    pub fn as_url(&self) -> Option<&str> {
        match self {
            ResultRef::Url(url) => Some(url),
            ResultRef::Inline(_) => None,
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, ResultRef::Inline(_))
    }
}

/// Ordered, capped list of results in the order the service reported them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultSet {
    refs: Vec<ResultRef>,
}

impl ResultSet {
    pub fn new(mut refs: Vec<ResultRef>, cap: usize) -> Self {
        refs.truncate(cap);
        Self { refs }
    }

    pub fn single(reference: ResultRef) -> Self {
        Self {
            refs: vec![reference],
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// First result, shown when only one picture fits the display.
    pub fn primary(&self) -> Option<&ResultRef> {
        self.refs.first()
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResultRef> {
        self.refs.iter()
    }

    pub fn as_slice(&self) -> &[ResultRef] {
        &self.refs
    }

    pub fn into_vec(self) -> Vec<ResultRef> {
        self.refs
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a ResultRef;
    type IntoIter = std::slice::Iter<'a, ResultRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.refs.iter()
    }
}
