use serde_json::Value;

use crate::{
    error::{Result, StudioError},
    models::{ResultRef, ResultSet},
};

/// Keys holding one reference.
const SINGLE_KEYS: &[&str] = &["result_url"];
/// Keys holding a flat array of references, checked in order.
const FLAT_KEYS: &[&str] = &["result_urls", "urls", "images"];
/// Key holding an array of items that each carry references.
const NESTED_KEY: &str = "result";
/// Keys the prompt enhancer answers with, checked in order.
const PROMPT_KEYS: &[&str] = &["prompt variations", "enhanced_prompt", "prompt"];

/// The response layouts the service is known to produce.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResponseShape<'a> {
    Single(&'a str),
    Flat(&'a [Value]),
    Nested(&'a [Value]),
}

impl<'a> ResponseShape<'a> {
    /// Matches shapes in a fixed order: single, then flat, then nested.
    /// The first match wins even when later shape keys are also present.
    pub fn detect(response: &'a Value) -> Result<Self> {
        let object = response.as_object().ok_or_else(|| {
            StudioError::malformed(format!("expected a JSON object, got {}", kind_of(response)))
        })?;

        for key in SINGLE_KEYS {
            if let Some(value) = object.get(*key) {
                let url = value
                    .as_str()
                    .ok_or_else(|| StudioError::malformed(format!("'{}' is not a string", key)))?;
                return Ok(ResponseShape::Single(url));
            }
        }

        for key in FLAT_KEYS {
            if let Some(value) = object.get(*key) {
                let list = value
                    .as_array()
                    .ok_or_else(|| StudioError::malformed(format!("'{}' is not a list", key)))?;
                return Ok(ResponseShape::Flat(list));
            }
        }

        if let Some(items) = object.get(NESTED_KEY).and_then(Value::as_array) {
            return Ok(ResponseShape::Nested(items));
        }

        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        Err(StudioError::malformed(format!(
            "no recognised result field; response keys: [{}]",
            keys.join(", ")
        )))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ResponseShape::Single(_) => "single",
            ResponseShape::Flat(_) => "flat",
            ResponseShape::Nested(_) => "nested",
        }
    }

    /// Collects at most `limit` references in reported order.
    pub fn collect(&self, limit: usize) -> Result<Vec<ResultRef>> {
        match self {
            ResponseShape::Single(raw) => Ok(vec![ResultRef::parse(raw)?]),
            ResponseShape::Flat(list) => list
                .iter()
                .take(limit)
                .map(parse_entry)
                .collect(),
            ResponseShape::Nested(items) => {
                let mut refs = Vec::new();
                for item in items.iter() {
                    for entry in item_entries(item)? {
                        if refs.len() >= limit {
                            break;
                        }
                        refs.push(parse_entry(entry)?);
                    }
                    if refs.len() >= limit {
                        break;
                    }
                }
                Ok(refs)
            }
        }
    }
}

/// References carried by one nested item: `{"urls": [..]}`, `{"url": ".."}`,
/// a bare list, or a bare string.
fn item_entries(item: &Value) -> Result<Vec<&Value>> {
    match item {
        Value::Object(map) => {
            if let Some(urls) = map.get("urls") {
                let list = urls
                    .as_array()
                    .ok_or_else(|| StudioError::malformed("item 'urls' is not a list"))?;
                Ok(list.iter().collect())
            } else if let Some(url) = map.get("url") {
                Ok(vec![url])
            } else {
                // Items without references (e.g. error entries) contribute nothing.
                Ok(Vec::new())
            }
        }
        Value::Array(list) => Ok(list.iter().collect()),
        Value::String(_) => Ok(vec![item]),
        other => Err(StudioError::malformed(format!(
            "unexpected result item: {}",
            kind_of(other)
        ))),
    }
}

fn parse_entry(entry: &Value) -> Result<ResultRef> {
    entry
        .as_str()
        .ok_or_else(|| {
            StudioError::malformed(format!("result reference is {}, not a string", kind_of(entry)))
        })
        .and_then(ResultRef::parse)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Turns any known response layout into a capped `ResultSet`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultNormalizer;

impl ResultNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, response: &Value, requested: usize) -> Result<ResultSet> {
        if requested == 0 {
            return Err(StudioError::invalid("requested result count must be at least 1"));
        }

        let shape = ResponseShape::detect(response)?;
        let refs = shape.collect(requested)?;
        if refs.is_empty() {
            return Err(StudioError::malformed(format!(
                "{} response carried no result references",
                shape.name()
            )));
        }

        log::debug!(
            "Normalized {} response into {} result(s)",
            shape.name(),
            refs.len()
        );
        Ok(ResultSet::new(refs, requested))
    }

    /// First non-blank prompt in a prompt enhancer answer. The value may be
    /// a string or a list of variations.
    pub fn enhanced_prompt(&self, response: &Value) -> Result<String> {
        let object = response.as_object().ok_or_else(|| {
            StudioError::malformed(format!("expected a JSON object, got {}", kind_of(response)))
        })?;
        let value = PROMPT_KEYS
            .iter()
            .find_map(|key| object.get(*key))
            .ok_or_else(|| StudioError::malformed("prompt enhancer answer has no prompt"))?;

        let candidates: Vec<&str> = match value {
            Value::String(text) => vec![text.as_str()],
            Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
            other => {
                return Err(StudioError::malformed(format!(
                    "enhanced prompt is {}, expected text",
                    kind_of(other)
                )))
            }
        };
        candidates
            .into_iter()
            .map(str::trim)
            .find(|text| !text.is_empty())
            .map(str::to_string)
            .ok_or_else(|| StudioError::malformed("prompt enhancer returned an empty prompt"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn urls(set: &ResultSet) -> Vec<&str> {
        set.iter().filter_map(|r| r.as_url()).collect()
    }

    #[test]
    fn test_single_reference() {
        let set = ResultNormalizer::new()
            .normalize(&json!({"result_url": "https://x/a.png"}), 4)
            .unwrap();
        assert_eq!(urls(&set), vec!["https://x/a.png"]);
    }

    #[test]
    fn test_flat_list_is_truncated_in_order() {
        let response = json!({"urls": [
            "https://x/1.png", "https://x/2.png", "https://x/3.png",
            "https://x/4.png", "https://x/5.png"
        ]});
        let set = ResultNormalizer::new().normalize(&response, 3).unwrap();
        assert_eq!(urls(&set), vec!["https://x/1.png", "https://x/2.png", "https://x/3.png"]);
    }

    #[test]
    fn test_nested_list_stops_mid_item() {
        let response = json!({"result": [
            {"urls": ["https://x/a1.png", "https://x/a2.png"]},
            {"urls": ["https://x/b1.png", "https://x/b2.png", "https://x/b3.png"]},
            {"urls": ["https://x/c1.png"]}
        ]});
        let set = ResultNormalizer::new().normalize(&response, 4).unwrap();
        assert_eq!(
            urls(&set),
            vec!["https://x/a1.png", "https://x/a2.png", "https://x/b1.png", "https://x/b2.png"]
        );
    }

    #[test]
    fn test_nested_item_variants() {
        let response = json!({"result": [
            ["https://x/1.png"],
            {"url": "https://x/2.png"},
            "https://x/3.png",
            {"error": "seed rejected"}
        ]});
        let set = ResultNormalizer::new().normalize(&response, 8).unwrap();
        assert_eq!(urls(&set), vec!["https://x/1.png", "https://x/2.png", "https://x/3.png"]);
    }

    #[test]
    fn test_stops_before_malformed_tail() {
        let response = json!({"result": [
            {"urls": ["https://x/1.png"]},
            42
        ]});
        assert_eq!(ResultNormalizer::new().normalize(&response, 1).unwrap().len(), 1);
        assert!(ResultNormalizer::new().normalize(&response, 2).is_err());
    }

    #[test]
    fn test_single_wins_over_other_shapes() {
        let response = json!({
            "urls": ["https://x/flat.png"],
            "result": [{"urls": ["https://x/nested.png"]}],
            "result_url": "https://x/single.png"
        });
        let set = ResultNormalizer::new().normalize(&response, 4).unwrap();
        assert_eq!(urls(&set), vec!["https://x/single.png"]);
    }

    #[test]
    fn test_inline_images() {
        let response = json!({"images": ["aGVsbG8="]});
        let set = ResultNormalizer::new().normalize(&response, 1).unwrap();
        assert_eq!(set.primary(), Some(&ResultRef::Inline(b"hello".to_vec())));
    }

    #[test]
    fn test_unrecognised_or_empty_is_malformed() {
        let normalizer = ResultNormalizer::new();
        for response in [
            json!({"status": "ok"}),
            json!({"urls": []}),
            json!({"result": []}),
            json!({"result_url": 12}),
            json!(["https://x/1.png"]),
        ] {
            assert!(matches!(
                normalizer.normalize(&response, 2),
                Err(StudioError::MalformedResponse(_))
            ));
        }
    }

    #[test]
    fn test_zero_requested_is_invalid() {
        assert!(matches!(
            ResultNormalizer::new().normalize(&json!({"result_url": "https://x/a.png"}), 0),
            Err(StudioError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_enhanced_prompt_forms() {
        let normalizer = ResultNormalizer::new();
        assert_eq!(
            normalizer
                .enhanced_prompt(&json!({"prompt variations": "a red sneaker on wet asphalt"}))
                .unwrap(),
            "a red sneaker on wet asphalt"
        );
        assert_eq!(
            normalizer
                .enhanced_prompt(&json!({"enhanced_prompt": ["  ", "studio lit sneaker"]}))
                .unwrap(),
            "studio lit sneaker"
        );
        for response in [json!({"urls": []}), json!({"prompt": ""}), json!({"prompt": 3})] {
            assert!(matches!(
                normalizer.enhanced_prompt(&response),
                Err(StudioError::MalformedResponse(_))
            ));
        }
    }
}
