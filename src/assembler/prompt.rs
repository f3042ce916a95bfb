use serde_json::{json, Map};

use super::validate::non_empty;
use crate::{
    error::Result,
    models::{GenerationRequest, OperationKind},
};

pub fn enhance_prompt(prompt: &str) -> Result<GenerationRequest> {
    let mut params = Map::new();
    params.insert("prompt".into(), json!(non_empty("prompt", prompt)?));
    Ok(GenerationRequest::new(
        OperationKind::EnhancePrompt,
        params,
        true,
        1,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_is_trimmed_and_required() {
        let request = enhance_prompt("  red sneaker ").unwrap();
        assert_eq!(request.kind().endpoint(), "prompt_enhancer");
        assert_eq!(request.payload(), json!({"prompt": "red sneaker"}));
        assert!(enhance_prompt("   ").is_err());
    }
}
