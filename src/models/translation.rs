use serde::{Deserialize, Serialize};

fn default_source_lang() -> String {
    "auto".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
    #[serde(default = "default_source_lang")]
    pub source_lang: String,
    pub target_lang: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchTranslateRequest {
    pub texts: Vec<String>,
    #[serde(default = "default_source_lang")]
    pub source_lang: String,
    pub target_lang: String,
}

/// Result of a translation request.
///
/// When translation fails the original text is returned with
/// `translated == false` and the failure in `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub text: String,
    pub translated: bool,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TranslateResponse {
    pub fn untranslated(text: impl Into<String>, error: Option<String>) -> Self {
        Self {
            text: text.into(),
            translated: false,
            cached: false,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_lang_defaults_to_auto() {
        let request: TranslateRequest =
            serde_json::from_str(r#"{"text": "hello", "target_lang": "de"}"#).unwrap();
        assert_eq!(request.source_lang, "auto");
    }
}
