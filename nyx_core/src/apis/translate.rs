use serde::{Deserialize, Serialize};

use super::{check_status, ApiError};

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub translated_text: String,
    pub detected_language: Option<DetectedLanguage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectedLanguage {
    pub language: String,
    pub confidence: f32,
}

/// Validates and lowercases a language code such as `en` or `pt-BR`.
pub fn normalise_language(code: &str) -> Result<String, ApiError> {
    let code = code.trim();
    let valid = (2..=5).contains(&code.len())
        && code.chars().all(|c| c.is_ascii_alphabetic() || c == '-')
        && !code.starts_with('-');

    if valid {
        Ok(code.to_ascii_lowercase())
    } else {
        Err(ApiError::Invalid(format!("`{code}` is not a language code.")))
    }
}

/// Translates `text` into `target` through a LibreTranslate compatible server at `base_url`.
pub async fn translate(
    client: &reqwest::Client,
    base_url: &str,
    api_key: Option<&str>,
    text: &str,
    target: &str,
) -> Result<Translation, ApiError> {
    let target = normalise_language(target)?;
    if text.trim().is_empty() {
        return Err(ApiError::Invalid("There is nothing to translate.".to_owned()));
    }

    let request = TranslateRequest {
        q: text,
        source: "auto",
        target: &target,
        format: "text",
        api_key,
    };

    let response = client
        .post(format!("{base_url}/translate"))
        .json(&request)
        .send()
        .await?;

    Ok(check_status(response)?.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_codes() {
        assert_eq!(normalise_language(" EN ").unwrap(), "en");
        assert_eq!(normalise_language("pt-BR").unwrap(), "pt-br");
        assert!(normalise_language("e").is_err());
        assert!(normalise_language("english").is_err());
        assert!(normalise_language("e1").is_err());
    }

    #[test]
    fn request_omits_missing_key() {
        let request = TranslateRequest {
            q: "hola",
            source: "auto",
            target: "en",
            format: "text",
            api_key: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("api_key").is_none());
        assert_eq!(json["target"], "en");
    }

    #[test]
    fn decodes_translation() {
        let t: Translation = serde_json::from_str(
            r#"{"translatedText": "hello", "detectedLanguage": {"language": "es", "confidence": 92.0}}"#,
        )
        .unwrap();
        assert_eq!(t.translated_text, "hello");
        assert_eq!(t.detected_language.unwrap().language, "es");
    }
}
