use serde::Deserialize;
use serde_json::Value;

use super::{check_status, ApiError};

const OCR_SPACE: &str = "https://api.ocr.space/parse/image";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OcrResponse {
    #[serde(default)]
    parsed_results: Vec<ParsedResult>,
    #[serde(default)]
    is_errored_on_processing: bool,
    /// A string or a list of strings depending on the failure.
    #[serde(default)]
    error_message: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParsedResult {
    parsed_text: String,
}

impl OcrResponse {
    fn into_text(self) -> Result<String, ApiError> {
        if self.is_errored_on_processing {
            let message = match self.error_message {
                Value::String(s) => s,
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(" "),
                _ => "The OCR service could not process the image.".to_owned(),
            };
            return Err(ApiError::Invalid(message));
        }

        let text = self
            .parsed_results
            .into_iter()
            .map(|r| r.parsed_text.trim().to_owned())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        if text.is_empty() {
            Err(ApiError::NotFound)
        } else {
            Ok(text)
        }
    }
}

/// Extracts the text of the image at `image_url`.
pub async fn read_text(
    client: &reqwest::Client,
    api_key: &str,
    image_url: &str,
) -> Result<String, ApiError> {
    let response = client
        .post(OCR_SPACE)
        .form(&[
            ("apikey", api_key),
            ("url", image_url),
            ("language", "eng"),
            ("OCREngine", "2"),
        ])
        .send()
        .await?;

    let body: OcrResponse = check_status(response)?.json().await?;
    body.into_text()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_parsed_text() {
        let body: OcrResponse = serde_json::from_str(
            r#"{"ParsedResults": [{"ParsedText": "hello\r\n"}, {"ParsedText": " world "}],
                "IsErroredOnProcessing": false}"#,
        )
        .unwrap();
        assert_eq!(body.into_text().unwrap(), "hello\nworld");
    }

    #[test]
    fn surfaces_error_messages() {
        let body: OcrResponse = serde_json::from_str(
            r#"{"IsErroredOnProcessing": true, "ErrorMessage": ["Unable to recognize", "the file type"]}"#,
        )
        .unwrap();
        match body.into_text() {
            Err(ApiError::Invalid(msg)) => assert_eq!(msg, "Unable to recognize the file type"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn blank_text_is_not_found() {
        let body: OcrResponse =
            serde_json::from_str(r#"{"ParsedResults": [{"ParsedText": "  "}]}"#).unwrap();
        assert!(matches!(body.into_text(), Err(ApiError::NotFound)));
    }
}
