//! Clients for the third party apis behind the `web` cog.

pub mod anime;
pub mod covid;
pub mod ocr;
pub mod screenshot;
pub mod translate;

use reqwest::StatusCode;

#[derive(Debug)]
pub enum ApiError {
    Http(reqwest::Error),
    Status(StatusCode),
    NotFound,
    Invalid(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Http(e) => write!(f, "Request failed: {e}"),
            ApiError::Status(status) => write!(f, "The service answered with {status}."),
            ApiError::NotFound => write!(f, "Nothing was found."),
            ApiError::Invalid(reason) => write!(f, "{reason}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Http(e)
    }
}

/// Maps non-success statuses, treating 404 as [`ApiError::NotFound`].
pub(crate) fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    match response.status() {
        StatusCode::NOT_FOUND => Err(ApiError::NotFound),
        status if !status.is_success() => Err(ApiError::Status(status)),
        _ => Ok(response),
    }
}

/// Cuts `text` to at most `max` characters, ending in an ellipsis when shortened.
#[must_use]
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }

    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// `1234567` -> `1,234,567`.
#[must_use]
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ありがとうございます", 4), "ありが…");
    }

    #[test]
    fn groups_thousands() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
    }
}
