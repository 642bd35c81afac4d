use reqwest::Url;

use super::ApiError;

const THUM_IO: &str = "https://image.thum.io/get/width/1280/crop/800/noanimate";

/// Parses a user supplied address, assuming `https://` when no scheme is given.
pub fn parse_target(input: &str) -> Result<Url, ApiError> {
    let input = input.trim().trim_start_matches('<').trim_end_matches('>');
    let with_scheme = if input.contains("://") {
        input.to_owned()
    } else {
        format!("https://{input}")
    };

    let url = Url::parse(&with_scheme)
        .map_err(|_| ApiError::Invalid(format!("`{input}` is not a valid url.")))?;

    match url.scheme() {
        "http" | "https" if url.host_str().is_some_and(|h| h.contains('.')) => Ok(url),
        _ => Err(ApiError::Invalid(
            "Only public http(s) websites can be captured.".to_owned(),
        )),
    }
}

/// Image url rendering a screenshot of `input`.
pub fn screenshot_url(input: &str) -> Result<String, ApiError> {
    let target = parse_target(input)?;
    Ok(format!("{THUM_IO}/{target}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_missing_scheme() {
        assert_eq!(
            screenshot_url("example.com").unwrap(),
            format!("{THUM_IO}/https://example.com/")
        );
        assert_eq!(
            parse_target("<http://example.org/a?b=c>").unwrap().as_str(),
            "http://example.org/a?b=c"
        );
    }

    #[test]
    fn rejects_other_schemes_and_local_hosts() {
        assert!(parse_target("ftp://example.com").is_err());
        assert!(parse_target("file:///etc/passwd").is_err());
        assert!(parse_target("localhost").is_err());
        assert!(parse_target("http://").is_err());
    }
}
