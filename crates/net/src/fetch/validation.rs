//! URL validation and HTTP response validation for fetches

use pinst_errors::{Error, NetworkError};
use url::Url;

/// Validate URL and check for supported protocols
pub(crate) fn validate_url(url: &str) -> Result<Url, Error> {
    let parsed = Url::parse(url).map_err(|e| NetworkError::InvalidUrl(format!("{url}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" | "file" => Ok(parsed),
        scheme => Err(NetworkError::UnsupportedProtocol {
            protocol: scheme.to_string(),
        }
        .into()),
    }
}

/// Non-2xx statuses become `HttpStatus` errors
pub(crate) fn validate_response(response: &reqwest::Response, url: &str) -> Result<(), Error> {
    let status = response.status();
    if !status.is_success() {
        return Err(NetworkError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
            message: status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string(),
        }
        .into());
    }
    Ok(())
}

/// Name the downloaded buffer after the last path segment of the URL
pub(crate) fn file_name_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .map_or_else(|| "archive".to_string(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url_schemes() {
        assert!(validate_url("https://example.com/a.tar.gz").is_ok());
        assert!(validate_url("http://127.0.0.1:8080/a").is_ok());
        assert!(validate_url("file:///tmp/a.tar.gz").is_ok());
        assert!(matches!(
            validate_url("ftp://example.com/a"),
            Err(Error::Network(NetworkError::UnsupportedProtocol { .. }))
        ));
        assert!(matches!(
            validate_url("not a url"),
            Err(Error::Network(NetworkError::InvalidUrl(_)))
        ));
    }

    #[test]
    fn test_file_name_from_url() {
        let url = Url::parse("https://github.com/o/r/archive/refs/tags/v1.0.0.tar.gz").unwrap();
        assert_eq!(file_name_from_url(&url), "v1.0.0.tar.gz");

        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(file_name_from_url(&url), "archive");
    }
}
