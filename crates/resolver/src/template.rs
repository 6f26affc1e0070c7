//! Download URL templates

use pinst_errors::ResolveError;
use pinst_types::ReleaseTag;

const PLACEHOLDERS: &[&str] = &["version", "tag", "name"];

/// Expand `{version}`, `{tag}` and `{name}` in a download URL template
///
/// `{version}` is the normalized semantic version (`1.0.0`), `{tag}` the tag
/// as published (`v1.0.0`).
///
/// # Errors
///
/// Returns `ResolveError::InvalidTemplate` for unknown or unterminated
/// placeholders.
pub fn expand_url(
    template: &str,
    identifier: &str,
    release: &ReleaseTag,
) -> Result<String, ResolveError> {
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| ResolveError::InvalidTemplate {
            template: template.to_string(),
            message: "unterminated '{'".to_string(),
        })?;

        match &after[..close] {
            "version" => out.push_str(&release.version.to_string()),
            "tag" => out.push_str(&release.tag),
            "name" => out.push_str(identifier),
            other => {
                return Err(ResolveError::InvalidTemplate {
                    template: template.to_string(),
                    message: format!(
                        "unknown placeholder '{{{other}}}' (expected one of {})",
                        PLACEHOLDERS.join(", ")
                    ),
                })
            }
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release() -> ReleaseTag {
        ReleaseTag::parse("v1.0.0").unwrap()
    }

    #[test]
    fn test_expand_all_placeholders() {
        let url = expand_url(
            "https://github.com/o/{name}/archive/refs/tags/{tag}.tar.gz?v={version}",
            "slack-cli",
            &release(),
        )
        .unwrap();
        assert_eq!(
            url,
            "https://github.com/o/slack-cli/archive/refs/tags/v1.0.0.tar.gz?v=1.0.0"
        );
    }

    #[test]
    fn test_plain_url_is_unchanged() {
        let url = expand_url("https://example.com/demo.tar.gz", "demo", &release()).unwrap();
        assert_eq!(url, "https://example.com/demo.tar.gz");
    }

    #[test]
    fn test_bad_placeholders() {
        assert!(matches!(
            expand_url("https://x/{os}.tar.gz", "demo", &release()),
            Err(ResolveError::InvalidTemplate { .. })
        ));
        assert!(matches!(
            expand_url("https://x/{version.tar.gz", "demo", &release()),
            Err(ResolveError::InvalidTemplate { .. })
        ));
    }
}
