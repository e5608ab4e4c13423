//! Custom field validators used by the `validator` derives

use std::borrow::Cow;

use url::Url;
use validator::{ValidateUrl, ValidationError};

use crate::text::is_canonical_slug;

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Absolute http(s) URL
fn parse_http(value: &str) -> Option<Url> {
    Url::parse(value)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

/// Host without a leading `www.`
fn bare_host(url: &Url) -> Option<&str> {
    let host = url.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host))
}

/// A well-formed URL, or empty (which clears the field)
pub fn url_or_empty(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || value.validate_url() {
        Ok(())
    } else {
        Err(invalid("url", "Invalid URL format"))
    }
}

fn host_url(
    value: &str,
    hosts: &[&str],
    message: &'static str,
) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Ok(());
    }
    let valid = parse_http(value).is_some_and(|url| {
        bare_host(&url).is_some_and(|host| hosts.contains(&host))
            && !url.path().trim_matches('/').is_empty()
    });
    if valid {
        Ok(())
    } else {
        Err(invalid("host", message))
    }
}

pub fn github_url(value: &str) -> Result<(), ValidationError> {
    host_url(value, &["github.com"], "Must be a valid GitHub URL")
}

pub fn twitter_url(value: &str) -> Result<(), ValidationError> {
    host_url(value, &["twitter.com", "x.com"], "Must be a valid Twitter/X URL")
}

pub fn linkedin_url(value: &str) -> Result<(), ValidationError> {
    host_url(value, &["linkedin.com"], "Must be a valid LinkedIn URL")
}

/// Letters, digits, `_` and `-`
pub fn username_chars(value: &str) -> Result<(), ValidationError> {
    if value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        Ok(())
    } else {
        Err(invalid(
            "username",
            "Username can only contain letters, numbers, underscores, and hyphens",
        ))
    }
}

/// Lowercase words of `[a-z0-9]` joined by single hyphens
pub fn slug_format(value: &str) -> Result<(), ValidationError> {
    if is_canonical_slug(value) {
        Ok(())
    } else {
        Err(invalid(
            "slug",
            "Slug must be lowercase letters, numbers, and hyphens only",
        ))
    }
}

/// `#rgb` or `#rrggbb`
pub fn hex_color(value: &str) -> Result<(), ValidationError> {
    let valid = value.strip_prefix('#').is_some_and(|hex| {
        (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
    });
    if valid {
        Ok(())
    } else {
        Err(invalid("color", "Invalid hex color format"))
    }
}
