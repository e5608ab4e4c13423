//! String derivations shared by the services

use chrono::Utc;

const WORDS_PER_MINUTE: usize = 200;

/// Lowercase, collapse every run outside `[a-z0-9]` into one `-`, trim `-`
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.trim().chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Canonical tag slug, `None` when nothing usable remains
pub fn tag_slug(name: &str) -> Option<String> {
    let slug = slugify(name);
    (!slug.is_empty()).then_some(slug)
}

/// Slug for a new document: title slug plus the last four digits of the clock
pub fn document_slug(title: &str) -> String {
    let millis = Utc::now().timestamp_millis().rem_euclid(10_000);
    let base = slugify(title);
    let base = if base.is_empty() { "document" } else { &base };
    format!("{}-{:04}", base, millis)
}

/// Explicit slugs must already be in canonical form
pub fn is_canonical_slug(slug: &str) -> bool {
    !slug.is_empty() && slugify(slug) == slug
}

/// Minutes to read `content` at 200 words per minute, never less than one
pub fn reading_time(content: &str) -> i32 {
    let words = content.split_whitespace().count();
    let minutes = words.div_ceil(WORDS_PER_MINUTE).max(1);
    i32::try_from(minutes).unwrap_or(i32::MAX)
}

/// Blank strings become `None`, others are trimmed
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// At most `max` characters of `value`, cut on a char boundary
pub fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((end, _)) => value[..end].trim_end().to_string(),
        None => value.to_string(),
    }
}
