//! Normalization helpers for resolver text records.

/// Empty record reads come back as `""` from the resolver; store them as null.
#[inline]
pub fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Normalize a `url` text record.
///
/// A non-empty value missing a scheme gets an `http://` prefix so it is
/// stored as a fetchable URL. Values that already carry a scheme pass
/// through unchanged; empty values are stored as null.
pub fn normalize_url(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return Some(raw.to_string());
    }
    Some(format!("http://{raw}"))
}

/// Split a comma-separated `keywords` record into its parts.
pub fn split_keywords(raw: &str) -> Option<Vec<String>> {
    if raw.is_empty() {
        return None;
    }
    Some(raw.split(',').map(|k| k.trim().to_string()).collect())
}

/// Strip null bytes, which are invalid in PostgreSQL text columns.
pub fn sanitize_string(s: &str) -> String {
    s.replace('\0', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_without_scheme_gets_http_prefix() {
        assert_eq!(
            normalize_url("example.com"),
            Some("http://example.com".to_string())
        );
    }

    #[test]
    fn url_with_scheme_is_unchanged() {
        assert_eq!(
            normalize_url("https://example.com"),
            Some("https://example.com".to_string())
        );
        assert_eq!(
            normalize_url("http://example.com"),
            Some("http://example.com".to_string())
        );
    }

    #[test]
    fn empty_url_is_null() {
        assert_eq!(normalize_url(""), None);
    }

    #[test]
    fn keywords_split_on_commas() {
        assert_eq!(
            split_keywords("ens, names,web3"),
            Some(vec![
                "ens".to_string(),
                "names".to_string(),
                "web3".to_string()
            ])
        );
        assert_eq!(split_keywords(""), None);
    }

    #[test]
    fn sanitize_drops_null_bytes() {
        assert_eq!(sanitize_string("a\0b"), "ab");
    }
}
