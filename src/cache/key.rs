use xxhash_rust::xxh3::xxh3_64;
use crate::query::parser::QueryParser;

const SEPARATOR: u8 = 0xff;

/// Normalized form of a filter expression.
///
/// Empty, match-all and unparseable filters all canonicalize to "".
pub fn canonical_query(query: &str) -> String {
    if query.trim().is_empty() {
        return String::new();
    }
    match QueryParser::new().parse(query) {
        Ok(parsed) if parsed.is_empty() && parsed.hints.is_empty() => String::new(),
        Ok(parsed) => parsed.to_string(),
        Err(_) => String::new(),
    }
}

/// File name of a tag-values cache entry: `<prefix>_<hash>.buf`
pub fn tag_values_cache_key(prefix: &str, tag_name: &str, query: &str, limit: usize) -> String {
    let canonical = canonical_query(query);

    let mut buf = Vec::with_capacity(tag_name.len() + canonical.len() + 10);
    buf.extend_from_slice(tag_name.as_bytes());
    buf.push(SEPARATOR);
    buf.extend_from_slice(canonical.as_bytes());
    buf.push(SEPARATOR);
    buf.extend_from_slice(&(limit as u64).to_le_bytes());

    format!("{}_{:016x}.buf", prefix, xxh3_64(&buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "cache_search_tagvaluesv2";

    #[test]
    fn test_invalid_queries_share_the_empty_key() {
        let empty = tag_values_cache_key(PREFIX, "span.foo", "", 100);
        assert_eq!(tag_values_cache_key(PREFIX, "span.foo", "{ not_a_traceql = query }", 100), empty);
        assert_eq!(tag_values_cache_key(PREFIX, "span.foo", "{ span.env=dev }", 100), empty);
        assert_eq!(tag_values_cache_key(PREFIX, "span.foo", "{}", 100), empty);
    }

    #[test]
    fn test_equivalent_spelling_shares_a_key() {
        assert_eq!(
            tag_values_cache_key(PREFIX, "span.foo", r#"{span.env="dev"}"#, 100),
            tag_values_cache_key(PREFIX, "span.foo", r#"{   span.env  =  "dev"   }"#, 100)
        );
    }

    #[test]
    fn test_distinct_inputs_get_distinct_keys() {
        let base = tag_values_cache_key(PREFIX, "span.foo", r#"{ span.env = "dev" }"#, 100);
        assert_ne!(base, tag_values_cache_key(PREFIX, "span.foo", r#"{ span.env = "prod" }"#, 100));
        assert_ne!(base, tag_values_cache_key(PREFIX, "span.bar", r#"{ span.env = "dev" }"#, 100));
        assert_ne!(base, tag_values_cache_key(PREFIX, "span.foo", r#"{ span.env = "dev" }"#, 200));
    }

    #[test]
    fn test_key_format() {
        let key = tag_values_cache_key(PREFIX, "span.foo", "", 0);
        assert!(key.starts_with("cache_search_tagvaluesv2_"));
        assert!(key.ends_with(".buf"));
        assert_eq!(key.len(), PREFIX.len() + 1 + 16 + 4);
    }
}
