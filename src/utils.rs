// src/utils.rs
use url::Url;

/// Query parameters that only carry referral tracking and never identify a page.
const TRACKING_PARAMS: &[&str] = &[
    "gh_src",
    "lever-source",
    "lever-origin",
    "ref",
    "source",
    "src",
    "fbclid",
    "gclid",
];

fn is_tracking_param(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.starts_with("utm_") || TRACKING_PARAMS.contains(&lower.as_str())
}

/// Normalize a URL for deduplication: scheme, host and path lower-cased,
/// trailing slash and fragment dropped, tracking parameters stripped.
pub fn normalize_url(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.host_str()?;

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.set_fragment(None);
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    let path = url.path().to_lowercase();
    let path = path.trim_end_matches('/');
    url.set_path(path);

    // Url already lower-cases scheme and host
    let mut out = url.to_string();
    if url.query().is_none() && out.ends_with('/') {
        out.pop();
    }
    Some(out)
}

/// Search engines wrap result links in redirectors (`/url?q=` and `uddg=`).
pub fn unwrap_search_redirect(href: &str, base: &Url) -> Option<Url> {
    let url = base.join(href.trim()).ok()?;
    for (key, value) in url.query_pairs() {
        if key == "q" || key == "uddg" || key == "url" {
            if let Ok(inner) = Url::parse(&value) {
                if matches!(inner.scheme(), "http" | "https") {
                    return Some(inner);
                }
            }
        }
    }
    Some(url)
}

/// Set `key` to `value` in the query string, replacing an existing value.
pub fn with_query_param(raw: &str, key: &str, value: &str) -> Option<String> {
    let mut url = Url::parse(raw).ok()?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(key, value);
    Some(url.to_string())
}

/// Value of the first `key` parameter in the query string.
pub fn query_param(raw: &str, key: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let value = url
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned());
    value
}

/// Host pattern match. `*.example.com` matches subdomains and the apex.
pub fn host_matches(host: &str, pattern: &str) -> bool {
    let host = host.to_lowercase();
    let pattern = pattern.trim().to_lowercase();
    match pattern.strip_prefix("*.") {
        Some(apex) => host == apex || host.ends_with(&format!(".{}", apex)),
        None => host == pattern,
    }
}

/// Collapse whitespace runs into single spaces.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut text to at most `max_chars` characters on a char boundary, the
/// trailing ellipsis included.
pub fn truncate_snippet(text: &str, max_chars: usize) -> String {
    let cleaned = clean_text(text);
    if cleaned.chars().count() <= max_chars {
        return cleaned;
    }
    let mut out: String = cleaned.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Company slug shape accepted by every platform.
pub fn is_valid_slug(slug: &str) -> bool {
    let mut chars = slug.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url_strips_tracking() {
        assert_eq!(
            normalize_url("https://boards.greenhouse.io/acme/jobs/123?gh_src=x").unwrap(),
            "https://boards.greenhouse.io/acme/jobs/123"
        );
        assert_eq!(
            normalize_url("https://boards.greenhouse.io/acme/jobs/123").unwrap(),
            "https://boards.greenhouse.io/acme/jobs/123"
        );
        assert_eq!(
            normalize_url("HTTPS://Jobs.Lever.co/Beta/?utm_source=google&lever-origin=applied#apply")
                .unwrap(),
            "https://jobs.lever.co/beta"
        );
    }

    #[test]
    fn test_normalize_url_keeps_meaningful_query() {
        assert_eq!(
            normalize_url("https://boards.greenhouse.io/embed/job_board?for=Acme&utm_medium=x")
                .unwrap(),
            "https://boards.greenhouse.io/embed/job_board?for=Acme"
        );
    }

    #[test]
    fn test_normalize_url_rejects_non_http() {
        assert!(normalize_url("mailto:jobs@acme.com").is_none());
        assert!(normalize_url("not a url").is_none());
    }

    #[test]
    fn test_unwrap_search_redirect() {
        let base = Url::parse("https://www.google.com/search?q=x").unwrap();
        let google = unwrap_search_redirect(
            "/url?q=https://jobs.lever.co/beta&sa=U&ved=abc",
            &base,
        )
        .unwrap();
        assert_eq!(google.as_str(), "https://jobs.lever.co/beta");

        let ddg_base = Url::parse("https://html.duckduckgo.com/html/?q=x").unwrap();
        let ddg = unwrap_search_redirect(
            "//duckduckgo.com/l/?uddg=https%3A%2F%2Fboards.greenhouse.io%2Facme&rut=1",
            &ddg_base,
        )
        .unwrap();
        assert_eq!(ddg.as_str(), "https://boards.greenhouse.io/acme");

        let direct = unwrap_search_redirect("https://jobs.ashbyhq.com/gamma", &base).unwrap();
        assert_eq!(direct.as_str(), "https://jobs.ashbyhq.com/gamma");
    }

    #[test]
    fn test_query_param_helpers() {
        let portal = "https://job-boards.greenhouse.io/embed/job_board?for=acme";
        let page2 = with_query_param(portal, "page", "2").unwrap();
        assert_eq!(page2, format!("{}&page=2", portal));
        assert_eq!(
            with_query_param(&page2, "page", "3").unwrap(),
            format!("{}&page=3", portal)
        );
        assert_eq!(query_param(&page2, "page").as_deref(), Some("2"));
        assert_eq!(query_param(portal, "page"), None);
    }

    #[test]
    fn test_host_matches() {
        assert!(host_matches("boards.greenhouse.io", "*.greenhouse.io"));
        assert!(host_matches("greenhouse.io", "*.greenhouse.io"));
        assert!(!host_matches("evilgreenhouse.io", "*.greenhouse.io"));
        assert!(host_matches("Jobs.Lever.co", "jobs.lever.co"));
        assert!(!host_matches("api.lever.co", "jobs.lever.co"));
    }

    #[test]
    fn test_truncate_snippet() {
        assert_eq!(truncate_snippet("  a   b\n c ", 10), "a b c");
        assert_eq!(truncate_snippet("abcdef", 3), "ab…");
        assert_eq!(truncate_snippet("abc", 3), "abc");
    }

    #[test]
    fn test_is_valid_slug() {
        assert!(is_valid_slug("acme"));
        assert!(is_valid_slug("acme-corp_2.0"));
        assert!(!is_valid_slug("-acme"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("acme?x"));
    }
}
