/// Thread id extraction from reddit URLs
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

fn comments_path() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:/r/[^/]+)?/comments/([a-z0-9]+)(?:/|$)").expect("valid thread path pattern")
    })
}

/// Thread id of a reddit comments page, lowercased, or `None` for any other page.
///
/// Examples:
/// - https://www.reddit.com/r/rust/comments/abc123/some_title/ → abc123
/// - https://reddit.com/comments/abc123 → abc123
/// - https://www.reddit.com/r/rust/ → None
pub fn thread_id_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;

    let host = parsed.host_str()?.to_lowercase();
    if host != "reddit.com" && !host.ends_with(".reddit.com") {
        return None;
    }

    let path = parsed.path().to_lowercase();
    comments_path()
        .captures(&path)
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subreddit_thread() {
        assert_eq!(
            thread_id_from_url("https://www.reddit.com/r/rust/comments/1abc2d/why_rust/"),
            Some("1abc2d".to_string())
        );
    }

    #[test]
    fn test_comment_permalink_uses_thread_id() {
        assert_eq!(
            thread_id_from_url("https://www.reddit.com/r/rust/comments/1abc2d/why_rust/kx9zz1/?context=3"),
            Some("1abc2d".to_string())
        );
    }

    #[test]
    fn test_short_form() {
        assert_eq!(
            thread_id_from_url("https://reddit.com/comments/XyZ9"),
            Some("xyz9".to_string())
        );
    }

    #[test]
    fn test_other_reddit_pages() {
        assert_eq!(thread_id_from_url("https://www.reddit.com/r/rust/"), None);
        assert_eq!(thread_id_from_url("https://www.reddit.com/"), None);
        assert_eq!(thread_id_from_url("https://www.reddit.com/user/someone/comments/"), None);
    }

    #[test]
    fn test_other_hosts() {
        assert_eq!(thread_id_from_url("https://example.com/r/rust/comments/abc/"), None);
        assert_eq!(thread_id_from_url("https://notreddit.com/comments/abc/"), None);
        assert_eq!(thread_id_from_url("not a url"), None);
    }
}
