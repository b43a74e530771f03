//! Link rules for the `urls`/`websites` lists.
//!
//! Links to the post's own status page and to bare profile pages carry no
//! information beyond the author and are left out of the display lists.
//! Other twitter.com links are rewritten so they no longer name an account.

use once_cell::sync::Lazy;
use regex::Regex;

static OWN_STATUS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"twitter\.com/.*/status/(\d+)").expect("status pattern is valid"));
static PROFILE_ROOT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"twitter\.com/[^/]+($|\?)").expect("profile pattern is valid"));

static TWITTER_HOST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\w+://(?:www\.)?twitter\.com").expect("host pattern is valid"));
static STATUS_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"twitter\.com/.*/status/").expect("status path pattern is valid"));
static COLLECTION_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"twitter\.com/.*/(lists|events|broadcasts|moments|timelines)/")
        .expect("collection path pattern is valid")
});
static QUERY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\?.*$").expect("query pattern is valid"));

static TWITTER_WEBSITE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\w+://(?:www\.)?(twitter\.com/i/(?:web/status|status|lists|events|broadcasts|moments|timelines))",
    )
    .expect("twitter website pattern is valid")
});
static WEBSITE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"://(?:www\.)?([^/]+)").expect("website pattern is valid"));

pub fn include_link(link: &str, post_id: &str) -> bool {
    if link.is_empty() {
        return false;
    }

    let links_to_self = OWN_STATUS_RE
        .captures(link)
        .and_then(|captures| captures.get(1))
        .is_some_and(|id| id.as_str() == post_id);

    !links_to_self && !PROFILE_ROOT_RE.is_match(link)
}

pub fn anon_twitter_link(link: &str) -> String {
    if !TWITTER_HOST_RE.is_match(link) {
        return link.to_string();
    }

    let link = STATUS_PATH_RE.replace(link, "twitter.com/i/web/status/");
    let link = COLLECTION_PATH_RE.replace(&link, "twitter.com/i/${1}/");
    QUERY_RE.replace(&link, "").into_owned()
}

/// Authority of the link without `www.`; anonymised twitter links map to a
/// pseudo host such as `twitter.com/i/web/status`.
pub fn extract_website(link: &str) -> Option<&str> {
    TWITTER_WEBSITE_RE
        .captures(link)
        .or_else(|| WEBSITE_RE.captures(link))
        .and_then(|captures| captures.get(1))
        .map(|host| host.as_str())
}
