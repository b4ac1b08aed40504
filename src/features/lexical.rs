use std::sync::LazyLock;

use regex::Regex;

static SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]").unwrap());
static LETTER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-zA-Z]").unwrap());
static SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:").unwrap());

/// Prepend `https://` unless the URL already carries an http(s) scheme.
pub fn normalize(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Features computed from the URL string alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UrlStats {
    pub length: usize,
    pub special_char_ratio: f64,
    pub letter_ratio: f64,
    pub domain_length: usize,
}

impl UrlStats {
    pub fn from_url(url: &str) -> Self {
        let length = url.chars().count();
        let specials = SPECIAL_RE.find_iter(url).count();
        let letters = LETTER_RE.find_iter(url).count();

        UrlStats {
            length,
            special_char_ratio: ratio(specials, length),
            letter_ratio: ratio(letters, length),
            domain_length: netloc(url).chars().count(),
        }
    }
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// Network location (`host[:port]`) as written in the URL, or "" when there is none.
///
/// Text after `//` up to the first `/`, `?` or `#`, without userinfo. Case,
/// ports and non-ASCII characters are kept as they appear. Paths, fragments
/// and `mailto:`-style targets have no network location.
pub fn netloc(url: &str) -> &str {
    let url = url.trim_start();
    let rest = match SCHEME_RE.find(url) {
        Some(m) => &url[m.end()..],
        None => url,
    };
    let Some(after) = rest.strip_prefix("//") else {
        return "";
    };
    let authority = &after[..after.find(['/', '?', '#']).unwrap_or(after.len())];
    match authority.rfind('@') {
        Some(i) => &authority[i + 1..],
        None => authority,
    }
}
