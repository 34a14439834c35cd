//! Landing URL cleanup and query/fragment extraction

use std::sync::OnceLock;
use tracing::warn;
use url::{ParseError, Url};

/// Normalizes raw tracking URLs before they are parsed
pub trait UrlCleaner: Send + Sync {
    fn cleanup(&self, url: &str) -> String;
}

/// Default cleaner for URLs reported by tracking clients
///
/// - decodes the HTML entities some clients leave behind (`&amp;` etc.)
/// - strips line breaks and NUL bytes, trims surrounding whitespace
/// - rewrites matrix URLs (`/path;a=1;b=2`) into regular query strings
#[derive(Debug, Clone, Copy, Default)]
pub struct PageUrlCleaner;

impl UrlCleaner for PageUrlCleaner {
    fn cleanup(&self, url: &str) -> String {
        let url = decode_html_entities(url);
        let url: String = url
            .chars()
            .filter(|c| !matches!(c, '\n' | '\r' | '\0'))
            .collect();
        convert_matrix_url(url.trim())
    }
}

fn decode_html_entities(input: &str) -> String {
    const ENTITIES: [(&str, char); 6] = [
        ("&amp;", '&'),
        ("&quot;", '"'),
        ("&#039;", '\''),
        ("&#39;", '\''),
        ("&lt;", '<'),
        ("&gt;", '>'),
    ];

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match ENTITIES.iter().find(|(entity, _)| tail.starts_with(entity)) {
            Some((entity, ch)) => {
                out.push(*ch);
                rest = &tail[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Rewrite matrix parameters (`/page;a=1;b=2`) into a query string
///
/// A `?` ahead of the first path `;` means the URL already has a regular query
/// and is left alone. A `?` after it is folded into the matrix part, so
/// `/a;b?c=1` becomes `/a?b&c=1`. The fragment is carried over untouched.
fn convert_matrix_url(url: &str) -> String {
    let (before_fragment, fragment) = match url.find('#') {
        Some(pos) => url.split_at(pos),
        None => (url, ""),
    };

    // Only the path may carry matrix parameters, never the authority.
    let path_start = match before_fragment.find("://") {
        Some(scheme_end) => before_fragment[scheme_end + 3..]
            .find('/')
            .map(|p| scheme_end + 3 + p),
        None => Some(0),
    };

    let Some(path_start) = path_start else {
        return url.to_string();
    };
    let Some(first) = before_fragment[path_start..].find(';').map(|p| path_start + p) else {
        return url.to_string();
    };
    if before_fragment[..first].contains('?') {
        return url.to_string();
    }

    let params = before_fragment[first + 1..]
        .replacen('?', ";", 1)
        .replace(';', "&");
    format!("{}?{}{}", &before_fragment[..first], params, fragment)
}

/// The parts of a landing URL that may carry campaign parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlParts {
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl UrlParts {
    /// Parse a URL, resolving scheme-less or relative input against a placeholder base
    ///
    /// Unparseable input yields no query and no fragment.
    pub fn parse(raw: &str) -> Self {
        match parse_lenient(raw) {
            Ok(url) => Self {
                query: url.query().map(str::to_string),
                fragment: url.fragment().map(str::to_string),
            },
            Err(e) => {
                warn!(url = %raw, error = %e, "unable to parse landing url");
                Self::default()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_none() && self.fragment.is_none()
    }
}

fn placeholder_base() -> &'static Url {
    static BASE: OnceLock<Url> = OnceLock::new();
    BASE.get_or_init(|| Url::parse("http://localhost/").expect("static base url is valid"))
}

fn parse_lenient(raw: &str) -> Result<Url, ParseError> {
    match Url::parse(raw) {
        Err(ParseError::RelativeUrlWithoutBase) => placeholder_base().join(raw),
        other => other,
    }
}

/// Turn a URL fragment into a query string
///
/// Path-like fragments (`#/page?utm_source=x`) carry their own query string;
/// any other fragment is used as a query string verbatim.
pub fn fragment_query_string(fragment: &str) -> String {
    if fragment.starts_with('/') {
        if let Some(query) = UrlParts::parse(fragment).query {
            return query;
        }
    }
    fragment.to_string()
}
