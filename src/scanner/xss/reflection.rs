//! Reflection analysis: where and how an injected marker comes back

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bytes of surrounding markup inspected on each side of a reflection
const CONTEXT_WINDOW: usize = 30;

/// Shortest substring that still counts as a partial reflection
const MIN_PARTIAL_LEN: usize = 6;

/// Where in the page a reflection landed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XssContext {
    HtmlBody,
    Attribute,
    JsBlock,
    EventHandler,
    Unknown,
}

impl fmt::Display for XssContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            XssContext::HtmlBody => "HTML body",
            XssContext::Attribute => "attribute",
            XssContext::JsBlock => "script block",
            XssContext::EventHandler => "event handler",
            XssContext::Unknown => "unknown",
        };
        write!(f, "{label}")
    }
}

/// Transformation the application applied to a reflected marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    HtmlEncoded,
    JsEscaped,
    UrlEncoded,
    Partial,
}

impl FilterKind {
    pub fn label(&self) -> &'static str {
        match self {
            FilterKind::HtmlEncoded => "HTML-encoded",
            FilterKind::JsEscaped => "JavaScript-escaped",
            FilterKind::UrlEncoded => "URL-encoded",
            FilterKind::Partial => "Partially reflected (filtered)",
        }
    }
}

/// Outcome of [`is_payload_reflected`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reflection {
    Exact,
    Filtered(FilterKind),
    Absent,
}

impl Reflection {
    pub fn is_exact(&self) -> bool {
        matches!(self, Reflection::Exact)
    }

    /// Label of the filter, if the marker came back transformed
    pub fn filter_label(&self) -> Option<&'static str> {
        match self {
            Reflection::Filtered(kind) => Some(kind.label()),
            _ => None,
        }
    }
}

/// Entity-encoded spellings of `s` a server-side escaper may produce. Text
/// encoding of `& < >` is shared; the quote forms differ between the crate's
/// hex entities, decimal `&#39;`/`&#34;`, and `&quot;`/`&#039;`.
pub fn html_encoded_forms(s: &str) -> Vec<String> {
    let text = html_escape::encode_text(s);
    vec![
        html_escape::encode_safe(s).into_owned(),
        text.replace('\'', "&#39;").replace('"', "&#34;"),
        text.replace('"', "&quot;").replace('\'', "&#039;"),
    ]
}

/// `\xNN` escape of every byte
pub fn js_hex_escape(s: &str) -> String {
    s.bytes().map(|b| format!("\\x{b:02x}")).collect()
}

fn query_escape(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

/// Checks the encodings in priority order; the first that matches wins
pub fn is_payload_reflected(body: &str, marker: &str) -> Reflection {
    if marker.is_empty() {
        return Reflection::Absent;
    }
    if body.contains(marker) {
        return Reflection::Exact;
    }
    if html_encoded_forms(marker).iter().any(|form| body.contains(form.as_str())) {
        return Reflection::Filtered(FilterKind::HtmlEncoded);
    }
    if body.contains(&js_hex_escape(marker)) {
        return Reflection::Filtered(FilterKind::JsEscaped);
    }
    if body.contains(&query_escape(marker)) {
        return Reflection::Filtered(FilterKind::UrlEncoded);
    }
    if is_partial_reflection(body, marker) {
        return Reflection::Filtered(FilterKind::Partial);
    }
    Reflection::Absent
}

/// True when some contiguous piece of `marker`, at least six bytes long
/// (or the whole marker if shorter), appears in `body`
fn is_partial_reflection(body: &str, marker: &str) -> bool {
    let len = marker.len();
    let shortest = MIN_PARTIAL_LEN.min(len).max(1);
    (shortest..=len).rev().any(|l| {
        (0..=len - l)
            .filter_map(|i| marker.get(i..i + l))
            .any(|sub| body.contains(sub))
    })
}

/// Classifies the markup surrounding a reflection
pub fn detect_xss_context(snippet: &str) -> XssContext {
    let s = snippet.trim();
    if s.is_empty() {
        return XssContext::Unknown;
    }
    if s.starts_with('<') && s.contains('>') {
        return XssContext::HtmlBody;
    }
    let double_quoted = s.len() > 1 && s.starts_with('"') && s.ends_with('"');
    let single_quoted = s.len() > 1 && s.starts_with('\'') && s.ends_with('\'');
    if double_quoted || single_quoted {
        return XssContext::Attribute;
    }
    if s.contains("<script>") || s.contains("</script>") {
        return XssContext::JsBlock;
    }
    if s.contains("javascript:") {
        return XssContext::EventHandler;
    }
    XssContext::Unknown
}

/// Context of every non-overlapping exact occurrence of `payload`
pub fn find_reflections(body: &str, payload: &str) -> Vec<XssContext> {
    if payload.is_empty() {
        return Vec::new();
    }
    body.match_indices(payload)
        .map(|(idx, _)| {
            let mut start = idx.saturating_sub(CONTEXT_WINDOW);
            while !body.is_char_boundary(start) {
                start -= 1;
            }
            let mut end = (idx + payload.len() + CONTEXT_WINDOW).min(body.len());
            while !body.is_char_boundary(end) {
                end += 1;
            }
            detect_xss_context(&body[start..end])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_wins_over_encodings() {
        let marker = "<b>xssCANARY-1</b>";
        let body = format!("{marker} and {}", html_escape::encode_safe(marker));
        assert_eq!(is_payload_reflected(&body, marker), Reflection::Exact);
        assert!(is_payload_reflected(&body, marker).filter_label().is_none());
    }

    #[test]
    fn test_html_encoded() {
        let body = "<p>&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;</p>";
        let r = is_payload_reflected(body, "<script>alert('x')</script>");
        assert_eq!(r, Reflection::Filtered(FilterKind::HtmlEncoded));
        assert_eq!(r.filter_label(), Some("HTML-encoded"));
    }

    #[test]
    fn test_html_encoded_quote_styles() {
        let marker = "\"><b>xssCANARY-1</b>";
        for body in [
            "&quot;&gt;&lt;b&gt;xssCANARY-1&lt;/b&gt;",
            "&#34;&gt;&lt;b&gt;xssCANARY-1&lt;/b&gt;",
        ] {
            assert_eq!(
                is_payload_reflected(body, marker),
                Reflection::Filtered(FilterKind::HtmlEncoded)
            );
        }
        let body = html_escape::encode_safe("<i>it's</i>").into_owned();
        assert_eq!(
            is_payload_reflected(&body, "<i>it's</i>"),
            Reflection::Filtered(FilterKind::HtmlEncoded)
        );
    }

    #[test]
    fn test_js_and_url_encoded() {
        assert_eq!(
            is_payload_reflected("var s = '\\x3c\\x62\\x3e';", "<b>"),
            Reflection::Filtered(FilterKind::JsEscaped)
        );
        assert_eq!(
            is_payload_reflected("next=%3Cb+x%3E", "<b x>"),
            Reflection::Filtered(FilterKind::UrlEncoded)
        );
    }

    #[test]
    fn test_partial_and_absent() {
        let marker = "<script>xssCANARY-abcdef</script>";
        assert_eq!(
            is_payload_reflected("you searched for xssCANARY-abcdef", marker),
            Reflection::Filtered(FilterKind::Partial)
        );
        assert_eq!(is_payload_reflected("nothing", marker), Reflection::Absent);
        assert_eq!(is_payload_reflected("anything", ""), Reflection::Absent);
    }

    #[test]
    fn test_detect_context() {
        assert_eq!(detect_xss_context("  <div>x</div> "), XssContext::HtmlBody);
        assert_eq!(detect_xss_context("\"value x\""), XssContext::Attribute);
        assert_eq!(detect_xss_context("var a = 1;</script>"), XssContext::JsBlock);
        assert_eq!(detect_xss_context("href=javascript:x"), XssContext::EventHandler);
        assert_eq!(detect_xss_context("plain"), XssContext::Unknown);
        assert_eq!(detect_xss_context("   "), XssContext::Unknown);
    }

    #[test]
    fn test_find_reflections_counts_each_occurrence() {
        let body = "<p>CANARY</p> some padding text that is long enough here value=\"CANARY\"";
        let contexts = find_reflections(body, "CANARY");
        assert_eq!(contexts.len(), 2);
        assert_eq!(contexts[0], XssContext::HtmlBody);
        assert!(find_reflections(body, "missing").is_empty());
    }

    #[test]
    fn test_find_reflections_multibyte_window() {
        let body = format!("{}MARK{}", "é".repeat(20), "ü".repeat(20));
        assert_eq!(find_reflections(&body, "MARK"), vec![XssContext::Unknown]);
    }
}
