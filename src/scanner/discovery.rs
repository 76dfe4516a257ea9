//! Injectable parameter and upload form discovery

use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;
use tracing::debug;
use url::Url;

/// Input types that never carry user data
const BUTTON_TYPES: &[&str] = &["submit", "button", "reset", "image"];

/// Names found on a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredParams {
    /// Sorted, de-duplicated parameter names
    pub names: Vec<String>,
    /// Names of `<input type="file">` fields
    pub file_inputs: Vec<String>,
}

/// A multipart form that accepts a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadForm {
    /// Absolute submission URL
    pub action: String,
    pub method: String,
    pub file_field: String,
    /// Every other named field with its default value
    pub fields: Vec<(String, String)>,
}

/// Table sections a `<form>` start tag gets hoisted out of by the HTML5 tree
/// builder. The form element is left empty and its fields land in later cells.
const TABLE_SECTIONS: &[&str] = &["table", "tbody", "thead", "tfoot", "tr"];

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn input_type(input: &ElementRef<'_>) -> String {
    input
        .value()
        .attr("type")
        .unwrap_or("text")
        .to_ascii_lowercase()
}

fn field_name<'a>(field: &ElementRef<'a>) -> Option<&'a str> {
    field.value().attr("name").filter(|n| !n.is_empty())
}

/// Subtree a form's fields can live in. Normally the form itself; an empty
/// form sitting directly in a table section stays open for that whole section.
fn form_scope<'a>(form: ElementRef<'a>) -> ElementRef<'a> {
    if form.children().any(|c| c.value().is_element()) {
        return form;
    }
    form.parent()
        .and_then(ElementRef::wrap)
        .filter(|p| TABLE_SECTIONS.contains(&p.value().name()))
        .unwrap_or(form)
}

/// Named `<input>` and `<textarea>` elements paired with the form they belong
/// to, in document order. A field is owned by the most recent form start
/// whose scope still encloses it; fields outside every form are skipped.
fn form_fields(document: &Html) -> Vec<(ElementRef<'_>, ElementRef<'_>)> {
    let mut fields = Vec::new();
    let mut open: Option<(ElementRef<'_>, ElementRef<'_>)> = None;

    for element in document.root_element().descendent_elements() {
        match element.value().name() {
            "form" => open = Some((element, form_scope(element))),
            "input" | "textarea" => {
                let Some((form, scope)) = open else {
                    continue;
                };
                if field_name(&element).is_none() {
                    continue;
                }
                if element.ancestors().any(|a| a.id() == scope.id()) {
                    fields.push((form, element));
                } else {
                    open = None;
                }
            }
            _ => {}
        }
    }
    fields
}

/// Extracts form field names and anchor query keys from a page
pub fn discover(html: &str) -> DiscoveredParams {
    let document = Html::parse_document(html);
    let mut names = BTreeSet::new();
    let mut file_inputs = BTreeSet::new();

    for (_, field) in form_fields(&document) {
        let Some(name) = field_name(&field) else {
            continue;
        };
        if field.value().name() == "input" {
            let kind = input_type(&field);
            if BUTTON_TYPES.contains(&kind.as_str()) {
                continue;
            }
            if kind == "file" {
                file_inputs.insert(name.to_string());
            }
        }
        names.insert(name.to_string());
    }

    if let Some(a_sel) = selector("a[href]") {
        for anchor in document.select(&a_sel) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let Some((_, query)) = href.split_once('?') else {
                continue;
            };
            let query = query.split('#').next().unwrap_or_default();
            for (key, _) in url::form_urlencoded::parse(query.as_bytes()) {
                if !key.is_empty() {
                    names.insert(key.into_owned());
                }
            }
        }
    }

    debug!("Discovered {} parameter(s)", names.len());
    DiscoveredParams {
        names: names.into_iter().collect(),
        file_inputs: file_inputs.into_iter().collect(),
    }
}

/// Finds `multipart/form-data` forms holding a file input.
/// Relative actions are resolved against `page_url`.
pub fn find_upload_forms(page_url: &str, html: &str) -> Vec<UploadForm> {
    let document = Html::parse_document(html);
    let Some(form_sel) = selector("form") else {
        return Vec::new();
    };
    let owned = form_fields(&document);
    let base = Url::parse(page_url).ok();

    let mut forms = Vec::new();
    for form in document.select(&form_sel) {
        let enctype = form.value().attr("enctype").unwrap_or("").to_ascii_lowercase();
        if !enctype.contains("multipart/form-data") {
            continue;
        }

        let mut file_field = None;
        let mut fields = Vec::new();
        for (_, field) in owned.iter().filter(|(owner, _)| *owner == form) {
            let Some(name) = field_name(field) else {
                continue;
            };
            let kind = input_type(field);
            if kind == "file" {
                if file_field.is_none() {
                    file_field = Some(name.to_string());
                }
                continue;
            }
            if kind == "submit" {
                let value = field.value().attr("value").unwrap_or("Submit");
                fields.push((name.to_string(), value.to_string()));
                continue;
            }
            if BUTTON_TYPES.contains(&kind.as_str()) {
                continue;
            }
            let value = field.value().attr("value").unwrap_or("");
            fields.push((name.to_string(), value.to_string()));
        }

        let Some(file_field) = file_field else {
            continue;
        };

        let action = form.value().attr("action").unwrap_or("").trim();
        let action = if action.is_empty() || action == "#" {
            page_url.to_string()
        } else {
            base.as_ref()
                .and_then(|b| b.join(action).ok())
                .map(|u| u.to_string())
                .unwrap_or_else(|| action.to_string())
        };
        let method = form
            .value()
            .attr("method")
            .filter(|m| !m.is_empty())
            .unwrap_or("POST")
            .to_ascii_uppercase();

        forms.push(UploadForm {
            action,
            method,
            file_field,
            fields,
        });
    }
    forms
}
