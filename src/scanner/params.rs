//! Shared parameter map with scoped, self-restoring mutation

use crate::models::HttpMethod;
use std::collections::BTreeMap;
use url::Url;

/// Field names added to every request so typical form handlers accept it
pub const SUBMIT_FIELDS: &[&str] = &["Submit", "submit", "go", "Go"];

/// Substrings that suggest a numeric parameter
const NUMERIC_HINTS: &[&str] = &["id", "num", "age"];

/// Query/form parameters of one target, kept sorted so encodings are stable
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamMap {
    values: BTreeMap<String, String>,
}

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits a URL into its query-less base and its query parameters.
    /// Repeated keys keep their first value.
    pub fn from_url(raw: &str) -> Result<(String, Self), url::ParseError> {
        let mut parsed = Url::parse(raw)?;
        let mut map = Self::new();
        for (k, v) in parsed.query_pairs() {
            map.values
                .entry(k.into_owned())
                .or_insert_with(|| v.into_owned());
        }
        parsed.set_query(None);
        parsed.set_fragment(None);
        Ok((parsed.to_string(), map))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.values.insert(name.to_string(), value.to_string());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Owned key/value pairs in key order, as sent in a form body
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// `application/x-www-form-urlencoded` encoding of the map
    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.values.iter())
            .finish()
    }

    /// `base?query`, or just `base` when the map is empty
    pub fn url_with_query(&self, base: &str) -> String {
        if self.values.is_empty() {
            base.to_string()
        } else {
            format!("{base}?{}", self.encode())
        }
    }

    /// Adds the common submit-button fields that are not already present
    pub fn ensure_submit_fields(&mut self) {
        for name in SUBMIT_FIELDS {
            self.values
                .entry((*name).to_string())
                .or_insert_with(|| "Submit".to_string());
        }
    }

    /// Takes exclusive ownership of `name` until the returned guard is dropped.
    /// The guard puts back whatever the map held for `name` at this point.
    pub fn scoped(&mut self, name: &str) -> ParamGuard<'_> {
        let previous = self.values.get(name).cloned();
        ParamGuard {
            map: self,
            name: name.to_string(),
            previous,
        }
    }
}

/// Exclusive, restoring handle on one parameter of a [`ParamMap`]
#[derive(Debug)]
pub struct ParamGuard<'a> {
    map: &'a mut ParamMap,
    name: String,
    previous: Option<String>,
}

impl ParamGuard<'_> {
    /// Replaces the guarded parameter's value
    pub fn set(&mut self, value: &str) {
        self.map.set(&self.name, value);
    }

    /// Puts the original value back without releasing the guard
    pub fn restore(&mut self) {
        match self.previous {
            Some(ref v) => {
                self.map.values.insert(self.name.clone(), v.clone());
            }
            None => {
                self.map.values.remove(&self.name);
            }
        }
    }

    /// Read access to the whole map in its current state
    pub fn map(&self) -> &ParamMap {
        &*self.map
    }
}

impl Drop for ParamGuard<'_> {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Benign starting value for a parameter: its original value, or a synthetic one
pub fn baseline_value(param: &str, original: Option<&str>) -> String {
    match original {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => {
            if is_numeric_param(param) {
                "1".to_string()
            } else {
                "test".to_string()
            }
        }
    }
}

pub fn is_numeric_param(param: &str) -> bool {
    let lower = param.to_lowercase();
    NUMERIC_HINTS.iter().any(|hint| lower.contains(hint))
}

/// Per-target adjustment of how a parameter is tested
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodOverride {
    pub method: HttpMethod,
    pub base_value: String,
}

/// Pluggable heuristic consulted for every `(page URL, parameter)` pair
pub type OverrideHeuristic = Box<dyn Fn(&str, &str) -> Option<MethodOverride> + Send + Sync>;

/// Command-execution pages that take an `ip` field via POST, as in common
/// deliberately vulnerable training apps
pub fn command_exec_override(url: &str, param: &str) -> Option<MethodOverride> {
    if param == "ip" && url.contains("/vulnerabilities/exec/") {
        Some(MethodOverride {
            method: HttpMethod::Post,
            base_value: "127.0.0.1".to_string(),
        })
    } else {
        None
    }
}
