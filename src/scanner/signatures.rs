//! Named, versioned response signature sets

use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::warn;

pub const SQL_ERRORS: &str = "sql-errors";
pub const LFI_FILE_CONTENT: &str = "lfi-file-content";
pub const TRAVERSAL_FILES: &str = "traversal-files";
pub const COMMAND_OUTPUT: &str = "command-output";

/// Section headers of `win.ini` / `boot.ini`
const WINDOWS_INI_SECTIONS: &[&str] = &[
    "[boot loader]",
    "[operating systems]",
    "[drivers]",
    "[fonts]",
    "[extensions]",
    "[mci extensions]",
    "[files]",
    "[debug]",
    "[386enh]",
    "[network]",
];

/// One case-insensitive matcher with a human-readable label
#[derive(Debug, Clone)]
pub struct Signature {
    pub label: String,
    regex: Regex,
}

/// An ordered list of matchers for one kind of response evidence
#[derive(Debug, Clone)]
pub struct SignatureSet {
    pub name: String,
    pub version: u32,
    signatures: Vec<Signature>,
}

impl SignatureSet {
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
            signatures: Vec::new(),
        }
    }

    /// Adds a regex matcher. Invalid patterns are logged and skipped.
    pub fn pattern(mut self, label: &str, pattern: &str) -> Self {
        match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(regex) => self.signatures.push(Signature {
                label: label.to_string(),
                regex,
            }),
            Err(e) => warn!("Skipping signature '{label}' in {}: {e}", self.name),
        }
        self
    }

    /// Adds a literal substring matcher
    pub fn literal(self, label: &str, text: &str) -> Self {
        let escaped = regex::escape(text);
        self.pattern(label, &escaped)
    }

    /// Label of the first signature matching `body`
    pub fn first_match(&self, body: &str) -> Option<&str> {
        self.signatures
            .iter()
            .find(|s| s.regex.is_match(body))
            .map(|s| s.label.as_str())
    }

    pub fn is_match(&self, body: &str) -> bool {
        self.first_match(body).is_some()
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

/// Lookup table of signature sets by name
#[derive(Debug, Clone, Default)]
pub struct SignatureRegistry {
    sets: HashMap<String, SignatureSet>,
}

impl SignatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry with the built-in sets, compiled on first use
    pub fn builtin() -> &'static SignatureRegistry {
        static REGISTRY: OnceLock<SignatureRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            let mut registry = SignatureRegistry::new();
            registry.register(sql_errors());
            registry.register(lfi_file_content());
            registry.register(traversal_files());
            registry.register(command_output());
            registry
        })
    }

    /// Adds a set, replacing any previous set with the same name
    pub fn register(&mut self, set: SignatureSet) {
        self.sets.insert(set.name.clone(), set);
    }

    pub fn get(&self, name: &str) -> Option<&SignatureSet> {
        self.sets.get(name)
    }

    /// Like [`get`](Self::get), but an unknown name yields an empty set
    pub fn get_or_empty(&self, name: &str) -> SignatureSet {
        self.get(name)
            .cloned()
            .unwrap_or_else(|| SignatureSet::new(name, 0))
    }
}

fn sql_errors() -> SignatureSet {
    SignatureSet::new(SQL_ERRORS, 1)
        .literal("generic SQL syntax", "sql syntax")
        .literal("MySQL", "mysql_fetch")
        .literal("MySQL", "mysql_num_rows")
        .literal("generic", "division by zero")
        .literal("Oracle", "ORA-01756")
        .literal("generic SQLSTATE", "SQLSTATE")
        .literal("ODBC", "ODBC")
        .literal("generic", "Syntax error")
        .literal("generic", "Unclosed")
        .literal("MS Access", "Microsoft OLE DB")
        .literal("MySQL", "Warning: mysql_")
        .literal("MySQL", "You have an error in your SQL syntax")
        .literal("SQLite", "SQLite3::")
        .literal("PostgreSQL", "PG::")
        .literal("PostgreSQL", "PostgreSQL")
        .literal("MSSQL", "Microsoft SQL")
        .literal("MS Access", "Syntax error in string in query expression")
        .literal("MSSQL", "Incorrect syntax near")
        .literal("MSSQL", "Unclosed quotation mark")
}

fn lfi_file_content() -> SignatureSet {
    let set = SignatureSet::new(LFI_FILE_CONTENT, 1)
        .literal("/etc/passwd", "root:x:0:0:")
        .literal("shell path", "/bin/bash")
        .pattern("Windows path", r"[a-z]:\\windows\\");
    WINDOWS_INI_SECTIONS
        .iter()
        .fold(set, |set, section| set.literal("Windows ini", section))
}

fn traversal_files() -> SignatureSet {
    let set = SignatureSet::new(TRAVERSAL_FILES, 1).literal("/etc/passwd", "root:x:0:0:");
    WINDOWS_INI_SECTIONS
        .iter()
        .fold(set, |set, section| set.literal("Windows ini", section))
}

fn command_output() -> SignatureSet {
    SignatureSet::new(COMMAND_OUTPUT, 1).pattern("id output", r"uid=\d+\(.+\)")
}
