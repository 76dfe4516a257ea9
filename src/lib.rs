//! vigil - web injection and misconfiguration probe
//!
//! Crawls a target site, discovers its parameters and runs a fixed series of
//! injection detectors (command injection, XSS, SQLi, LFI, path traversal,
//! open redirect) against each one, plus page-level CSRF, file upload and
//! WAF checks.

pub mod config;
pub mod crawler;
pub mod error;
pub mod http;
pub mod models;
pub mod report;
pub mod scanner;
