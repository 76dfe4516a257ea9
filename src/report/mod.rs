//! Scan result export

pub mod json;
