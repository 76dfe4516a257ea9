//! XSS analysis toolkit: canaries, mutations, reflection contexts and CSP

pub mod canary;
pub mod csp;
pub mod mutation;
pub mod reflection;

pub use canary::{generate_canary, inject_canary};
pub use csp::{parse_csp, CspPolicy};
pub use mutation::{mutate_payload, url_encoded_forms};
pub use reflection::{
    detect_xss_context, find_reflections, is_payload_reflected, FilterKind, Reflection,
    XssContext,
};
