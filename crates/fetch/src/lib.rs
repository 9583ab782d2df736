//! Template download.
//!
//! Blocking reqwest client (no Tokio runtime required). One GET per call:
//! a non-2xx response is an error carrying the status and body, with no
//! retry.

mod client;

pub use client::{fetch_template, ClientOptions, FetchError, TemplateClient};
