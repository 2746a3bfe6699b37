//! Blocking REST client for the Google Slides v1 API.
//!
//! Authentication stays outside: callers hand in an OAuth access token that
//! some other component obtained.

pub mod client;

pub use client::{HttpSlidesClient, StaticTokenAuth, DEFAULT_API_BASE};
