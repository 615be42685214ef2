//! `poco-console` - client-side core of the Poco agent console
//!
//! Builds workspace file trees, preloads backend data at startup, manages
//! extension catalogs and drives slash command autocomplete.

pub mod api;
pub mod app;
pub mod cli;
pub mod core;
pub mod fs;
