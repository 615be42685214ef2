//! Tests for the app module.
//!
//! This module is organized into submodules by functionality:
//! - `helpers` - Shared test utilities
//! - `autocomplete` - Popup behavior as seen through the composer
//! - `editing` - Buffer, cursor and submission handling

#[allow(clippy::unwrap_used, clippy::expect_used)]
pub mod helpers;
