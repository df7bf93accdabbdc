//! Output writers for call-path summaries.
//!
//! This module handles writing summaries in two formats:
//! - JSON documents (pretty printed, readable back for validation)
//! - Indented text trees and hot-path tables

pub mod json;
pub mod text;

// Re-export main functions
pub use json::{read_summary, summary_to_string, write_summary};
pub use text::{render_hot_paths, render_summary, write_text};
