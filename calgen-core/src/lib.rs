//! Core library for calgen.
//!
//! calgen asks a large language model for realistic calendar users and
//! events, turns the free-text completions into typed records, keeps them
//! in a key-value store with secondary indexes, and exports them to files.
//!
//! - `record` holds the `User` and `CalendarEvent` types and their
//!   construction from loosely-typed JSON
//! - `parse` pulls a JSON array out of a raw completion
//! - `kv` and `store` persist records and maintain the indexes
//! - `llm` is the completion capability with one client per vendor
//! - `generate` drives a generation run, `export` writes files

pub mod config;
pub mod constants;
pub mod error;
pub mod event_range;
pub mod export;
pub mod generate;
pub mod kv;
pub mod llm;
pub mod parse;
pub mod prompt;
pub mod record;
pub mod store;

pub use error::{CoreError, CoreResult};
pub use record::{CalendarEvent, EventCategory, Preferences, Priority, User, WorkingHours};
