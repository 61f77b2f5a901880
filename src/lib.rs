//! # codemill
//!
//! Run codemod recipes across large file sets with a fixed pool of isolated
//! workers, optionally recording every mutation into a replayable,
//! content-addressed case log instead of touching the real tree.
//!
//! ## Modules
//!
//! - `case` - Case recording: ring byte buffer, framed log writer and reader
//! - `cli` - Command-line interface
//! - `command` - File command model: the mutation vocabulary and its stores
//! - `config` - Recipe file parsing and validation
//! - `errors` - Domain error types
//! - `pool` - Worker pool coordinator and the execution worker protocol
//! - `recipe` - Recipe runner driving one pool pass per step
//! - `source` - Work item sources with include/exclude filters
//! - `transform` - Transform units, argument records, built-in engines
//! - `testing` - In-memory stores and canned transforms for tests

pub mod case;
pub mod cli;
pub mod command;
pub mod config;
pub mod errors;
pub mod pool;
pub mod recipe;
pub mod source;
pub mod transform;

pub mod testing;
