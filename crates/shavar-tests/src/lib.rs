//! Test harness for end-to-end client scenarios.
//!
//! Provides a scripted transport with canned server responses and a
//! ready-wired client over the in-memory store.

#![warn(rust_2018_idioms)]

pub mod harness;
pub mod script;

pub use harness::TestHarness;
pub use script::ScriptedTransport;
