//! Parsing of Moscow Exchange ISS JSON payloads into engine inputs.
//!
//! Fetching is left to the caller; these functions only turn already
//! downloaded `securities` and `history` blocks into typed records.

pub mod fx;
pub mod history;
pub mod securities;
mod table;
