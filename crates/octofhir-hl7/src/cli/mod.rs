//! CLI functionality for the hl7conv tool
//!
//! - Message conversion
//! - Template directory checks
//! - Output formatting

pub mod check;
pub mod convert;
pub mod output;
