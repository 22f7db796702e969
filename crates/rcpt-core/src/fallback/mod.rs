//! Rule-based extraction used when the AI path is unavailable or fails.

mod parser;
pub mod rules;

pub use parser::{parse_fallback, FallbackParser};
