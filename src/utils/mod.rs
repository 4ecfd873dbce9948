// Utility functions
pub mod error;
pub mod spreadsheet;

pub use error::*;
