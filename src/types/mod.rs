//! Type definitions for cost-reporter

mod error;
mod report;

pub use error::*;
pub use report::*;
