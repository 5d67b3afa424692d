//! Domain types for opascan scans.

pub mod error;
pub mod resource;
pub mod rule;

pub use error::{Result, ScanError};
pub use resource::Resource;
pub use rule::{RuleResult, ScanResult};
