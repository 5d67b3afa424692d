//! Policy libraries shipped inside the binary.

use crate::domain::{Result, ScanError};

const LIBRARIES: &[(&str, &str)] = &[
    ("utils", include_str!("../lib/utils.rego")),
    ("cloudformation_utils", include_str!("../lib/cloudformation_utils.rego")),
    ("terraform_utils", include_str!("../lib/terraform_utils.rego")),
];

/// Source of the embedded library `name`.
pub fn library(name: &str) -> Result<&'static str> {
    LIBRARIES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, source)| *source)
        .ok_or_else(|| ScanError::UnknownLibrary(name.to_string()))
}

/// Names of every embedded library.
pub fn names() -> impl Iterator<Item = &'static str> {
    LIBRARIES.iter().map(|(name, _)| *name)
}
