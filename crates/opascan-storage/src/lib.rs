//! opascan-storage: document sources for opascan
//!
//! Reads raw IaC documents and Rego rule modules from local disk or S3, and
//! writes scan results back.
//!
//! ## Layer 0 - Storage
//!
//! Focus: uniform list/read/write over heterogeneous backends, and a clear
//! split between "nothing there" and transport failures.
//!
//! ## Key Components
//!
//! - `DocumentSource`: the read/list/write contract
//! - `LocalSource`: filesystem paths
//! - `ObjectStorageSource` + `S3Client`: `s3://bucket/prefix` locations
//! - `SourceRouter`: picks a source from the URI scheme

mod error;
pub mod fakes;
mod local;
mod object;
mod router;
mod s3;
pub mod storage_traits;

pub use error::StorageError;
pub use local::LocalSource;
pub use object::{is_object_uri, ObjectStorageSource, S3Url, S3_SCHEME};
pub use router::{SourceKind, SourceRouter};
pub use s3::S3Client;
pub use storage_traits::{
    Document, DocumentSource, NamePattern, ObjectLocation, ObjectStoreClient, StorageResult,
    JSON_PATTERN, REGO_PATTERN,
};
