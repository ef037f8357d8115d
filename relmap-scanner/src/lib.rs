pub mod client;
pub mod document;
pub mod error;
pub mod link;
pub mod path;

pub use client::{ApiClient, HttpApiClient};
pub use document::Document;
pub use error::ScanError;
pub use link::{Link, LinkExtractor};
pub use path::{CanonicalPath, PathNormalizer};
