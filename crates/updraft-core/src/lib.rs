pub mod backend;
pub mod catalog;
pub mod context;
pub mod error;
pub mod init;
pub mod repo;
pub mod resolver;
pub mod tag;

pub use backend::{AssetDelivery, GitHubBackend, MemoryBackend, ReleaseBackend};
pub use catalog::{FilterOptions, VersionCatalog};
pub use context::RequestContext;
pub use error::{CatalogError, Result};
pub use resolver::{UpdateCheck, UpdateQuery, UpdateResolver};

/// User Agent string for backend requests
pub const USER_AGENT: &str = concat!("updraft-core/", env!("CARGO_PKG_VERSION"));
