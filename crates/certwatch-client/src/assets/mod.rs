//! Protected asset resolution

mod descriptor;
mod registry;
mod resolver;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FetchError;

pub use descriptor::{ResourceDescriptor, ResourceId};
pub use registry::{ObjectUrl, ObjectUrlRegistry, RegistryStats};
pub use resolver::{AssetMap, AssetResolver, AssetStatus};

/// Authenticated transport for binary assets.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Download the payload at an API-relative locator such as `/files/a/b.png`.
    async fn fetch_asset(&self, locator: &str) -> Result<Bytes, FetchError>;
}
