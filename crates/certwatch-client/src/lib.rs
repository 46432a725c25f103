//! # Certwatch Client
//! 
//! HTTP access to the Certwatch API and the asset resolver that turns
//! protected image downloads into revocable local handles.

pub mod api;
pub mod assets;
pub mod auth;
pub mod error;
pub mod models;

pub use api::ApiClient;
pub use assets::{AssetFetcher, AssetMap, AssetResolver, AssetStatus, ObjectUrl, ObjectUrlRegistry, ResourceDescriptor, ResourceId};
pub use auth::AuthFlow;
pub use error::{ClientError, FetchError};
