//! # Certwatch Shared
//! 
//! Shared configuration, telemetry, constants and errors for the Certwatch console.

pub mod constants;
pub mod telemetry;
pub mod config;
pub mod error;

pub use config::AppConfig;
pub use error::AppError;
