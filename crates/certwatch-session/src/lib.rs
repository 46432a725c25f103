//! # Certwatch Session
//! 
//! Client-side session state: token claims, token persistence, the session
//! manager and the route guards that read its snapshots.
//!
//! Token claims are decoded but never verified here. The server enforces
//! authorization on every request; the flags derived from a session only
//! drive what the console offers to show.

pub mod token;
pub mod store;
pub mod session;
pub mod guard;

pub use guard::{Access, GuardDecision, Route};
pub use session::{Session, SessionManager, SessionState, TokenSource};
pub use store::{FileTokenStore, MemoryTokenStore, StoreError, TokenStore};
pub use token::{Claims, TokenError};
