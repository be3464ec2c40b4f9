//! Contact directory for the Obrol chat client.
//!
//! Resolves the list of people the local user can message. The strategy
//! is role-dependent:
//!
//! - Workers see only their recent counterparts, resolved from a locally
//!   persisted recency list ([`RecencyStore`]).
//! - Farmers see the full worker roster from the backend.
//!
//! Query input is debounced ([`QueryDebouncer`]) and slow responses are
//! dropped when a newer load has started. Every failure path degrades to
//! an empty list; directory errors are never surfaced to the user.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod api;
mod debounce;
mod directory;
mod store;

#[cfg(feature = "rest")]
pub mod rest;

pub use api::{ApiError, Profile, RosterApi};
pub use debounce::{QueryDebouncer, DEFAULT_DEBOUNCE};
pub use directory::{Directory, Role};
pub use store::{JsonFileStore, MemoryStore, RecencyStore, RECENCY_CAP};
