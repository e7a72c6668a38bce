//! Cirrus State Management
//!
//! Persists the identifiers and last known attributes of managed resources,
//! with locking so that two runs never modify the same state concurrently.
//!
//! - **StateFile**: all managed resources, in creation order
//! - **StateBackend**: trait for state storage (currently a local JSON file)
//! - **LockInfo**: who holds the state lock, and until when
//!
//! # Example
//!
//! ```ignore
//! use cirrus_state::{create_backend, BackendConfig};
//!
//! let backend = create_backend(&BackendConfig::local("cirrus.state.json")).await?;
//!
//! let lock = backend.acquire_lock("apply").await?;
//! let mut state = backend.read_state().await?.unwrap_or_default();
//!
//! // ... apply changes, upsert resources ...
//!
//! state.increment_serial();
//! backend.write_state(&state).await?;
//! backend.release_lock(&lock).await?;
//! ```

pub mod backend;
pub mod backends;
pub mod lock;
pub mod state;

pub use backend::{BackendConfig, BackendError, BackendResult, StateBackend};
pub use backends::{LocalBackend, create_backend};
pub use lock::LockInfo;
pub use state::{ResourceState, StateFile};
