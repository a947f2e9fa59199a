//! Reconciliation engine: the default-patch catalog, the patch engine that
//! applies and restores objects, the sidecar restore store, the pair
//! resolver, and the pure firing-state derivation. None of this talks to a
//! live cluster directly — everything goes through [`ClusterClient`], so
//! the same code path is exercised in tests against an in-memory double.

pub mod cluster;
pub mod error;
pub mod pair;
pub mod patch;
pub mod restore;
pub mod state;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use cluster::ClusterClient;
pub use error::CoreError;
pub use pair::find_sleep_half;
pub use patch::engine::{fire, FiringOutcome};
pub use patch::PatchTarget;
pub use state::{derive_operation, evaluate, Due, WallField};
