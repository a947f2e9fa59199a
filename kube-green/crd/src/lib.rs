//! The `SleepInfo` custom resource and its wire-contract annotations.
//!
//! This crate only defines shapes; the reconciliation semantics live in
//! `kube-green-core`.

pub mod annotations;
pub mod operation;
pub mod sleep_info;

pub use annotations::{pair_id, pair_role, PairRole, PAIR_ID, PAIR_ROLE};
pub use operation::Operation;
pub use sleep_info::{
    AuthorPatch, LabelMatch, PatchTargetRef, SleepInfo, SleepInfoSpec, SleepInfoStatus,
};
