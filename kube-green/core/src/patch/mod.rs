//! The closed set of patchable kinds and the shapes a catalog entry can
//! take (spec.md §4.3, §4.7).

pub mod catalog;
pub mod engine;
pub mod merge;

use kube::core::ApiResource;
use kube_green_crd::PatchTargetRef;

use crate::cluster::api_resource;

/// Every kind the engine knows how to suspend/wake, plus an escape hatch
/// for author-supplied targets (spec.md §2's component table rows 5-7 and
/// the `patches` field).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PatchTarget {
    Deployment,
    StatefulSet,
    CronJob,
    PgBouncer,
    PgCluster,
    HdfsCluster,
    Author(PatchTargetRef),
}

impl PatchTarget {
    pub fn group(&self) -> &str {
        match self {
            PatchTarget::Deployment | PatchTarget::StatefulSet => "apps",
            PatchTarget::CronJob => "batch",
            PatchTarget::PgBouncer | PatchTarget::PgCluster => "postgres.stratio.com",
            PatchTarget::HdfsCluster => "hdfs.stratio.com",
            PatchTarget::Author(r) => &r.group,
        }
    }

    pub fn version(&self) -> &str {
        match self {
            PatchTarget::Author(_) => "v1",
            _ => "v1",
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            PatchTarget::Deployment => "Deployment",
            PatchTarget::StatefulSet => "StatefulSet",
            PatchTarget::CronJob => "CronJob",
            PatchTarget::PgBouncer => "PgBouncer",
            PatchTarget::PgCluster => "PgCluster",
            PatchTarget::HdfsCluster => "HDFSCluster",
            PatchTarget::Author(r) => &r.kind,
        }
    }

    /// Naive English pluralization. Sufficient for the closed builtin set;
    /// author targets must spell their kind so this still yields a sane
    /// guess (`"Widget"` -> `"widgets"`).
    pub fn plural(&self) -> String {
        let kind = self.kind();
        match self {
            PatchTarget::HdfsCluster => "hdfsclusters".to_string(),
            _ => {
                let lower = kind.to_lowercase();
                if lower.ends_with('s') {
                    format!("{lower}es")
                } else {
                    format!("{lower}s")
                }
            }
        }
    }

    /// Whether this target is one of the three stateful CRs (spec.md §2
    /// rows 5-7), which get controller-of exemption from the default
    /// "owned by something else, skip" exclusion rule.
    pub fn is_managed_cr(&self) -> bool {
        matches!(
            self,
            PatchTarget::PgBouncer | PatchTarget::PgCluster | PatchTarget::HdfsCluster
        )
    }

    /// Whether this target is suspended/woken purely by toggling an
    /// annotation rather than a value-bearing field (spec.md §4.7: PgCluster
    /// and HDFSCluster use a `shutdown` annotation; PgBouncer instead
    /// zeroes `spec.replicas` like a Deployment).
    pub fn is_annotation_driven(&self) -> bool {
        matches!(self, PatchTarget::PgCluster | PatchTarget::HdfsCluster)
    }

    /// The restore-record key for this target (spec.md §6: `"group/Kind"`,
    /// or bare `"Kind"` for the core group).
    pub fn restore_key(&self) -> String {
        if self.group().is_empty() {
            self.kind().to_string()
        } else {
            format!("{}/{}", self.group(), self.kind())
        }
    }

    pub fn api_resource(&self) -> ApiResource {
        api_resource(self.group(), self.version(), self.kind(), &self.plural())
    }
}

/// Which RFC 6902 op a pointer patch should attempt first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForwardOp {
    Add,
    Replace,
}

impl ForwardOp {
    /// The other op, tried as a fallback when the first one doesn't apply
    /// (spec.md Design Notes §9: "a small strategy wrapper around the patch
    /// applier — try A; on a structural mismatch specific to a missing or
    /// already-present path, try B once").
    pub fn fallback(self) -> ForwardOp {
        match self {
            ForwardOp::Add => ForwardOp::Replace,
            ForwardOp::Replace => ForwardOp::Add,
        }
    }
}

/// A single-field patch addressed by JSON Pointer, the shape every builtin
/// catalog entry takes.
#[derive(Clone, Debug, PartialEq)]
pub struct PointerPatch {
    pub path: String,
    pub value: serde_json::Value,
    pub op: ForwardOp,
}

/// The body of a catalog entry: either one of our own pointer patches, or an
/// author-supplied RFC 6902 document carried through verbatim.
#[derive(Clone, Debug, PartialEq)]
pub enum PatchBody {
    Pointer(PointerPatch),
    Json(json_patch::Patch),
}

/// One fully-resolved unit of work: apply `body` to every live object of
/// `target`'s kind that isn't excluded.
#[derive(Clone, Debug, PartialEq)]
pub struct PatchEntry {
    pub target: PatchTarget,
    pub body: PatchBody,
}
