#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Decides which init containers to inject into a pod based on the
//! `Initializer` rule sets that match the PVCs it mounts.

mod decision;
mod lookup;
mod matcher;
pub mod patch;
mod registry;
pub mod selector;


pub use self::{
    lookup::{ClusterLookup, Kind},
    registry::ReferenceError,
};
pub use volume_initializer_k8s_api as k8s;

use std::sync::Arc;
use thiserror::Error;

/// Always set on generated init containers: the directory where the volume
/// is mounted.
pub const ENV_MOUNT_PATH: &str = "PVC_1_MOUNT_PATH";
pub const ENV_UID: &str = "PVC_1_UID";
pub const ENV_GID: &str = "PVC_1_GID";

/// Pod labels carrying the owner for all volumes. A label prefixed with
/// `<volume>.` overrides the value for a single volume.
pub const LABEL_VOLUME_UID: &str = "volume.storage.kubesphere.io/uid";
pub const LABEL_VOLUME_GID: &str = "volume.storage.kubesphere.io/gid";

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to list Initializers: {0}")]
    ListInitializers(#[source] anyhow::Error),

    #[error("failed to get PersistentVolumeClaim {namespace}/{name}: {source}")]
    GetPvc {
        namespace: String,
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to get {kind} {name}: {source}")]
    Lookup {
        kind: Kind,
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to encode patch: {0}")]
    Patch(#[from] serde_json::Error),
}

/// Evaluates admission decisions against the cluster.
///
/// The engine holds no state between decisions. Every decision lists the
/// rule sets afresh and memoizes lookups only for its own duration.
#[derive(Debug)]
pub struct Engine<L: ?Sized> {
    workspace_label: Arc<str>,
    lookup: Arc<L>,
}

// === impl Engine ===

impl<L: ?Sized> Engine<L> {
    pub fn new(lookup: Arc<L>) -> Self {
        Self {
            workspace_label: k8s::WORKSPACE_LABEL.into(),
            lookup,
        }
    }

    /// Overrides the namespace label that names the tenant workspace.
    pub fn with_workspace_label(mut self, label: impl Into<Arc<str>>) -> Self {
        self.workspace_label = label.into();
        self
    }
}

impl<L: ?Sized> Clone for Engine<L> {
    fn clone(&self) -> Self {
        Self {
            workspace_label: self.workspace_label.clone(),
            lookup: self.lookup.clone(),
        }
    }
}
