use crate::{
    k8s::{Initializer, ObjectMeta, PersistentVolumeClaim},
    Error,
};
use ahash::AHashMap as HashMap;
use std::{fmt, sync::Arc};
use tracing::trace;

/// Cluster-scoped kinds whose metadata a rule may select on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    StorageClass,
    Namespace,
    Workspace,
}

/// Reads the cluster objects a decision depends on.
///
/// Implementations must be usable from concurrent decisions and must not
/// retry: a failed read fails the decision.
#[async_trait::async_trait]
pub trait ClusterLookup: Send + Sync {
    /// Lists all `Initializer` rule sets in the order the store returns them.
    async fn list_initializers(&self) -> anyhow::Result<Vec<Initializer>>;

    async fn get_pvc(&self, namespace: &str, name: &str) -> anyhow::Result<PersistentVolumeClaim>;

    /// Gets the metadata of a cluster-scoped object.
    async fn get_metadata(&self, kind: Kind, name: &str) -> anyhow::Result<ObjectMeta>;
}

/// Lookups performed on behalf of a single decision.
///
/// Cluster-scoped metadata doesn't change over the course of a decision, so
/// each object is fetched at most once.
pub(crate) struct Scope<'a, L: ?Sized> {
    lookup: &'a L,
    workspace_label: &'a str,
    metadata: HashMap<(Kind, String), Arc<ObjectMeta>>,
}

// === impl Kind ===

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StorageClass => "StorageClass",
            Self::Namespace => "Namespace",
            Self::Workspace => "Workspace",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// === impl Scope ===

impl<'a, L: ClusterLookup + ?Sized> Scope<'a, L> {
    pub(crate) fn new(lookup: &'a L, workspace_label: &'a str) -> Self {
        Self {
            lookup,
            workspace_label,
            metadata: HashMap::default(),
        }
    }

    pub(crate) fn workspace_label(&self) -> &'a str {
        self.workspace_label
    }

    pub(crate) async fn initializers(&self) -> Result<Vec<Initializer>, Error> {
        self.lookup
            .list_initializers()
            .await
            .map_err(Error::ListInitializers)
    }

    pub(crate) async fn pvc(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<PersistentVolumeClaim, Error> {
        self.lookup
            .get_pvc(namespace, name)
            .await
            .map_err(|source| Error::GetPvc {
                namespace: namespace.to_string(),
                name: name.to_string(),
                source,
            })
    }

    pub(crate) async fn metadata(&mut self, kind: Kind, name: &str) -> Result<Arc<ObjectMeta>, Error> {
        let key = (kind, name.to_string());
        if let Some(meta) = self.metadata.get(&key) {
            trace!(%kind, %name, "Cached");
            return Ok(meta.clone());
        }

        let meta = self
            .lookup
            .get_metadata(kind, name)
            .await
            .map_err(|source| Error::Lookup {
                kind,
                name: name.to_string(),
                source,
            })?;
        let meta = Arc::new(meta);
        self.metadata.insert(key, meta.clone());
        Ok(meta)
    }
}
