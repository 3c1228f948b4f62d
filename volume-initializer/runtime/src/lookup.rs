use crate::{
    core::{ClusterLookup, Kind},
    k8s::{Initializer, Namespace, ObjectMeta, PersistentVolumeClaim, StorageClass, Workspace},
};
use kube::{
    api::{Api, ListParams},
    Client, Resource,
};
use serde::de::DeserializeOwned;
use std::fmt::Debug;

/// Reads objects directly from the API server.
///
/// There is no watch or cache: every call is a request, bounded only by the
/// caller's deadline.
#[derive(Clone)]
pub struct KubeLookup {
    client: Client,
}

impl KubeLookup {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn cluster_metadata<K>(&self, name: &str) -> kube::Result<ObjectMeta>
    where
        K: Resource<DynamicType = ()> + Clone + Debug + DeserializeOwned,
    {
        let meta = Api::<K>::all(self.client.clone()).get_metadata(name).await?;
        Ok(meta.metadata)
    }
}

#[async_trait::async_trait]
impl ClusterLookup for KubeLookup {
    async fn list_initializers(&self) -> anyhow::Result<Vec<Initializer>> {
        let list = Api::<Initializer>::all(self.client.clone())
            .list(&ListParams::default())
            .await?;
        Ok(list.items)
    }

    async fn get_pvc(&self, namespace: &str, name: &str) -> anyhow::Result<PersistentVolumeClaim> {
        let pvc = Api::<PersistentVolumeClaim>::namespaced(self.client.clone(), namespace)
            .get(name)
            .await?;
        Ok(pvc)
    }

    async fn get_metadata(&self, kind: Kind, name: &str) -> anyhow::Result<ObjectMeta> {
        let meta = match kind {
            Kind::StorageClass => self.cluster_metadata::<StorageClass>(name).await?,
            Kind::Namespace => self.cluster_metadata::<Namespace>(name).await?,
            Kind::Workspace => self.cluster_metadata::<Workspace>(name).await?,
        };
        Ok(meta)
    }
}
