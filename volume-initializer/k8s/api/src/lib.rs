#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod initializer;
pub mod labels;
pub mod selector;
pub mod validation;
pub mod workspace;

pub use self::{
    initializer::{Initializer, InitializerSpec, PvcInitializer, PvcMatcher},
    selector::{FieldKey, FieldOperator, FieldSelectorRequirement, GenericSelector},
    workspace::{Workspace, WorkspaceSpec},
};
pub use k8s_openapi::{
    api::{
        self,
        core::v1::{
            Container, EnvVar, Namespace, PersistentVolumeClaim, PersistentVolumeClaimSpec, Pod,
            PodSpec, Volume, VolumeMount,
        },
        storage::v1::StorageClass,
    },
    apimachinery::pkg::apis::meta::v1::LabelSelectorRequirement,
};
pub use kube::{core::ObjectMeta, ResourceExt};

/// The Namespace label naming the tenant Workspace that owns the namespace.
pub const WORKSPACE_LABEL: &str = "kubesphere.io/workspace";
