use crate::selector::GenericSelector;
use k8s_openapi::api::core::v1::Container;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Declares init containers to inject into pods that mount matching PVCs.
///
/// The three lists reference each other by name. Names are resolved when a
/// pod is admitted, so a dangling reference only disables that binding.
#[derive(Clone, Debug, Default, PartialEq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "storage.kubesphere.io",
    version = "v1alpha1",
    kind = "Initializer"
)]
#[serde(rename_all = "camelCase")]
pub struct InitializerSpec {
    /// Gates the whole rule set.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub init_containers: Vec<Container>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pvc_matchers: Vec<PvcMatcher>,

    /// Bindings, evaluated in order; the first matching binding wins.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pvc_initializers: Vec<PvcInitializer>,
}

/// Filters PVCs. Each selector is optional and an absent selector always
/// passes, so a matcher without selectors matches every PVC.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PvcMatcher {
    pub name: String,

    #[serde(default, alias = "pvc", skip_serializing_if = "Option::is_none")]
    pub pvc_selector: Option<GenericSelector>,

    /// Applied to the pod being admitted.
    #[serde(default, alias = "pod", skip_serializing_if = "Option::is_none")]
    pub pod_selector: Option<GenericSelector>,

    #[serde(default, alias = "storageClass", skip_serializing_if = "Option::is_none")]
    pub storage_class_selector: Option<GenericSelector>,

    #[serde(default, alias = "namespace", skip_serializing_if = "Option::is_none")]
    pub namespace_selector: Option<GenericSelector>,

    /// Applied to the tenant workspace named by the namespace's workspace
    /// label. Skipped when the namespace has no such label.
    #[serde(default, alias = "workspace", skip_serializing_if = "Option::is_none")]
    pub workspace_selector: Option<GenericSelector>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PvcInitializer {
    pub pvc_matcher_name: String,

    pub init_container_name: String,

    /// Directory under which the volume is mounted in the init container.
    /// Defaults to `/`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_path_root: Option<String>,
}

// === impl InitializerSpec ===

impl InitializerSpec {
    pub fn matcher(&self, name: &str) -> Option<&PvcMatcher> {
        self.pvc_matchers.iter().find(|m| m.name == name)
    }

    pub fn init_container(&self, name: &str) -> Option<&Container> {
        self.init_containers.iter().find(|c| c.name == name)
    }
}
