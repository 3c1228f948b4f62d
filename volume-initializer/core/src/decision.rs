use crate::{
    k8s::{labels::Map, Container, EnvVar, Pod, ResourceExt, VolumeMount},
    lookup::{ClusterLookup, Scope},
    patch, registry, Engine, Error, ENV_GID, ENV_MOUNT_PATH, ENV_UID, LABEL_VOLUME_GID,
    LABEL_VOLUME_UID,
};
use ahash::AHashSet;
use tracing::{debug, info, warn};

const DEFAULT_MOUNT_PATH_ROOT: &str = "/";

// === impl Engine ===

impl<L: ClusterLookup + ?Sized> Engine<L> {
    /// Returns the patch to apply to `pod`, if any of its PVCs match a rule.
    ///
    /// The pod's namespace must be set; admission requests may omit it from
    /// the object.
    pub async fn decide(&self, pod: &Pod) -> Result<Option<json_patch::Patch>, Error> {
        let containers = self.init_containers(pod).await?;
        if containers.is_empty() {
            return Ok(None);
        }
        let patch = patch::init_containers(&containers)?;
        Ok(Some(patch))
    }

    /// Builds an init container for each PVC-backed volume with a matching
    /// rule, in volume order.
    pub async fn init_containers(&self, pod: &Pod) -> Result<Vec<Container>, Error> {
        let spec = match pod.spec.as_ref() {
            Some(spec) => spec,
            None => return Ok(vec![]),
        };
        let volumes = spec.volumes.as_deref().unwrap_or_default();
        if volumes.is_empty() {
            return Ok(vec![]);
        }

        let ns = pod.namespace().unwrap_or_default();
        let mut scope = Scope::new(&*self.lookup, &self.workspace_label);
        let initializers = scope.initializers().await?;

        let mut names = spec
            .containers
            .iter()
            .map(|c| c.name.clone())
            .collect::<AHashSet<_>>();
        let pod_labels = pod.labels();

        let mut containers = Vec::new();
        for volume in volumes {
            let Some(claim) = volume.persistent_volume_claim.as_ref() else {
                continue;
            };

            let pvc = scope.pvc(&ns, &claim.claim_name).await?;
            let resolved = registry::resolve(&pvc, pod, &initializers, &mut scope).await?;
            let Some(resolved) = resolved else {
                info!(pvc = %claim.claim_name, "No initContainer matches");
                continue;
            };

            let root = resolved
                .mount_path_root
                .filter(|root| !root.is_empty())
                .unwrap_or(DEFAULT_MOUNT_PATH_ROOT);

            let mut container = resolved.container.clone();
            container.name = format!("{}-vol-{}", container.name, volume.name);
            if !names.insert(container.name.clone()) {
                warn!(container = %container.name, "initContainer already exists in pod or patch");
                continue;
            }

            let mount_path = join_path(root, &volume.name);
            container
                .volume_mounts
                .get_or_insert_with(Vec::new)
                .push(VolumeMount {
                    name: volume.name.clone(),
                    mount_path: mount_path.clone(),
                    ..Default::default()
                });

            let env = container.env.get_or_insert_with(Vec::new);
            env.push(env_var(ENV_MOUNT_PATH, mount_path));
            let (uid, gid) = volume_owner(pod_labels, &volume.name);
            if let Some(uid) = uid {
                env.push(env_var(ENV_UID, uid));
            }
            if let Some(gid) = gid {
                env.push(env_var(ENV_GID, gid));
            }

            debug!(
                initializer = %resolved.initializer,
                container = %container.name,
                volume = %volume.name,
                "Adding initContainer",
            );
            containers.push(container);
        }

        Ok(containers)
    }
}

fn env_var(name: &str, value: impl Into<String>) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.into()),
        ..Default::default()
    }
}

/// Reads the owner UID and GID for a volume from pod labels. Per-volume labels
/// take precedence over the pod-wide ones; empty values are dropped.
fn volume_owner<'l>(labels: &'l Map, volume: &str) -> (Option<&'l str>, Option<&'l str>) {
    fn get<'l>(labels: &'l Map, volume: &str, label: &str) -> Option<&'l str> {
        labels
            .get(&format!("{volume}.{label}"))
            .or_else(|| labels.get(label))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    (
        get(labels, volume, LABEL_VOLUME_UID),
        get(labels, volume, LABEL_VOLUME_GID),
    )
}

/// Joins path elements with `/` and lexically cleans the result.
fn join_path(root: &str, name: &str) -> String {
    let rooted = root.starts_with('/') || (root.is_empty() && name.starts_with('/'));

    let mut segments = Vec::<&str>::new();
    for seg in root.split('/').chain(name.split('/')) {
        match seg {
            "" | "." => {}
            ".." => match segments.last() {
                Some(last) if *last != ".." => {
                    segments.pop();
                }
                _ if rooted => {}
                _ => segments.push(".."),
            },
            seg => segments.push(seg),
        }
    }

    let path = segments.join("/");
    if rooted {
        format!("/{path}")
    } else if path.is_empty() {
        ".".to_string()
    } else {
        path
    }
}
