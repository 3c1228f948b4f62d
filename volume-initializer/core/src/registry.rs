use crate::{
    k8s::{
        Container, Initializer, InitializerSpec, PersistentVolumeClaim, Pod, PvcInitializer,
        PvcMatcher, ResourceExt,
    },
    lookup::{ClusterLookup, Scope},
    matcher, Error,
};
use tracing::{debug, warn};

/// A binding whose matcher or init container name doesn't resolve within its
/// rule set. The binding is skipped.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("pvcMatcher {0:?} not found")]
    Matcher(String),

    #[error("initContainer {0:?} not found")]
    InitContainer(String),
}

/// The init container template selected for a PVC.
#[derive(Debug, PartialEq)]
pub(crate) struct Resolved<'i> {
    pub initializer: &'i str,
    pub container: &'i Container,
    pub mount_path_root: Option<&'i str>,
}

/// Finds the first binding, across enabled rule sets in listing order, whose
/// matcher selects `pvc`.
pub(crate) async fn resolve<'i, L>(
    pvc: &PersistentVolumeClaim,
    pod: &Pod,
    initializers: &'i [Initializer],
    scope: &mut Scope<'_, L>,
) -> Result<Option<Resolved<'i>>, Error>
where
    L: ClusterLookup + ?Sized,
{
    for init in initializers {
        let name = init.metadata.name.as_deref().unwrap_or_default();
        if !init.spec.enabled {
            debug!(initializer = %name, "Not enabled");
            continue;
        }

        for binding in &init.spec.pvc_initializers {
            let (pvc_matcher, container) = match resolve_binding(&init.spec, binding) {
                Ok(resolved) => resolved,
                Err(error) => {
                    warn!(%error, initializer = %name, "Skipping pvcInitializer");
                    continue;
                }
            };

            if matcher::matches(pvc_matcher, pvc, pod, scope).await? {
                debug!(
                    initializer = %name,
                    matcher = %pvc_matcher.name,
                    container = %container.name,
                    pvc = %pvc.name_any(),
                    "Matched",
                );
                return Ok(Some(Resolved {
                    initializer: name,
                    container,
                    mount_path_root: binding.mount_path_root.as_deref(),
                }));
            }
        }
    }

    Ok(None)
}

pub(crate) fn resolve_binding<'s>(
    spec: &'s InitializerSpec,
    binding: &PvcInitializer,
) -> Result<(&'s PvcMatcher, &'s Container), ReferenceError> {
    let matcher = spec
        .matcher(&binding.pvc_matcher_name)
        .ok_or_else(|| ReferenceError::Matcher(binding.pvc_matcher_name.clone()))?;
    let container = spec
        .init_container(&binding.init_container_name)
        .ok_or_else(|| ReferenceError::InitContainer(binding.init_container_name.clone()))?;
    Ok((matcher, container))
}
