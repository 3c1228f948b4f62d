use crate::{
    k8s::{PersistentVolumeClaim, Pod, PvcMatcher, ResourceExt},
    lookup::{ClusterLookup, Kind, Scope},
    selector, Error,
};
use tracing::trace;

/// Evaluates a matcher against a PVC and the pod mounting it.
///
/// Checks run in order and stop at the first that fails: the PVC, the pod,
/// the PVC's storage class, its namespace, and finally the namespace's
/// workspace. Any object a configured selector needs must be readable; a
/// failed read is an error rather than a non-match.
pub(crate) async fn matches<L>(
    matcher: &PvcMatcher,
    pvc: &PersistentVolumeClaim,
    pod: &Pod,
    scope: &mut Scope<'_, L>,
) -> Result<bool, Error>
where
    L: ClusterLookup + ?Sized,
{
    if let Some(sel) = matcher.pvc_selector.as_ref() {
        if !selector::matches(sel, &pvc.metadata) {
            trace!(matcher = %matcher.name, "PVC does not match");
            return Ok(false);
        }
    }

    if let Some(sel) = matcher.pod_selector.as_ref() {
        if !selector::matches(sel, &pod.metadata) {
            trace!(matcher = %matcher.name, "Pod does not match");
            return Ok(false);
        }
    }

    // A PVC without a storage class name is not checked against the
    // selector, but an explicitly empty name never matches.
    let storage_class = pvc
        .spec
        .as_ref()
        .and_then(|spec| spec.storage_class_name.as_deref());
    if let (Some(sel), Some(sc)) = (matcher.storage_class_selector.as_ref(), storage_class) {
        if sc.is_empty() {
            return Ok(false);
        }
        let meta = scope.metadata(Kind::StorageClass, sc).await?;
        if !selector::matches(sel, &meta) {
            trace!(matcher = %matcher.name, storage_class = %sc, "StorageClass does not match");
            return Ok(false);
        }
    }

    // The Namespace is only read when a selector needs it, so a rule without
    // namespace or workspace selectors matches even when the read would fail.
    // Earlier releases always read it and failed the decision on error.
    if matcher.namespace_selector.is_none() && matcher.workspace_selector.is_none() {
        return Ok(true);
    }

    let ns = pvc
        .namespace()
        .or_else(|| pod.namespace())
        .unwrap_or_default();
    let ns_meta = scope.metadata(Kind::Namespace, &ns).await?;

    if let Some(sel) = matcher.namespace_selector.as_ref() {
        if !selector::matches(sel, &ns_meta) {
            trace!(matcher = %matcher.name, %ns, "Namespace does not match");
            return Ok(false);
        }
    }

    // Namespaces that don't belong to a workspace skip the workspace
    // selector entirely.
    if let Some(sel) = matcher.workspace_selector.as_ref() {
        let workspace = ns_meta
            .labels
            .as_ref()
            .and_then(|labels| labels.get(scope.workspace_label()));
        if let Some(ws) = workspace {
            if ws.is_empty() {
                return Ok(false);
            }
            let meta = scope.metadata(Kind::Workspace, ws).await?;
            if !selector::matches(sel, &meta) {
                trace!(matcher = %matcher.name, workspace = %ws, "Workspace does not match");
                return Ok(false);
            }
        }
    }

    Ok(true)
}
