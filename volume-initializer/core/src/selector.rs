use crate::k8s::{
    labels::{self, Map},
    FieldKey, FieldOperator, GenericSelector, ObjectMeta,
};
use tracing::warn;

/// Checks whether an object's metadata satisfies every field and label
/// requirement of `selector`.
///
/// Unsupported field requirements are ignored. A label selector that fails to
/// compile never matches.
pub fn matches(selector: &GenericSelector, meta: &ObjectMeta) -> bool {
    for req in selector.fields() {
        let Some((key, op)) = req.supported() else {
            continue;
        };

        let value = match key {
            FieldKey::Name => meta.name.as_deref(),
            FieldKey::Namespace => meta.namespace.as_deref(),
        }
        .unwrap_or_default();

        let listed = req.values().iter().any(|v| v == value);
        let ok = match op {
            FieldOperator::In => listed,
            FieldOperator::NotIn => !listed,
        };
        if !ok {
            return false;
        }
    }

    let requirements = selector.label_requirements();
    if requirements.is_empty() {
        return true;
    }

    match labels::Selector::compile(requirements) {
        Ok(labels) => {
            let empty = Map::new();
            labels.matches(meta.labels.as_ref().unwrap_or(&empty))
        }
        Err(error) => {
            warn!(%error, ?requirements, "Invalid label selector");
            false
        }
    }
}
