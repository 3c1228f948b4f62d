use crate::k8s::Container;
use json_patch::{jsonptr::PointerBuf, AddOperation, Patch, PatchOperation};

/// Builds a JSON patch that sets the pod's init containers to `containers`.
///
/// The `add` targets the list itself rather than appending to it, so any init
/// containers already on the pod are replaced. Pods are normally created
/// without init containers set by earlier admission steps.
//
// TODO: append to `/spec/initContainers/-` when the pod already declares init
// containers, once it is clear whether generated containers should run before
// or after them.
pub fn init_containers(containers: &[Container]) -> Result<Patch, serde_json::Error> {
    let value = serde_json::to_value(containers)?;
    Ok(Patch(vec![PatchOperation::Add(AddOperation {
        path: PointerBuf::from_tokens(["spec", "initContainers"]),
        value,
    })]))
}
