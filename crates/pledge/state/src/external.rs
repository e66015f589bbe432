//! External references recorded as annotations on commitments.

use pledge_types::{ExternalRef, OpPayload, Operation};

/// External references attached to a commitment, in log order.
pub fn external_refs(ops: &[Operation], commitment_id: &str) -> Vec<ExternalRef> {
    ops.iter()
        .filter_map(|op| match &op.payload {
            OpPayload::Annotate(p) if p.target == commitment_id => {
                ExternalRef::from_annotation_meta(p.meta.as_ref()?)
            }
            _ => None,
        })
        .collect()
}

/// Reference to `system` on a commitment. The first one recorded wins.
pub fn external_ref(ops: &[Operation], commitment_id: &str, system: &str) -> Option<ExternalRef> {
    external_refs(ops, commitment_id)
        .into_iter()
        .find(|r| r.system == system)
}

pub fn has_external_ref(ops: &[Operation], commitment_id: &str, system: &str) -> bool {
    external_ref(ops, commitment_id, system).is_some()
}

/// Every `(commitment id, reference)` pair for `system`.
pub fn commitments_with_external_ref(ops: &[Operation], system: &str) -> Vec<(String, ExternalRef)> {
    ops.iter()
        .filter_map(|op| match &op.payload {
            OpPayload::Annotate(p) => {
                let external = ExternalRef::from_annotation_meta(p.meta.as_ref()?)?;
                (external.system == system).then(|| (p.target.clone(), external))
            }
            _ => None,
        })
        .collect()
}
