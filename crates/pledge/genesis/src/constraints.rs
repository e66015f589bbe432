//! Close constraints declared in a Genesis Key.

use pledge_state::compute_commitment_state;
use pledge_types::{is_agent, Commitment, ConstraintKind, OpPayload, OpType, Operation, ValidationError};
use serde_json::Value;

use crate::pattern::ActorPattern;
use crate::policy::{Constraints, GenesisKey, ValidationConstraint};

/// A constraint that blocked a close-class operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstraintViolation {
    pub constraint: ConstraintKind,
    pub message: String,
}

impl From<ConstraintViolation> for ValidationError {
    fn from(v: ConstraintViolation) -> Self {
        ValidationError::ConstraintViolated {
            constraint: v.constraint,
            message: v.message,
        }
    }
}

/// Check the constraints that apply when `actor` performs `op` on
/// `commitment`. Only close-class operations are constrained.
pub fn check_constraints(
    genesis: &GenesisKey,
    commitment: &Commitment,
    actor: &str,
    op: OpType,
    ops: &[Operation],
) -> Result<(), ConstraintViolation> {
    let Some(constraints) = &genesis.constraints else {
        return Ok(());
    };
    if !op.is_close_class() {
        return Ok(());
    }

    check_claim(constraints, commitment, actor, op, ops)?;
    check_human(constraints, commitment, actor, op, ops)?;
    check_validation(constraints, commitment, ops)
}

fn check_claim(
    constraints: &Constraints,
    commitment: &Commitment,
    actor: &str,
    op: OpType,
    ops: &[Operation],
) -> Result<(), ConstraintViolation> {
    if op != OpType::Close {
        return Ok(());
    }
    for constraint in &constraints.require_claim {
        if !constraint.rule.matches(commitment, ops) {
            continue;
        }
        let owner = compute_commitment_state(ops, &commitment.id).owner;
        if owner.as_deref() != Some(actor) {
            return Err(ConstraintViolation {
                constraint: ConstraintKind::RequireClaim,
                message: "Must claim commitment before closing".into(),
            });
        }
    }
    Ok(())
}

fn check_human(
    constraints: &Constraints,
    commitment: &Commitment,
    actor: &str,
    op: OpType,
    ops: &[Operation],
) -> Result<(), ConstraintViolation> {
    if !is_agent(actor) {
        return Ok(());
    }
    let blocked = constraints
        .require_human
        .iter()
        .any(|c| c.operation == op && c.rule.matches(commitment, ops));
    if !blocked {
        return Ok(());
    }

    let label = commitment
        .tags
        .as_deref()
        .and_then(|tags| tags.first())
        .map(String::as_str)
        .unwrap_or("these");
    Err(ConstraintViolation {
        constraint: ConstraintKind::RequireHuman,
        message: format!("{} commitments require human to {}", capitalize(label), op),
    })
}

fn check_validation(
    constraints: &Constraints,
    commitment: &Commitment,
    ops: &[Operation],
) -> Result<(), ConstraintViolation> {
    for constraint in &constraints.require_validation {
        if constraint.rule.matches(commitment, ops) && !has_validation(constraint, commitment, ops) {
            return Err(ConstraintViolation {
                constraint: ConstraintKind::RequireValidation,
                message: "Commitment requires validation before close".into(),
            });
        }
    }
    Ok(())
}

/// A passing `validation` capture referencing the commitment, recorded by an
/// actor the constraint accepts.
fn has_validation(constraint: &ValidationConstraint, commitment: &Commitment, ops: &[Operation]) -> bool {
    let any = ActorPattern::any();
    let validator = constraint.validator.as_ref().unwrap_or(&any);

    ops.iter().any(|op| {
        let OpPayload::Capture(p) = &op.payload else {
            return false;
        };
        if p.kind.as_deref() != Some("validation") || !validator.matches(&op.actor) {
            return false;
        }
        let referenced = p
            .refs
            .as_deref()
            .is_some_and(|refs| refs.iter().any(|r| *r == commitment.id));
        let meta = p.meta.as_ref();
        let validates = meta
            .and_then(|m| m.get("validates"))
            .and_then(Value::as_str)
            == Some(commitment.id.as_str());
        let passed = meta.is_some_and(|m| {
            m.get("approved") == Some(&Value::Bool(true)) || m.get("passed") == Some(&Value::Bool(true))
        });
        (referenced || validates) && passed
    })
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pledge_state::get_commitment;
    use pledge_types::{CapturePayload, ClaimPayload, CommitPayload, Meta};
    use serde_json::json;

    fn genesis(yaml: &str) -> GenesisKey {
        GenesisKey::from_yaml_str(yaml).unwrap()
    }

    fn setup(tags: Option<Vec<&str>>) -> (Vec<Operation>, String) {
        let mem = Operation::new(
            "alice",
            "ws",
            OpPayload::Capture(CapturePayload {
                body: "bug".into(),
                ..Default::default()
            }),
        );
        let cmt = Operation::new(
            "alice",
            "ws",
            OpPayload::Commit(CommitPayload {
                body: "fix".into(),
                source: mem.id.clone(),
                tags: tags.map(|t| t.into_iter().map(String::from).collect()),
                meta: None,
            }),
        );
        let id = cmt.id.clone();
        (vec![mem, cmt], id)
    }

    fn validation(actor: &str, cmt: &str, meta: serde_json::Value) -> Operation {
        let meta: Meta = serde_json::from_value(meta).unwrap();
        Operation::new(
            actor,
            "ws",
            OpPayload::Capture(CapturePayload {
                body: "checks passed".into(),
                kind: Some("validation".into()),
                refs: Some(vec![cmt.into()]),
                meta: Some(meta),
                ..Default::default()
            }),
        )
    }

    #[test]
    fn require_claim_needs_current_owner() {
        let key = genesis("constraints:\n  require_claim:\n    - match: all\n");
        let (mut ops, id) = setup(None);
        let cmt = get_commitment(&ops, &id).unwrap();

        let err = check_constraints(&key, &cmt, "bob", OpType::Close, &ops).unwrap_err();
        assert_eq!(err.constraint, ConstraintKind::RequireClaim);
        assert_eq!(err.message, "Must claim commitment before closing");
        assert_eq!(ValidationError::from(err).code(), "E_NOT_OWNER");

        ops.push(Operation::new(
            "bob",
            "ws",
            OpPayload::Claim(ClaimPayload { commitment: id.clone() }),
        ));
        let cmt = get_commitment(&ops, &id).unwrap();
        assert!(check_constraints(&key, &cmt, "bob", OpType::Close, &ops).is_ok());
        // Approval is not gated by ownership.
        assert!(check_constraints(&key, &cmt, "carol", OpType::Approve, &ops).is_ok());
    }

    #[test]
    fn require_human_blocks_agents_with_tag_label() {
        let key = genesis(
            "constraints:\n  require_human:\n    - operation: close\n      match:\n        tags: [security]\n",
        );
        let (ops, id) = setup(Some(vec!["security"]));
        let cmt = get_commitment(&ops, &id).unwrap();

        let err = check_constraints(&key, &cmt, "agent:claude", OpType::Close, &ops).unwrap_err();
        assert_eq!(err.constraint, ConstraintKind::RequireHuman);
        assert_eq!(err.message, "Security commitments require human to close");
        assert!(check_constraints(&key, &cmt, "alice", OpType::Close, &ops).is_ok());
        // Entry targets close only.
        assert!(check_constraints(&key, &cmt, "agent:claude", OpType::Approve, &ops).is_ok());
    }

    #[test]
    fn require_human_on_untagged_commitment() {
        let key = genesis("constraints:\n  require_human:\n    - operation: approve\n      match: all\n");
        let (ops, id) = setup(None);
        let cmt = get_commitment(&ops, &id).unwrap();
        let err = check_constraints(&key, &cmt, "bot:ci", OpType::Approve, &ops).unwrap_err();
        assert_eq!(err.message, "These commitments require human to approve");
    }

    #[test]
    fn require_validation_wants_passing_capture_from_validator() {
        let key = genesis(
            "constraints:\n  require_validation:\n    - match: all\n      validator: \"bot:*\"\n",
        );
        let (mut ops, id) = setup(None);
        let cmt = get_commitment(&ops, &id).unwrap();
        let err = check_constraints(&key, &cmt, "alice", OpType::Close, &ops).unwrap_err();
        assert_eq!(err.constraint, ConstraintKind::RequireValidation);

        ops.push(validation("bot:ci", &id, json!({"passed": false})));
        ops.push(validation("alice", &id, json!({"passed": true})));
        assert!(check_constraints(&key, &cmt, "alice", OpType::Close, &ops).is_err());

        ops.push(validation("bot:ci", &id, json!({"approved": true})));
        assert!(check_constraints(&key, &cmt, "alice", OpType::Close, &ops).is_ok());
    }

    #[test]
    fn validation_can_reference_through_meta() {
        let key = genesis("constraints:\n  require_validation:\n    - match: all\n");
        let (mut ops, id) = setup(None);
        let cmt = get_commitment(&ops, &id).unwrap();
        ops.push(Operation::new(
            "carol",
            "ws",
            OpPayload::Capture(CapturePayload {
                body: "reviewed".into(),
                kind: Some("validation".into()),
                meta: Some(serde_json::from_value(json!({"validates": id, "passed": true})).unwrap()),
                ..Default::default()
            }),
        ));
        assert!(check_constraints(&key, &cmt, "alice", OpType::Close, &ops).is_ok());
    }

    #[test]
    fn empty_match_constrains_nothing() {
        let key = genesis("constraints:\n  require_claim:\n    - match: {}\n");
        let (ops, id) = setup(None);
        let cmt = get_commitment(&ops, &id).unwrap();
        assert!(check_constraints(&key, &cmt, "bob", OpType::Close, &ops).is_ok());
    }

    #[test]
    fn capitalize_handles_unicode() {
        assert_eq!(capitalize("security"), "Security");
        assert_eq!(capitalize("élan"), "Élan");
        assert_eq!(capitalize(""), "");
    }
}
