//! Pre-append validation.
//!
//! Checks run in a fixed order and stop at the first failure: envelope,
//! duplicate id, duplicate source key, actor permission, then payload,
//! reference and lifecycle checks for the specific operation type.

use std::path::{Component, Path};

use pledge_state::{
    commitment_exists, compute_commitment_state, get_commitment, is_memory_source_of_commitment,
    memory_exists, record_exists, CommitmentStatus,
};
use pledge_types::ids::is_valid_id;
use pledge_types::{
    ApprovePayload, CapturePayload, ClaimPayload, ClosePayload, CommitPayload, CommitmentState,
    DismissPayload, LinkPayload, OpPayload, OpType, Operation, PublishPayload, ReleasePayload,
    ReopenPayload, SubmitPayload, TriagePayload, ValidationError,
};

use crate::constraints::check_constraints;
use crate::policy::GenesisKey;

type Result<T = ()> = std::result::Result<T, ValidationError>;

/// Validate `op` against the current log and optional policy.
pub fn validate_operation(op: &Operation, ops: &[Operation], genesis: Option<&GenesisKey>) -> Result {
    validate_envelope(op)?;

    if ops.iter().any(|existing| existing.id == op.id) {
        return Err(ValidationError::DuplicateId { id: op.id.clone() });
    }
    if let Some(key) = &op.source_key {
        if ops.iter().any(|existing| existing.source_key.as_ref() == Some(key)) {
            return Err(ValidationError::DuplicateSourceKey { key: key.clone() });
        }
    }

    if let Some(genesis) = genesis {
        if !genesis.has_permission(&op.actor, op.op_type()) {
            return Err(ValidationError::PermissionDenied {
                actor: op.actor.clone(),
                op: op.op_type(),
            });
        }
    }

    let actor = op.actor.as_str();
    match &op.payload {
        OpPayload::Capture(p) => validate_capture(p),
        OpPayload::Commit(p) => validate_commit(p, ops),
        OpPayload::Claim(p) => validate_claim(p, actor, ops),
        OpPayload::Release(p) => validate_release(p, actor, ops),
        OpPayload::Submit(p) => validate_submit(p, actor, ops),
        OpPayload::Approve(p) => validate_approve(p, actor, ops, genesis),
        OpPayload::Reopen(p) => validate_reopen(p, ops),
        OpPayload::Close(p) => validate_close(p, actor, ops, genesis),
        OpPayload::Annotate(p) => {
            require_text(&p.target, "target", false)?;
            require_text(&p.body, "body", true)?;
            if !record_exists(ops, &p.target) {
                return Err(not_found("target", &p.target));
            }
            Ok(())
        }
        OpPayload::Link(p) => validate_link(p, ops),
        OpPayload::Dismiss(p) => validate_dismiss(p, ops),
        OpPayload::Triage(p) => validate_triage(p, ops),
        OpPayload::Publish(p) => validate_publish(p, ops),
    }
}

fn validate_envelope(op: &Operation) -> Result {
    if op.id.trim().is_empty() {
        return Err(ValidationError::MissingField { field: "id" });
    }
    if op.actor.trim().is_empty() {
        return Err(ValidationError::MissingField { field: "actor" });
    }
    Ok(())
}

/// `empty_body` selects `E_EMPTY_BODY` instead of `E_MISSING_FIELD`.
fn require_text(value: &str, field: &'static str, empty_body: bool) -> Result {
    if !value.trim().is_empty() {
        return Ok(());
    }
    Err(if empty_body {
        ValidationError::EmptyBody { field }
    } else {
        ValidationError::MissingField { field }
    })
}

fn not_found(what: &'static str, id: &str) -> ValidationError {
    ValidationError::RefNotFound {
        what,
        id: id.to_string(),
    }
}

fn require_commitment(ops: &[Operation], id: &str) -> Result {
    require_text(id, "commitment", false)?;
    if !commitment_exists(ops, id) {
        return Err(not_found("commitment", id));
    }
    Ok(())
}

fn invalid_state(record: &str, message: String) -> ValidationError {
    ValidationError::InvalidState {
        record: record.to_string(),
        message,
    }
}

fn validate_capture(p: &CapturePayload) -> Result {
    require_text(&p.body, "body", true)?;
    if let Some(path) = &p.path {
        if !is_relative_document_path(path) {
            return Err(ValidationError::InvalidOp(format!(
                "path must be relative and stay inside the workspace: {path}"
            )));
        }
    }
    for r in p.refs.iter().flatten() {
        if !is_valid_id(r) {
            return Err(ValidationError::InvalidOp(format!("invalid ref format: {r}")));
        }
    }
    Ok(())
}

fn is_relative_document_path(path: &str) -> bool {
    let path = Path::new(path);
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn validate_commit(p: &CommitPayload, ops: &[Operation]) -> Result {
    require_text(&p.body, "body", true)?;
    require_text(&p.source, "source", false)?;
    if !memory_exists(ops, &p.source) {
        return Err(not_found("source memory", &p.source));
    }
    Ok(())
}

fn validate_claim(p: &ClaimPayload, actor: &str, ops: &[Operation]) -> Result {
    require_commitment(ops, &p.commitment)?;
    let status = compute_commitment_state(ops, &p.commitment);
    if status.state.is_terminal() {
        return Err(ValidationError::AlreadyClosed {
            commitment: p.commitment.clone(),
        });
    }
    if status.state == CommitmentState::InReview {
        return Err(invalid_state(
            &p.commitment,
            format!("Commitment {} is in review and cannot be claimed", p.commitment),
        ));
    }
    match status.owner {
        Some(owner) if owner != actor => Err(ValidationError::AlreadyClaimed {
            commitment: p.commitment.clone(),
            owner,
        }),
        _ => Ok(()),
    }
}

fn validate_release(p: &ReleasePayload, actor: &str, ops: &[Operation]) -> Result {
    require_commitment(ops, &p.commitment)?;
    let status = compute_commitment_state(ops, &p.commitment);
    if status.state.is_terminal() {
        return Err(ValidationError::AlreadyClosed {
            commitment: p.commitment.clone(),
        });
    }
    require_owner(&p.commitment, &status, actor)
}

fn require_owner(commitment: &str, status: &CommitmentStatus, actor: &str) -> Result {
    if status.owner.as_deref() == Some(actor) {
        return Ok(());
    }
    Err(ValidationError::NotOwner {
        commitment: commitment.to_string(),
        actor: actor.to_string(),
    })
}

fn validate_submit(p: &SubmitPayload, actor: &str, ops: &[Operation]) -> Result {
    require_commitment(ops, &p.commitment)?;
    if p.evidence.is_empty() {
        return Err(ValidationError::MissingField { field: "evidence" });
    }

    let status = compute_commitment_state(ops, &p.commitment);
    let submittable = matches!(
        status.state,
        CommitmentState::Claimed | CommitmentState::Reopened
    ) && status.owner.is_some();
    if !submittable {
        return Err(invalid_state(
            &p.commitment,
            format!(
                "Commitment must be claimed before submitting (current: {})",
                status.state
            ),
        ));
    }
    require_owner(&p.commitment, &status, actor)?;

    for evidence in &p.evidence {
        if !memory_exists(ops, evidence) {
            return Err(not_found("evidence memory", evidence));
        }
    }
    Ok(())
}

fn validate_approve(
    p: &ApprovePayload,
    actor: &str,
    ops: &[Operation],
    genesis: Option<&GenesisKey>,
) -> Result {
    require_commitment(ops, &p.commitment)?;
    let status = compute_commitment_state(ops, &p.commitment);
    if status.state != CommitmentState::InReview {
        return Err(invalid_state(
            &p.commitment,
            format!(
                "Commitment must be in_review to approve (current: {})",
                status.state
            ),
        ));
    }
    enforce_constraints(&p.commitment, actor, OpType::Approve, ops, genesis)
}

fn validate_reopen(p: &ReopenPayload, ops: &[Operation]) -> Result {
    require_commitment(ops, &p.commitment)?;
    require_text(&p.reason, "reason", false)?;
    let status = compute_commitment_state(ops, &p.commitment);
    if !matches!(
        status.state,
        CommitmentState::InReview | CommitmentState::Closed
    ) {
        return Err(invalid_state(
            &p.commitment,
            format!(
                "Commitment must be in_review or closed to reopen (current: {})",
                status.state
            ),
        ));
    }
    Ok(())
}

fn validate_close(
    p: &ClosePayload,
    actor: &str,
    ops: &[Operation],
    genesis: Option<&GenesisKey>,
) -> Result {
    require_text(&p.commitment, "commitment", false)?;
    let evidence = p.evidence.as_deref().filter(|e| !e.is_empty());
    let duplicate_of = p.duplicate_of.as_deref().filter(|d| !d.is_empty());
    match (evidence, duplicate_of) {
        (None, None) => return Err(ValidationError::MissingField { field: "evidence" }),
        (Some(_), Some(_)) => {
            return Err(ValidationError::InvalidOp(
                "cannot specify both evidence and duplicate_of".into(),
            ))
        }
        _ => {}
    }
    require_commitment(ops, &p.commitment)?;

    let status = compute_commitment_state(ops, &p.commitment);
    if status.state.is_terminal() {
        return Err(ValidationError::AlreadyClosed {
            commitment: p.commitment.clone(),
        });
    }

    if let Some(evidence) = evidence {
        if !memory_exists(ops, evidence) {
            return Err(not_found("evidence memory", evidence));
        }
    }
    if let Some(target) = duplicate_of {
        if !commitment_exists(ops, target) {
            return Err(not_found("duplicate target commitment", target));
        }
        if target == p.commitment {
            return Err(ValidationError::InvalidOp(
                "a commitment cannot duplicate itself".into(),
            ));
        }
        if status.owner.as_deref().is_some_and(|owner| owner != actor) {
            return Err(ValidationError::NotOwner {
                commitment: p.commitment.clone(),
                actor: actor.to_string(),
            });
        }
    }

    enforce_constraints(&p.commitment, actor, OpType::Close, ops, genesis)
}

fn enforce_constraints(
    commitment_id: &str,
    actor: &str,
    op: OpType,
    ops: &[Operation],
    genesis: Option<&GenesisKey>,
) -> Result {
    let Some(genesis) = genesis else {
        return Ok(());
    };
    let Some(commitment) = get_commitment(ops, commitment_id) else {
        return Ok(());
    };
    check_constraints(genesis, &commitment, actor, op, ops).map_err(ValidationError::from)
}

fn validate_link(p: &LinkPayload, ops: &[Operation]) -> Result {
    require_text(&p.source, "source", false)?;
    require_text(&p.target, "target", false)?;
    if !record_exists(ops, &p.source) {
        return Err(not_found("source", &p.source));
    }
    if !commitment_exists(ops, &p.target) {
        return Err(not_found("target commitment", &p.target));
    }
    if p.source == p.target {
        return Err(ValidationError::InvalidOp("cannot link to self".into()));
    }
    Ok(())
}

fn validate_dismiss(p: &DismissPayload, ops: &[Operation]) -> Result {
    require_text(&p.memory, "memory", false)?;
    require_text(&p.reason, "reason", false)?;
    if !memory_exists(ops, &p.memory) {
        return Err(not_found("memory", &p.memory));
    }
    if is_memory_source_of_commitment(ops, &p.memory) {
        return Err(ValidationError::InvalidState {
            record: p.memory.clone(),
            message: format!(
                "Cannot dismiss {}: it is the source of a commitment",
                p.memory
            ),
        });
    }
    Ok(())
}

fn validate_triage(p: &TriagePayload, ops: &[Operation]) -> Result {
    if p.reviewed.is_empty() {
        return Err(ValidationError::MissingField { field: "reviewed" });
    }
    require_text(&p.summary, "summary", false)?;
    for memory in &p.reviewed {
        if !memory_exists(ops, memory) {
            return Err(not_found("reviewed memory", memory));
        }
    }
    Ok(())
}

fn validate_publish(p: &PublishPayload, ops: &[Operation]) -> Result {
    require_text(&p.module, "module", false)?;
    require_text(&p.path, "path", false)?;
    if let Some(source) = &p.source {
        if is_valid_id(&source.id) && !record_exists(ops, &source.id) {
            return Err(not_found("publish source", &source.id));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pledge_types::{AnnotatePayload, ErrorKind, LinkKind, PublishSource};

    struct Fixture {
        ops: Vec<Operation>,
    }

    impl Fixture {
        fn new() -> Self {
            Self { ops: Vec::new() }
        }

        fn op(actor: &str, payload: OpPayload) -> Operation {
            Operation::new(actor, "ws", payload)
        }

        fn apply(&mut self, actor: &str, payload: OpPayload) -> String {
            let op = Self::op(actor, payload);
            validate_operation(&op, &self.ops, None).unwrap();
            let id = op.id.clone();
            self.ops.push(op);
            id
        }

        fn check(&self, actor: &str, payload: OpPayload) -> Result {
            validate_operation(&Self::op(actor, payload), &self.ops, None)
        }

        fn capture(&mut self) -> String {
            self.apply(
                "alice",
                OpPayload::Capture(CapturePayload {
                    body: "observed".into(),
                    ..Default::default()
                }),
            )
        }

        fn commit(&mut self, source: &str) -> String {
            self.apply(
                "alice",
                OpPayload::Commit(CommitPayload {
                    body: "work".into(),
                    source: source.into(),
                    ..Default::default()
                }),
            )
        }
    }

    fn claim(cmt: &str) -> OpPayload {
        OpPayload::Claim(ClaimPayload {
            commitment: cmt.into(),
        })
    }

    fn submit(cmt: &str, evidence: &str) -> OpPayload {
        OpPayload::Submit(SubmitPayload {
            commitment: cmt.into(),
            evidence: vec![evidence.into()],
            ..Default::default()
        })
    }

    fn close_with(cmt: &str, evidence: &str) -> OpPayload {
        OpPayload::Close(ClosePayload {
            commitment: cmt.into(),
            evidence: Some(evidence.into()),
            duplicate_of: None,
        })
    }

    #[test]
    fn envelope_and_duplicates() {
        let mut f = Fixture::new();
        let mem = f.capture();

        let mut op = Fixture::op(
            "",
            OpPayload::Capture(CapturePayload {
                body: "x".into(),
                ..Default::default()
            }),
        );
        assert_eq!(
            validate_operation(&op, &f.ops, None).unwrap_err(),
            ValidationError::MissingField { field: "actor" }
        );

        op.actor = "alice".into();
        op.id = mem.clone();
        assert_eq!(
            validate_operation(&op, &f.ops, None).unwrap_err().code(),
            "E_DUPLICATE_ID"
        );

        let keyed = Fixture::op(
            "alice",
            OpPayload::Capture(CapturePayload {
                body: "x".into(),
                ..Default::default()
            }),
        )
        .with_source_key("slack:1");
        validate_operation(&keyed, &f.ops, None).unwrap();
        f.ops.push(keyed);
        let again = Fixture::op(
            "alice",
            OpPayload::Capture(CapturePayload {
                body: "y".into(),
                ..Default::default()
            }),
        )
        .with_source_key("slack:1");
        let err = validate_operation(&again, &f.ops, None).unwrap_err();
        assert_eq!(err.code(), "E_DUPLICATE_SOURCE_KEY");
        assert_eq!(err.kind(), ErrorKind::Duplicate);
    }

    #[test]
    fn capture_payload_checks() {
        let f = Fixture::new();
        let blank = OpPayload::Capture(CapturePayload {
            body: "   ".into(),
            ..Default::default()
        });
        assert_eq!(f.check("alice", blank).unwrap_err().code(), "E_EMPTY_BODY");

        for bad in ["/etc/passwd", "../secrets", "docs/../../x"] {
            let payload = OpPayload::Capture(CapturePayload {
                body: "doc".into(),
                path: Some(bad.into()),
                ..Default::default()
            });
            assert_eq!(f.check("alice", payload).unwrap_err().code(), "E_INVALID_OP", "{bad}");
        }
        let ok = OpPayload::Capture(CapturePayload {
            body: "doc".into(),
            path: Some("docs/design.md".into()),
            refs: Some(vec!["cmt_0000abcd".into()]),
            ..Default::default()
        });
        assert!(f.check("alice", ok).is_ok());

        let bad_ref = OpPayload::Capture(CapturePayload {
            body: "doc".into(),
            refs: Some(vec!["ticket-9".into()]),
            ..Default::default()
        });
        assert_eq!(f.check("alice", bad_ref).unwrap_err().code(), "E_INVALID_OP");
    }

    #[test]
    fn commit_requires_source_memory() {
        let mut f = Fixture::new();
        let err = f
            .check(
                "alice",
                OpPayload::Commit(CommitPayload {
                    body: "x".into(),
                    source: "mem_00000000".into(),
                    ..Default::default()
                }),
            )
            .unwrap_err();
        assert_eq!(err.code(), "E_REF_NOT_FOUND");
        let mem = f.capture();
        f.commit(&mem);
    }

    #[test]
    fn claim_rules() {
        let mut f = Fixture::new();
        let mem = f.capture();
        let cmt = f.commit(&mem);

        assert_eq!(f.check("alice", claim("cmt_00000000")).unwrap_err().code(), "E_REF_NOT_FOUND");
        f.apply("alice", claim(&cmt));
        assert!(f.check("alice", claim(&cmt)).is_ok());
        let err = f.check("bob", claim(&cmt)).unwrap_err();
        assert_eq!(err.code(), "E_ALREADY_CLAIMED");
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        f.apply("alice", submit(&cmt, &mem));
        assert_eq!(f.check("alice", claim(&cmt)).unwrap_err().code(), "E_INVALID_STATE");
    }

    #[test]
    fn release_requires_owner() {
        let mut f = Fixture::new();
        let mem = f.capture();
        let cmt = f.commit(&mem);
        let release = |c: &str| {
            OpPayload::Release(ReleasePayload {
                commitment: c.into(),
                reason: None,
            })
        };
        assert_eq!(f.check("alice", release(&cmt)).unwrap_err().code(), "E_NOT_OWNER");
        f.apply("alice", claim(&cmt));
        assert_eq!(f.check("bob", release(&cmt)).unwrap_err().kind(), ErrorKind::Ownership);
        f.apply("alice", release(&cmt));

        f.apply("alice", close_with(&cmt, &mem));
        assert_eq!(f.check("alice", release(&cmt)).unwrap_err().code(), "E_ALREADY_CLOSED");
    }

    #[test]
    fn submit_without_claim_is_invalid_state() {
        let mut f = Fixture::new();
        let mem = f.capture();
        let cmt = f.commit(&mem);
        let err = f.check("alice", submit(&cmt, &mem)).unwrap_err();
        assert_eq!(err.code(), "E_INVALID_STATE");
        assert_eq!(
            err.to_string(),
            "Commitment must be claimed before submitting (current: open)"
        );

        f.apply("alice", claim(&cmt));
        assert_eq!(f.check("bob", submit(&cmt, &mem)).unwrap_err().code(), "E_NOT_OWNER");
        assert_eq!(
            f.check("alice", submit(&cmt, "mem_00000000")).unwrap_err().code(),
            "E_REF_NOT_FOUND"
        );
        let empty = OpPayload::Submit(SubmitPayload {
            commitment: cmt.clone(),
            ..Default::default()
        });
        assert_eq!(f.check("alice", empty).unwrap_err().code(), "E_MISSING_FIELD");
        f.apply("alice", submit(&cmt, &mem));
    }

    #[test]
    fn approve_and_reopen_states() {
        let mut f = Fixture::new();
        let mem = f.capture();
        let cmt = f.commit(&mem);
        let approve = OpPayload::Approve(ApprovePayload {
            commitment: cmt.clone(),
            ..Default::default()
        });
        let reopen = OpPayload::Reopen(ReopenPayload {
            commitment: cmt.clone(),
            reason: "tests missing".into(),
            from_state: None,
        });

        assert_eq!(f.check("bob", approve.clone()).unwrap_err().code(), "E_INVALID_STATE");
        assert_eq!(f.check("bob", reopen.clone()).unwrap_err().code(), "E_INVALID_STATE");

        f.apply("alice", claim(&cmt));
        f.apply("alice", submit(&cmt, &mem));
        f.apply("bob", reopen.clone());
        f.apply("alice", submit(&cmt, &mem));
        f.apply("bob", approve.clone());
        assert_eq!(f.check("bob", approve).unwrap_err().code(), "E_INVALID_STATE");
        f.apply("bob", reopen);

        let no_reason = OpPayload::Reopen(ReopenPayload {
            commitment: cmt.clone(),
            reason: " ".into(),
            from_state: None,
        });
        assert_eq!(f.check("bob", no_reason).unwrap_err().code(), "E_MISSING_FIELD");
    }

    #[test]
    fn duplicate_is_never_reopened() {
        let mut f = Fixture::new();
        let mem = f.capture();
        let keep = f.commit(&mem);
        let dup = f.commit(&mem);
        f.apply(
            "alice",
            OpPayload::Close(ClosePayload {
                commitment: dup.clone(),
                evidence: None,
                duplicate_of: Some(keep.clone()),
            }),
        );
        let reopen = OpPayload::Reopen(ReopenPayload {
            commitment: dup,
            reason: "oops".into(),
            from_state: None,
        });
        assert_eq!(f.check("alice", reopen).unwrap_err().code(), "E_INVALID_STATE");
    }

    #[test]
    fn close_rules() {
        let mut f = Fixture::new();
        let mem = f.capture();
        let a = f.commit(&mem);
        let b = f.commit(&mem);

        let neither = OpPayload::Close(ClosePayload {
            commitment: a.clone(),
            ..Default::default()
        });
        assert_eq!(f.check("alice", neither).unwrap_err().code(), "E_MISSING_FIELD");
        let both = OpPayload::Close(ClosePayload {
            commitment: a.clone(),
            evidence: Some(mem.clone()),
            duplicate_of: Some(b.clone()),
        });
        assert_eq!(f.check("alice", both).unwrap_err().code(), "E_INVALID_OP");
        assert_eq!(
            f.check("alice", close_with(&a, "mem_00000000")).unwrap_err().code(),
            "E_REF_NOT_FOUND"
        );

        let self_dup = OpPayload::Close(ClosePayload {
            commitment: a.clone(),
            evidence: None,
            duplicate_of: Some(a.clone()),
        });
        assert_eq!(f.check("alice", self_dup).unwrap_err().code(), "E_INVALID_OP");

        f.apply("bob", claim(&b));
        let dup_of_claimed = OpPayload::Close(ClosePayload {
            commitment: b.clone(),
            evidence: None,
            duplicate_of: Some(a.clone()),
        });
        assert_eq!(f.check("alice", dup_of_claimed.clone()).unwrap_err().code(), "E_NOT_OWNER");
        f.apply("bob", dup_of_claimed);

        f.apply("alice", close_with(&a, &mem));
        assert_eq!(f.check("alice", close_with(&a, &mem)).unwrap_err().code(), "E_ALREADY_CLOSED");
    }

    #[test]
    fn annotate_link_dismiss_triage_publish() {
        let mut f = Fixture::new();
        let mem = f.capture();
        let other = f.capture();
        let cmt = f.commit(&mem);

        let note = |target: &str, body: &str| {
            OpPayload::Annotate(AnnotatePayload {
                target: target.into(),
                body: body.into(),
                ..Default::default()
            })
        };
        assert!(f.check("alice", note(&cmt, "looks good")).is_ok());
        assert_eq!(f.check("alice", note(&cmt, "")).unwrap_err().code(), "E_EMPTY_BODY");
        assert_eq!(f.check("alice", note("op_00000000", "x")).unwrap_err().code(), "E_REF_NOT_FOUND");

        let link = |source: &str, target: &str| {
            OpPayload::Link(LinkPayload {
                source: source.into(),
                target: target.into(),
                kind: Some(LinkKind::Evidence),
                reason: None,
            })
        };
        assert!(f.check("alice", link(&other, &cmt)).is_ok());
        assert_eq!(f.check("alice", link(&cmt, &cmt)).unwrap_err().code(), "E_INVALID_OP");
        assert_eq!(f.check("alice", link(&cmt, &mem)).unwrap_err().code(), "E_REF_NOT_FOUND");

        let dismiss = |memory: &str, reason: &str| {
            OpPayload::Dismiss(DismissPayload {
                memory: memory.into(),
                reason: reason.into(),
                tags: None,
            })
        };
        assert!(f.check("alice", dismiss(&other, "noise")).is_ok());
        assert_eq!(f.check("alice", dismiss(&other, "")).unwrap_err().code(), "E_MISSING_FIELD");
        let err = f.check("alice", dismiss(&mem, "noise")).unwrap_err();
        assert_eq!(err.code(), "E_INVALID_STATE");
        assert!(matches!(err, ValidationError::InvalidState { ref record, .. } if *record == mem));

        let triage = |reviewed: Vec<String>, summary: &str| {
            OpPayload::Triage(TriagePayload {
                reviewed,
                summary: summary.into(),
                decisions: Vec::new(),
            })
        };
        assert!(f.check("alice", triage(vec![mem.clone(), other.clone()], "done")).is_ok());
        assert_eq!(f.check("alice", triage(vec![], "done")).unwrap_err().code(), "E_MISSING_FIELD");
        assert_eq!(
            f.check("alice", triage(vec!["mem_00000000".into()], "done")).unwrap_err().code(),
            "E_REF_NOT_FOUND"
        );

        let publish = |module: &str, source: &str| {
            OpPayload::Publish(PublishPayload {
                id: "doc-1".into(),
                module: module.into(),
                path: "guides/setup".into(),
                version: 1,
                url: "https://docs.example/guides/setup".into(),
                content: None,
                source: Some(PublishSource {
                    kind: "commitment".into(),
                    id: source.into(),
                }),
            })
        };
        assert!(f.check("alice", publish("guides", &cmt)).is_ok());
        assert_eq!(f.check("alice", publish("", &cmt)).unwrap_err().code(), "E_MISSING_FIELD");
        assert_eq!(
            f.check("alice", publish("guides", "cmt_00000000")).unwrap_err().code(),
            "E_REF_NOT_FOUND"
        );
    }
}
