//! End-to-end append-path scenarios against a real workspace directory.

use pledge_genesis::GENESIS_FILE;
use pledge_types::{
    ApprovePayload, CapturePayload, ClosePayload, CommitPayload, CommitmentState, ErrorKind,
    SubmitPayload,
};
use pledge_workspace::{InitOptions, Workspace};

struct Fixture {
    _dir: tempfile::TempDir,
    ws: Workspace,
    memory: String,
    commitment: String,
}

fn fixture(genesis: Option<&str>) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let ws = Workspace::init(
        dir.path(),
        InitOptions {
            name: Some("acme".into()),
            ..Default::default()
        },
    )
    .unwrap();
    if let Some(yaml) = genesis {
        std::fs::write(ws.dir().join(GENESIS_FILE), yaml).unwrap();
    }
    let memory = ws
        .capture(
            "alice",
            CapturePayload {
                body: "checkout times out under load".into(),
                ..Default::default()
            },
        )
        .unwrap()
        .id;
    let commitment = ws
        .commit(
            "alice",
            CommitPayload {
                body: "fix checkout timeout".into(),
                source: memory.clone(),
                tags: Some(vec!["payments".into()]),
                meta: None,
            },
        )
        .unwrap()
        .id;
    Fixture {
        _dir: dir,
        ws,
        memory,
        commitment,
    }
}

fn close(f: &Fixture) -> ClosePayload {
    ClosePayload {
        commitment: f.commitment.clone(),
        evidence: Some(f.memory.clone()),
        duplicate_of: None,
    }
}

#[test]
fn require_claim_handover() {
    let f = fixture(Some("constraints:\n  require_claim:\n    - match: all\n"));
    f.ws.claim("alice", &f.commitment).unwrap();

    let err = f.ws.close("bob", close(&f)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Ownership);
    assert_eq!(err.code(), "E_NOT_OWNER");

    f.ws.release("alice", &f.commitment, Some("handing over".into()))
        .unwrap();
    f.ws.claim("bob", &f.commitment).unwrap();
    f.ws.close("bob", close(&f)).unwrap();

    let state = f.ws.state().unwrap();
    let commitment = state.commitment(&f.commitment).unwrap();
    assert_eq!(commitment.state, CommitmentState::Closed);
    assert_eq!(commitment.closed_by.as_deref(), Some("bob"));
}

#[test]
fn submit_without_claim_is_rejected() {
    let f = fixture(None);
    let err = f
        .ws
        .submit(
            "alice",
            SubmitPayload {
                commitment: f.commitment.clone(),
                evidence: vec![f.memory.clone()],
                ..Default::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert!(err
        .to_string()
        .contains("must be claimed before submitting"));
    assert_eq!(f.ws.read().unwrap().len(), 2);
}

#[test]
fn approve_path_and_rework() {
    let f = fixture(None);
    let submit = || SubmitPayload {
        commitment: f.commitment.clone(),
        evidence: vec![f.memory.clone()],
        summary: Some("raised pool size".into()),
        ..Default::default()
    };
    f.ws.claim("alice", &f.commitment).unwrap();
    f.ws.submit("alice", submit()).unwrap();
    f.ws.reopen("carol", &f.commitment, "still flaky").unwrap();

    let state = f.ws.state().unwrap();
    let reopened = state.commitment(&f.commitment).unwrap();
    assert_eq!(reopened.state, CommitmentState::Reopened);
    assert_eq!(reopened.owner.as_deref(), Some("alice"));

    f.ws.submit("alice", submit()).unwrap();
    f.ws.approve(
        "carol",
        ApprovePayload {
            commitment: f.commitment.clone(),
            comment: Some("ship it".into()),
            ..Default::default()
        },
    )
    .unwrap();
    let state = f.ws.state().unwrap();
    assert_eq!(
        state.commitment(&f.commitment).unwrap().state,
        CommitmentState::Closed
    );
}

#[test]
fn reused_source_key_is_rejected_before_append() {
    let f = fixture(None);
    let capture = || {
        pledge_types::OpPayload::Capture(CapturePayload {
            body: "webhook delivery 1234".into(),
            ..Default::default()
        })
    };
    f.ws.record("bot:hooks", capture(), Some("delivery-1234"))
        .unwrap();
    let err = f
        .ws
        .record("bot:hooks", capture(), Some("delivery-1234"))
        .unwrap_err();
    assert_eq!(err.code(), "E_DUPLICATE_SOURCE_KEY");
    assert_eq!(err.kind(), ErrorKind::Duplicate);
    assert_eq!(f.ws.read().unwrap().len(), 3);
}

#[test]
fn permission_denied_leaves_log_untouched() {
    let f = fixture(Some(
        "permissions:\n  actors:\n    alice:\n      operations: [capture, commit, claim, close]\n    \"*\":\n      operations: [capture]\n",
    ));
    let err = f.ws.claim("bob", &f.commitment).unwrap_err();
    assert_eq!(err.code(), "E_PERMISSION_DENIED");
    assert_eq!(f.ws.read().unwrap().len(), 2);
}

#[cfg(unix)]
#[test]
fn live_foreign_lock_blocks_appends() {
    let f = fixture(None);
    let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
    std::fs::write(f.ws.lock().path(), child.id().to_string()).unwrap();

    let err = f.ws.claim("alice", &f.commitment).unwrap_err();
    assert_eq!(err.code(), "E_WORKSPACE_LOCKED");
    assert_eq!(err.kind(), ErrorKind::Locked);

    child.kill().unwrap();
    child.wait().unwrap();
    f.ws.claim("alice", &f.commitment).unwrap();
}
