//! Linking commitments to items in other systems.

use pledge_types::{AnnotatePayload, ExternalRef, OpPayload, Operation, EXTERNAL_REF_KIND};

use crate::error::WorkspaceError;
use crate::workspace::Workspace;

impl Workspace {
    /// Record `external` on `commitment` as an annotation.
    ///
    /// A commitment holds at most one reference per system; a second one
    /// fails with [`WorkspaceError::ExternalRefExists`]. The check and the
    /// append happen under one lock.
    pub fn link_external(
        &self,
        actor: &str,
        commitment: &str,
        external: ExternalRef,
    ) -> Result<Operation, WorkspaceError> {
        self.lock().with_lock(|| {
            let ops = self.log().read()?;
            if pledge_state::has_external_ref(&ops, commitment, &external.system) {
                return Err(WorkspaceError::ExternalRefExists {
                    commitment: commitment.to_string(),
                    system: external.system.clone(),
                });
            }
            let op = self.operation(
                actor,
                OpPayload::Annotate(AnnotatePayload {
                    target: commitment.to_string(),
                    body: format!("Linked to {} {} {}", external.system, external.ref_type, external.id),
                    kind: Some(EXTERNAL_REF_KIND.to_string()),
                    refs: Some(vec![external.url.clone()]),
                    meta: Some(external.to_annotation_meta()),
                }),
            );
            self.validate_and_append(op, &ops)
        })
    }

    /// The `system` reference on `commitment`.
    pub fn external_ref(&self, commitment: &str, system: &str) -> Result<ExternalRef, WorkspaceError> {
        pledge_state::external_ref(&self.read()?, commitment, system).ok_or_else(|| {
            WorkspaceError::ExternalRefNotFound {
                commitment: commitment.to_string(),
                system: system.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use pledge_types::{CapturePayload, CommitPayload};

    use crate::workspace::InitOptions;

    use super::*;

    #[test]
    fn one_reference_per_system() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::init(dir.path(), InitOptions::default()).unwrap();
        let mem = ws
            .capture("alice", CapturePayload { body: "bug".into(), ..Default::default() })
            .unwrap();
        let cmt = ws
            .commit(
                "alice",
                CommitPayload { body: "fix".into(), source: mem.id, ..Default::default() },
            )
            .unwrap();

        let err = ws.external_ref(&cmt.id, "github").unwrap_err();
        assert_eq!(err.code(), "E_EXTERNAL_REF_NOT_FOUND");

        let issue = ExternalRef {
            system: "github".into(),
            ref_type: "issue".into(),
            id: "42".into(),
            url: "https://github.com/acme/app/issues/42".into(),
            synced_at: Utc::now(),
        };
        ws.link_external("alice", &cmt.id, issue.clone()).unwrap();
        assert_eq!(ws.external_ref(&cmt.id, "github").unwrap(), issue);

        let err = ws.link_external("alice", &cmt.id, issue).unwrap_err();
        assert_eq!(err.code(), "E_EXTERNAL_REF_EXISTS");
        assert_eq!(ws.read().unwrap().len(), 3);
    }

    #[test]
    fn unknown_commitment_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::init(dir.path(), InitOptions::default()).unwrap();
        let issue = ExternalRef {
            system: "linear".into(),
            ref_type: "issue".into(),
            id: "ENG-1".into(),
            url: "https://linear.app/acme/issue/ENG-1".into(),
            synced_at: Utc::now(),
        };
        let err = ws.link_external("alice", "cmt_0000abcd", issue).unwrap_err();
        assert_eq!(err.code(), "E_REF_NOT_FOUND");
    }
}
