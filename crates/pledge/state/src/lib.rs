//! State derivation for the Pledge ledger.
//!
//! Nothing derived is ever stored. Every view (commitment lifecycle, memory
//! triage state, annotations, external references, review queue) is recomputed
//! from the full operation list on each read, applying operations in log order.
//! Replay does not judge legality: an out-of-protocol operation that made it
//! into the log still applies. Gatekeeping happens before append.

#![deny(unsafe_code)]

pub mod external;
pub mod memory;
pub mod query;
pub mod replay;

pub use external::{
    commitments_with_external_ref, external_ref, external_refs, has_external_ref,
};
pub use memory::{
    compute_memory_state, is_memory_dismissed, is_memory_source_of_commitment,
    memories_in_state, memory_states,
};
pub use query::{
    annotations_for, commitment_exists, commitments_where, compute_commitments,
    compute_memories, duplicates_of, get_commitment, get_memory, linked_commitments,
    linked_memories, memory_exists, record_exists, review_queue, status_summary,
    CommitmentFilter, ReviewItem, ReviewQueueFilter, StatusSummary,
};
pub use replay::{compute_commitment_state, derive, CommitmentStatus, LedgerState};
