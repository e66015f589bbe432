//! Memory triage state.
//!
//! A memory is `committed` when a commitment was made from it, `linked` when
//! it was linked to a commitment, `dismissed` when explicitly dismissed, and
//! `untriaged` otherwise. The first matching rule wins.

use std::collections::HashMap;

use pledge_types::{Memory, MemoryState, OpPayload, Operation};

use crate::replay::derive;

pub fn compute_memory_state(ops: &[Operation], memory_id: &str) -> MemoryState {
    let mut state = MemoryState::Untriaged;
    for op in ops {
        let candidate = match &op.payload {
            OpPayload::Commit(p) if p.source == memory_id => MemoryState::Committed,
            OpPayload::Link(p) if p.source == memory_id => MemoryState::Linked,
            OpPayload::Dismiss(p) if p.memory == memory_id => MemoryState::Dismissed,
            _ => continue,
        };
        state = state.max(candidate);
    }
    state
}

/// Triage state of every captured memory, computed in one pass.
pub fn memory_states(ops: &[Operation]) -> HashMap<String, MemoryState> {
    let mut states: HashMap<String, MemoryState> = ops
        .iter()
        .filter(|op| matches!(op.payload, OpPayload::Capture(_)))
        .map(|op| (op.id.clone(), MemoryState::Untriaged))
        .collect();

    for op in ops {
        let (memory, candidate) = match &op.payload {
            OpPayload::Commit(p) => (&p.source, MemoryState::Committed),
            OpPayload::Link(p) => (&p.source, MemoryState::Linked),
            OpPayload::Dismiss(p) => (&p.memory, MemoryState::Dismissed),
            _ => continue,
        };
        if let Some(state) = states.get_mut(memory.as_str()) {
            *state = (*state).max(candidate);
        }
    }
    states
}

/// Memories currently in `state`, in capture order.
pub fn memories_in_state(ops: &[Operation], state: MemoryState) -> Vec<Memory> {
    let states = memory_states(ops);
    derive(ops)
        .memories
        .into_iter()
        .filter(|m| states.get(&m.id) == Some(&state))
        .collect()
}

pub fn is_memory_dismissed(ops: &[Operation], memory_id: &str) -> bool {
    ops.iter()
        .any(|op| matches!(&op.payload, OpPayload::Dismiss(p) if p.memory == memory_id))
}

pub fn is_memory_source_of_commitment(ops: &[Operation], memory_id: &str) -> bool {
    ops.iter()
        .any(|op| matches!(&op.payload, OpPayload::Commit(p) if p.source == memory_id))
}
