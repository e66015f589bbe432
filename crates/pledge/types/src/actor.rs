//! Actor classification.

/// Prefixes that mark an actor as automated rather than human.
pub const AGENT_PREFIXES: [&str; 3] = ["agent:", "bot:", "service:"];

/// Returns true when the actor identifier names an automated agent.
pub fn is_agent(actor: &str) -> bool {
    AGENT_PREFIXES.iter().any(|prefix| actor.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_prefixes_are_recognised() {
        assert!(is_agent("agent:claude"));
        assert!(is_agent("bot:ci"));
        assert!(is_agent("service:sync"));
        assert!(!is_agent("alice"));
        assert!(!is_agent("alice@example.com"));
        assert!(!is_agent("agents-team"));
    }
}
