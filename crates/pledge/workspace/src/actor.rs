//! Actor identity resolution.

use crate::config::WorkspaceConfig;

/// Environment variable naming the acting identity.
pub const ACTOR_ENV: &str = "PLEDGE_ACTOR";

/// Identity used when nothing else is configured.
pub const FALLBACK_ACTOR: &str = "user";

/// Resolve the acting identity: explicit value, then `PLEDGE_ACTOR`, then the
/// workspace's `default_actor`, then [`FALLBACK_ACTOR`].
pub fn resolve_actor(explicit: Option<&str>, config: Option<&WorkspaceConfig>) -> String {
    let env = std::env::var(ACTOR_ENV).ok();
    resolve_actor_from(
        explicit,
        env.as_deref(),
        config.and_then(|c| c.default_actor.as_deref()),
    )
}

/// Resolution with every source passed in. Blank values are skipped.
pub fn resolve_actor_from(
    explicit: Option<&str>,
    env: Option<&str>,
    configured: Option<&str>,
) -> String {
    [explicit, env, configured]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|candidate| !candidate.is_empty())
        .unwrap_or(FALLBACK_ACTOR)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence() {
        assert_eq!(resolve_actor_from(Some("flag"), Some("env"), Some("cfg")), "flag");
        assert_eq!(resolve_actor_from(None, Some("env"), Some("cfg")), "env");
        assert_eq!(resolve_actor_from(None, None, Some("cfg")), "cfg");
        assert_eq!(resolve_actor_from(None, None, None), "user");
    }

    #[test]
    fn blank_sources_are_skipped() {
        assert_eq!(resolve_actor_from(Some(""), Some("  "), Some("cfg")), "cfg");
        assert_eq!(resolve_actor_from(Some(" alice "), None, None), "alice");
    }
}
