//! Actor patterns with `*` wildcards.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// An actor identifier pattern. `*` matches any run of characters, every
/// other character matches itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorPattern(String);

impl ActorPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    /// Pattern matching every actor.
    pub fn any() -> Self {
        Self("*".into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_literal(&self) -> bool {
        !self.0.contains('*')
    }

    pub fn matches(&self, actor: &str) -> bool {
        glob_match(self.0.as_bytes(), actor.as_bytes())
    }

    /// Compare how specifically two patterns describe an actor both match.
    /// Literal patterns outrank wildcards; among the same kind the longer
    /// pattern wins. `Greater` means `self` is more specific.
    pub fn specificity_cmp(&self, other: &ActorPattern) -> Ordering {
        self.is_literal()
            .cmp(&other.is_literal())
            .then_with(|| self.0.len().cmp(&other.0.len()))
    }

    /// Most specific pattern matching `actor`. Ties keep the earliest entry.
    pub fn best_match<'a, T, I>(entries: I, actor: &str) -> Option<(&'a ActorPattern, &'a T)>
    where
        I: IntoIterator<Item = (&'a ActorPattern, &'a T)>,
    {
        let mut best: Option<(&'a ActorPattern, &'a T)> = None;
        for (pattern, value) in entries {
            if pattern.is_literal() && pattern.0 == actor {
                return Some((pattern, value));
            }
            if !pattern.matches(actor) {
                continue;
            }
            let replace = match best {
                None => true,
                Some((current, _)) => pattern.specificity_cmp(current) == Ordering::Greater,
            };
            if replace {
                best = Some((pattern, value));
            }
        }
        best
    }
}

impl fmt::Display for ActorPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorPattern {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Iterative glob match supporting only `*`.
fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut star: Option<usize> = None;
    let mut resume = 0;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == b'*' {
            star = Some(p);
            p += 1;
            resume = t;
        } else if p < pattern.len() && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if let Some(s) = star {
            p = s + 1;
            resume += 1;
            t = resume;
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&b| b == b'*')
}
