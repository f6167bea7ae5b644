use std::collections::HashSet;

pub const DEFAULT_DUPLICATE_SUFFIX: &str = "_b";

/// Identifiers that are known to collide, and the suffix that separates a repeat from its first use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicatePolicy {
    pub known: HashSet<String>,
    pub suffix: String,
}

impl DuplicatePolicy {
    pub fn new<I, S>(known: I, suffix: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: known.into_iter().map(Into::into).collect(),
            suffix: suffix.into(),
        }
    }

    /// No identifier is treated as a duplicate.
    pub fn none() -> Self {
        Self::new(Vec::<String>::new(), DEFAULT_DUPLICATE_SUFFIX)
    }
}

impl Default for DuplicatePolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Tracks which known duplicates have been handed out during one transfer run.
#[derive(Debug, Clone)]
pub struct DuplicateIdSet<'a> {
    policy: &'a DuplicatePolicy,
    seen: HashSet<String>,
}

impl<'a> DuplicateIdSet<'a> {
    pub fn new(policy: &'a DuplicatePolicy) -> Self {
        Self {
            policy,
            seen: HashSet::new(),
        }
    }

    /// First use of a known duplicate keeps the id; every later use gets the suffix.
    /// The result depends on call order, which follows source iteration order.
    pub fn disambiguate(&mut self, id: &str) -> String {
        if !self.policy.known.contains(id) {
            return id.to_string();
        }
        if self.seen.insert(id.to_string()) {
            id.to_string()
        } else {
            tracing::debug!("Duplicate identifier {} renamed with suffix {}", id, self.policy.suffix);
            format!("{}{}", id, self.policy.suffix)
        }
    }
}
