use std::collections::{BTreeMap, HashMap};

use super::key::ActorId;

/// Authority-side buffer holding the last visibility value per actor, replayed
/// to observers that join later.
#[derive(Debug, Default)]
pub struct ToggleBroadcast {
    last: BTreeMap<ActorId, bool>,
}

impl ToggleBroadcast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `disabled` for `actor`; returns whether the buffered value changed.
    pub fn publish(&mut self, actor: ActorId, disabled: bool) -> bool {
        self.last.insert(actor, disabled) != Some(disabled)
    }

    pub fn get(&self, actor: ActorId) -> Option<bool> {
        self.last.get(&actor).copied()
    }

    pub fn remove(&mut self, actor: ActorId) {
        self.last.remove(&actor);
    }

    /// Every buffered `(actor, disabled)` value in actor order.
    pub fn snapshot(&self) -> Vec<(ActorId, bool)> {
        self.last.iter().map(|(&a, &d)| (a, d)).collect()
    }
}

/// Observer-side visibility of remote actors. Unknown actors are visible.
#[derive(Debug, Default)]
pub struct VisibilityView {
    disabled: HashMap<ActorId, bool>,
}

impl VisibilityView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the value differed and was applied.
    pub fn apply(&mut self, actor: ActorId, disabled: bool) -> bool {
        if self.is_disabled(actor) == disabled {
            return false;
        }
        self.disabled.insert(actor, disabled);
        true
    }

    pub fn is_disabled(&self, actor: ActorId) -> bool {
        self.disabled.get(&actor).copied().unwrap_or(false)
    }

    pub fn is_visible(&self, actor: ActorId) -> bool {
        !self.is_disabled(actor)
    }
}
