//! Client-side record of active subscriptions.

use natsline_wire::SubscriptionId;

#[derive(Debug, Clone)]
struct SubjectEntry {
    subject: String,
    ids: Vec<SubscriptionId>,
}

/// Maps subjects to the ordered set of subscription ids registered for them.
///
/// Subjects keep the order of their first subscription so teardown is
/// deterministic. An id appears at most once per subject.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionRegistry {
    entries: Vec<SubjectEntry>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registers `sid` under `subject`. Returns `false` when the exact pair was
    /// already present.
    pub fn add(&mut self, subject: &str, sid: SubscriptionId) -> bool {
        match self.entries.iter_mut().find(|entry| entry.subject == subject) {
            Some(entry) if entry.ids.contains(&sid) => false,
            Some(entry) => {
                entry.ids.push(sid);
                true
            }
            None => {
                self.entries.push(SubjectEntry {
                    subject: subject.to_owned(),
                    ids: vec![sid],
                });
                true
            }
        }
    }

    /// Removes the first registration of `sid`, returning the subject it was
    /// registered under. Unknown ids are ignored.
    pub fn remove(&mut self, sid: &SubscriptionId) -> Option<String> {
        let entry_index = self
            .entries
            .iter()
            .position(|entry| entry.ids.contains(sid))?;
        let entry = self.entries.get_mut(entry_index)?;
        entry.ids.retain(|candidate| candidate != sid);
        if entry.ids.is_empty() {
            return Some(self.entries.remove(entry_index).subject);
        }
        Some(entry.subject.clone())
    }

    /// Every registered `(subject, sid)` pair, in registration order.
    #[must_use]
    pub fn all_ids(&self) -> Vec<(String, SubscriptionId)> {
        self.entries
            .iter()
            .flat_map(|entry| {
                entry
                    .ids
                    .iter()
                    .map(|sid| (entry.subject.clone(), sid.clone()))
            })
            .collect()
    }

    /// Ids registered under `subject`.
    #[must_use]
    pub fn ids_for(&self, subject: &str) -> &[SubscriptionId] {
        self.entries
            .iter()
            .find(|entry| entry.subject == subject)
            .map(|entry| entry.ids.as_slice())
            .unwrap_or_default()
    }

    /// Subject `sid` is registered under.
    #[must_use]
    pub fn subject_of(&self, sid: &SubscriptionId) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.ids.contains(sid))
            .map(|entry| entry.subject.as_str())
    }

    /// Returns `true` when `sid` is registered.
    #[must_use]
    pub fn contains(&self, sid: &SubscriptionId) -> bool {
        self.subject_of(sid).is_some()
    }

    /// Number of registered ids across all subjects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().map(|entry| entry.ids.len()).sum()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forgets every registration.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    fn sid(value: &str) -> SubscriptionId {
        SubscriptionId::from(value)
    }

    #[fixture]
    fn registry() -> SubscriptionRegistry {
        let mut registry = SubscriptionRegistry::new();
        registry.add("orders", sid("a"));
        registry.add("orders", sid("b"));
        registry.add("billing", sid("c"));
        registry
    }

    #[rstest]
    fn duplicate_pairs_are_ignored(mut registry: SubscriptionRegistry) {
        assert!(!registry.add("orders", sid("a")));
        assert_eq!(registry.ids_for("orders"), &[sid("a"), sid("b")]);
    }

    #[rstest]
    fn remove_leaves_sibling_ids(mut registry: SubscriptionRegistry) {
        assert_eq!(registry.remove(&sid("a")).as_deref(), Some("orders"));
        assert_eq!(registry.ids_for("orders"), &[sid("b")]);
        assert_eq!(registry.len(), 2);
    }

    #[rstest]
    fn removing_last_id_drops_subject(mut registry: SubscriptionRegistry) {
        registry.remove(&sid("c"));
        assert!(registry.ids_for("billing").is_empty());
        assert_eq!(registry.subject_of(&sid("c")), None);
    }

    #[rstest]
    fn removing_unknown_id_is_a_no_op(mut registry: SubscriptionRegistry) {
        let before = registry.all_ids();
        assert_eq!(registry.remove(&sid("missing")), None);
        assert_eq!(registry.all_ids(), before);
    }

    #[rstest]
    fn all_ids_follow_registration_order(registry: SubscriptionRegistry) {
        assert_eq!(
            registry.all_ids(),
            vec![
                (String::from("orders"), sid("a")),
                (String::from("orders"), sid("b")),
                (String::from("billing"), sid("c")),
            ]
        );
    }
}
