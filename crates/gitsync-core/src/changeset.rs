//! Sets of changed paths.

use std::collections::BTreeSet;

use serde::Serialize;

/// How a path changed.
///
/// The ordering is the evaluation order of a pass and also the precedence
/// when a path shows up in more than one group: the later kind wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// Paths to create, update and remove in one reconciliation pass.
///
/// Each path belongs to at most one group. Inserting a path that is already
/// present keeps whichever kind ranks later in added → modified → removed,
/// regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    added: BTreeSet<String>,
    modified: BTreeSet<String>,
    removed: BTreeSet<String>,
}

impl ChangeSet {
    /// Creates an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a change. Returns false if the path was already recorded with
    /// the same or a higher-precedence kind.
    pub fn insert(&mut self, kind: ChangeKind, path: impl Into<String>) -> bool {
        let path = path.into();

        match self.kind_of(&path) {
            Some(existing) if existing >= kind => return false,
            Some(existing) => {
                self.group_mut(existing).remove(&path);
            },
            None => {},
        }

        self.group_mut(kind).insert(path)
    }

    /// Returns the group a path belongs to.
    pub fn kind_of(&self, path: &str) -> Option<ChangeKind> {
        if self.removed.contains(path) {
            Some(ChangeKind::Removed)
        } else if self.modified.contains(path) {
            Some(ChangeKind::Modified)
        } else if self.added.contains(path) {
            Some(ChangeKind::Added)
        } else {
            None
        }
    }

    pub fn added(&self) -> impl Iterator<Item = &str> + '_ {
        self.added.iter().map(String::as_str)
    }

    pub fn modified(&self) -> impl Iterator<Item = &str> + '_ {
        self.modified.iter().map(String::as_str)
    }

    pub fn removed(&self) -> impl Iterator<Item = &str> + '_ {
        self.removed.iter().map(String::as_str)
    }

    /// Iterates over every change in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = (ChangeKind, &str)> + '_ {
        self.added()
            .map(|p| (ChangeKind::Added, p))
            .chain(self.modified().map(|p| (ChangeKind::Modified, p)))
            .chain(self.removed().map(|p| (ChangeKind::Removed, p)))
    }

    /// Total number of paths.
    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn group_mut(&mut self, kind: ChangeKind) -> &mut BTreeSet<String> {
        match kind {
            ChangeKind::Added => &mut self.added,
            ChangeKind::Modified => &mut self.modified,
            ChangeKind::Removed => &mut self.removed,
        }
    }
}

impl<S: Into<String>> Extend<(ChangeKind, S)> for ChangeSet {
    fn extend<I: IntoIterator<Item = (ChangeKind, S)>>(&mut self, iter: I) {
        for (kind, path) in iter {
            self.insert(kind, path);
        }
    }
}

impl<S: Into<String>> FromIterator<(ChangeKind, S)> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = (ChangeKind, S)>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ChangeKind::*;

    #[test]
    fn test_duplicates_collapse() {
        let set: ChangeSet = [(Added, "a"), (Added, "a"), (Modified, "b")]
            .into_iter()
            .collect();

        assert_eq!(set.len(), 2);
        assert_eq!(set.added().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(set.modified().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_later_kind_wins_in_any_insertion_order() {
        let forward: ChangeSet = [(Added, "a"), (Modified, "a")].into_iter().collect();
        let backward: ChangeSet = [(Modified, "a"), (Added, "a")].into_iter().collect();

        assert_eq!(forward, backward);
        assert_eq!(forward.kind_of("a"), Some(Modified));
        assert_eq!(forward.len(), 1);
    }

    #[test]
    fn test_removed_has_highest_precedence() {
        let mut set = ChangeSet::new();
        assert!(set.insert(Added, "a"));
        assert!(set.insert(Removed, "a"));
        assert!(!set.insert(Modified, "a"));

        assert_eq!(set.kind_of("a"), Some(Removed));
        assert_eq!(set.added().count(), 0);
        assert_eq!(set.modified().count(), 0);
    }

    #[test]
    fn test_iter_follows_evaluation_order() {
        let set: ChangeSet = [(Removed, "r"), (Modified, "m"), (Added, "a")]
            .into_iter()
            .collect();

        let order: Vec<_> = set.iter().collect();
        assert_eq!(order, vec![(Added, "a"), (Modified, "m"), (Removed, "r")]);
    }
}
