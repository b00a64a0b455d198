//! Snapshot comparison.
//!
//! Two artifacts are the same entity when they share `name|first-tag`. Untagged
//! artifacts are never compared. Output order is stable:
//! - `replicate` follows the new snapshot;
//! - `delete` lists superseded artifacts in new-snapshot order, then removed
//!   artifacts in old-snapshot order.

use std::collections::HashMap;

use sat_model::{Artifact, State};

/// What has to change locally to move from one snapshot to the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changes {
    pub delete: Vec<Artifact>,
    pub replicate: Vec<Artifact>,
}

impl Changes {
    pub fn is_empty(&self) -> bool {
        self.delete.is_empty() && self.replicate.is_empty()
    }
}

/// Compare the last known snapshot with a freshly fetched one.
///
/// Without a previous snapshot every tagged artifact in `new` is replicated.
/// When `old` holds the same key twice, the later entry wins.
pub fn diff(old: Option<&State>, new: &State) -> Changes {
    let keyed_new = new
        .artifacts()
        .iter()
        .filter_map(|a| a.diff_key().map(|key| (key, a)));

    let Some(old) = old else {
        return Changes {
            delete: Vec::new(),
            replicate: keyed_new.map(|(_, a)| a.clone()).collect(),
        };
    };

    let mut unmatched: HashMap<String, usize> = HashMap::with_capacity(old.len());
    for (idx, artifact) in old.artifacts().iter().enumerate() {
        if let Some(key) = artifact.diff_key() {
            unmatched.insert(key, idx);
        }
    }

    let mut changes = Changes::default();
    for (key, artifact) in keyed_new {
        match unmatched.remove(&key) {
            None => changes.replicate.push(artifact.clone()),
            Some(idx) => {
                let previous = &old.artifacts()[idx];
                if previous.digest != artifact.digest {
                    changes.replicate.push(artifact.clone());
                    changes.delete.push(previous.clone());
                }
            }
        }
    }

    for (idx, artifact) in old.artifacts().iter().enumerate() {
        if let Some(key) = artifact.diff_key()
            && unmatched.get(&key) == Some(&idx)
        {
            changes.delete.push(artifact.clone());
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn art(name: &str, tag: &str, digest: &str) -> Artifact {
        let tags = if tag.is_empty() { vec![] } else { vec![tag.to_string()] };
        Artifact::new("library", name, tags, digest)
    }

    fn state(artifacts: Vec<Artifact>) -> State {
        State::new("registry.example.com", artifacts)
    }

    fn names(list: &[Artifact]) -> Vec<(&str, &str)> {
        list.iter()
            .map(|a| (a.name.as_str(), a.digest.as_str()))
            .collect()
    }

    #[test]
    fn first_snapshot_replicates_everything_tagged() {
        let new = state(vec![
            art("nginx", "1.25", "d1"),
            art("scratch", "", "d0"),
            art("redis", "7", "d2"),
        ]);

        let changes = diff(None, &new);

        assert!(changes.delete.is_empty());
        assert_eq!(names(&changes.replicate), vec![("nginx", "d1"), ("redis", "d2")]);
    }

    #[test]
    fn changed_digest_is_deleted_and_replicated() {
        let old = state(vec![art("nginx", "1.25", "d1"), art("redis", "7", "d2")]);
        let new = state(vec![art("nginx", "1.25", "d9"), art("redis", "7", "d2")]);

        let changes = diff(Some(&old), &new);

        assert_eq!(names(&changes.replicate), vec![("nginx", "d9")]);
        assert_eq!(names(&changes.delete), vec![("nginx", "d1")]);
    }

    #[test]
    fn changed_plus_new() {
        let old = state(vec![art("nginx", "1.25", "A")]);
        let new = state(vec![art("nginx", "1.25", "B"), art("redis", "7", "C")]);

        let changes = diff(Some(&old), &new);

        assert_eq!(names(&changes.delete), vec![("nginx", "A")]);
        assert_eq!(names(&changes.replicate), vec![("nginx", "B"), ("redis", "C")]);
    }

    #[test]
    fn everything_removed() {
        let old = state(vec![art("alpine", "3.18", "X")]);

        let changes = diff(Some(&old), &state(vec![]));

        assert_eq!(names(&changes.delete), vec![("alpine", "X")]);
        assert!(changes.replicate.is_empty());
    }

    #[test]
    fn removed_and_added_artifacts() {
        let old = state(vec![art("nginx", "1.25", "d1"), art("redis", "7", "d2")]);
        let new = state(vec![art("nginx", "1.25", "d1"), art("postgres", "16", "d3")]);

        let changes = diff(Some(&old), &new);

        assert_eq!(names(&changes.replicate), vec![("postgres", "d3")]);
        assert_eq!(names(&changes.delete), vec![("redis", "d2")]);
    }

    #[test]
    fn identical_snapshots_produce_nothing() {
        let snapshot = state(vec![art("nginx", "1.25", "d1"), art("redis", "7", "d2")]);
        assert!(diff(Some(&snapshot), &snapshot.clone()).is_empty());
    }

    #[test]
    fn untagged_artifacts_are_ignored_on_both_sides() {
        let old = state(vec![art("ghost", "", "d1")]);
        let new = state(vec![art("phantom", "", "d2")]);

        assert!(diff(Some(&old), &new).is_empty());
    }

    #[test]
    fn same_name_different_tag_are_different_entities() {
        let old = state(vec![art("nginx", "1.24", "d1")]);
        let new = state(vec![art("nginx", "1.25", "d2")]);

        let changes = diff(Some(&old), &new);

        assert_eq!(names(&changes.replicate), vec![("nginx", "d2")]);
        assert_eq!(names(&changes.delete), vec![("nginx", "d1")]);
    }

    #[test]
    fn later_duplicate_in_old_snapshot_wins() {
        let old = state(vec![art("nginx", "1.25", "d1"), art("nginx", "1.25", "d2")]);
        let new = state(vec![art("nginx", "1.25", "d2")]);

        assert!(diff(Some(&old), &new).is_empty());
    }

    #[test]
    fn delete_order_superseded_then_removed() {
        let old = state(vec![
            art("a", "1", "x"),
            art("b", "1", "x"),
            art("c", "1", "x"),
        ]);
        let new = state(vec![art("c", "1", "y"), art("a", "1", "y")]);

        let changes = diff(Some(&old), &new);

        assert_eq!(names(&changes.replicate), vec![("c", "y"), ("a", "y")]);
        assert_eq!(names(&changes.delete), vec![("c", "x"), ("a", "x"), ("b", "x")]);
    }

    fn arb_state() -> impl Strategy<Value = State> {
        let artifact = ("[a-d]", prop_oneof!["", "1", "2"], "[xyz]")
            .prop_map(|(name, tag, digest)| art(&name, &tag, &digest));
        prop::collection::vec(artifact, 0..8).prop_map(state)
    }

    /// Keep the last artifact per diff key; untagged ones are kept as is.
    fn dedup(s: &State) -> State {
        let mut seen = std::collections::HashSet::new();
        let mut artifacts: Vec<Artifact> = s
            .artifacts()
            .iter()
            .rev()
            .filter(|a| a.diff_key().is_none_or(|k| seen.insert(k)))
            .cloned()
            .collect();
        artifacts.reverse();
        state(artifacts)
    }

    proptest! {
        #[test]
        fn self_diff_is_empty(s in arb_state()) {
            let deduped = dedup(&s);
            prop_assert!(diff(Some(&deduped), &deduped).is_empty());
        }

        #[test]
        fn outputs_never_contain_untagged(old in arb_state(), new in arb_state()) {
            let changes = diff(Some(&old), &new);
            prop_assert!(changes.delete.iter().all(Artifact::is_tagged));
            prop_assert!(changes.replicate.iter().all(Artifact::is_tagged));
        }

        #[test]
        fn unchanged_artifacts_are_left_alone(old in arb_state(), new in arb_state()) {
            let (old, new) = (dedup(&old), dedup(&new));
            let pinned = |s: &State| -> std::collections::HashSet<(String, String)> {
                s.artifacts()
                    .iter()
                    .filter_map(|a| a.diff_key().map(|k| (k, a.digest.clone())))
                    .collect()
            };
            let unchanged: std::collections::HashSet<_> =
                pinned(&old).intersection(&pinned(&new)).cloned().collect();

            let changes = diff(Some(&old), &new);
            for a in changes.delete.iter().chain(&changes.replicate) {
                let entry = (a.diff_key().unwrap(), a.digest.clone());
                prop_assert!(!unchanged.contains(&entry), "{entry:?} is unchanged but was emitted");
            }
        }

        #[test]
        fn empty_new_deletes_every_tagged_key_of_old(old in arb_state()) {
            let changes = diff(Some(&old), &state(vec![]));
            let keys: std::collections::HashSet<_> =
                old.artifacts().iter().filter_map(Artifact::diff_key).collect();

            prop_assert!(changes.replicate.is_empty());
            prop_assert_eq!(changes.delete.len(), keys.len());
        }

        #[test]
        fn replicate_is_a_subsequence_of_new(old in arb_state(), new in arb_state()) {
            let changes = diff(Some(&old), &new);
            let mut rest = new.artifacts().iter();
            for wanted in &changes.replicate {
                prop_assert!(rest.any(|a| a == wanted));
            }
        }
    }
}
