use serde::{Deserialize, Serialize};

/// One rewrite rule in the per-slot merge log. The log is append-only and
/// replayed in `ordinal` order at read time; stored responses are never
/// touched. Undo removes the highest ordinal for the slot and nothing else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeRule {
    pub slot: u32,
    pub ordinal: u32,
    pub original: String,
    pub merged: String,
}

/// Replay the merge log for a slot over one response part, returning the
/// canonical text and how many rules fired.
pub fn apply_merges(rules: &[MergeRule], slot: u32, response: &str) -> (String, u32) {
    let mut current = response.to_string();
    let mut fired = 0;
    for rule in rules.iter().filter(|r| r.slot == slot) {
        if rule.original == current {
            current = rule.merged.clone();
            fired += 1;
        }
    }
    (current, fired)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(slot: u32, ordinal: u32, from: &str, to: &str) -> MergeRule {
        MergeRule {
            slot,
            ordinal,
            original: from.to_string(),
            merged: to.to_string(),
        }
    }

    #[test]
    fn rules_chain_in_insertion_order() {
        let rules = vec![rule(1, 0, "dog", "cat"), rule(1, 1, "cat", "feline")];
        let (canonical, fired) = apply_merges(&rules, 1, "dog");
        assert_eq!(canonical, "feline");
        assert_eq!(fired, 2);
    }

    #[test]
    fn rules_are_scoped_per_slot() {
        let rules = vec![rule(2, 0, "dog", "cat")];
        let (canonical, fired) = apply_merges(&rules, 1, "dog");
        assert_eq!(canonical, "dog");
        assert_eq!(fired, 0);
    }
}
