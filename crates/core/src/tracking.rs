//! Decides whether an item should be tracked, and until when.

use despawnrate_common::ItemKind;

use crate::host::ItemView;
use crate::rules::RuleSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The item is dead or otherwise no longer valid.
    Invalid,
    /// No rule exists for the item's kind.
    Unconfigured(ItemKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Track { deadline: u64, seconds: u32 },
    Reject(RejectReason),
}

/// Validity is checked before the rule lookup; the first failing check wins.
pub fn decide(item: &ItemView, rules: &RuleSet, now: u64) -> Decision {
    if !item.valid {
        return Decision::Reject(RejectReason::Invalid);
    }
    match rules.seconds_for(&item.kind) {
        Some(seconds) => Decision::Track {
            deadline: deadline_after(now, seconds),
            seconds,
        },
        None => Decision::Reject(RejectReason::Unconfigured(item.kind.clone())),
    }
}

pub fn deadline_after(now: u64, seconds: u32) -> u64 {
    now.saturating_add(u64::from(seconds) * 1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHost;
    use despawnrate_common::EntityId;

    fn rules() -> RuleSet {
        let items = serde_yaml::from_str("dirt: 30\nsand: 1\n").unwrap();
        RuleSet::parse(&items, &FakeHost::new()).0
    }

    fn item(kind: &str, valid: bool) -> ItemView {
        ItemView {
            id: EntityId::new(),
            kind: ItemKind::parse(kind).unwrap(),
            valid,
        }
    }

    #[test]
    fn configured_item_gets_exact_deadline() {
        let rules = rules();
        for now in [0, 1, 123_456, 1_700_000_000_000] {
            assert_eq!(
                decide(&item("dirt", true), &rules, now),
                Decision::Track {
                    deadline: now + 30_000,
                    seconds: 30
                }
            );
        }
        assert_eq!(
            decide(&item("sand", true), &rules, 500),
            Decision::Track {
                deadline: 1_500,
                seconds: 1
            }
        );
    }

    #[test]
    fn invalid_item_is_rejected_before_rule_lookup() {
        assert_eq!(
            decide(&item("gravel", false), &rules(), 0),
            Decision::Reject(RejectReason::Invalid)
        );
    }

    #[test]
    fn unconfigured_kind_is_rejected() {
        let gravel = item("gravel", true);
        assert_eq!(
            decide(&gravel, &rules(), 0),
            Decision::Reject(RejectReason::Unconfigured(gravel.kind.clone()))
        );
    }

    #[test]
    fn deadline_saturates() {
        assert_eq!(deadline_after(u64::MAX - 10, 1), u64::MAX);
    }
}
