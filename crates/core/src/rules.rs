//! Rule table: item kind -> despawn duration in seconds.

use std::collections::BTreeMap;

use despawnrate_common::ItemKind;
use serde_yaml::{Mapping, Value};

use crate::config::DespawnConfig;
use crate::host::KindResolver;

/// A configured entry that was skipped while building a [`RuleSet`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("unknown item kind in config: {key}")]
    UnknownKind { key: String },
    #[error("invalid seconds for {key} (must be >0): {value}")]
    InvalidDuration { key: String, value: String },
}

/// Immutable snapshot of despawn rules. Rebuilt wholesale on every reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    durations: BTreeMap<ItemKind, u32>,
}

impl RuleSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build rules from a raw `items` mapping, returning the entries that were
    /// skipped alongside the rules that survived.
    pub fn parse<R: KindResolver + ?Sized>(
        items: &Mapping,
        resolver: &R,
    ) -> (Self, Vec<RuleError>) {
        let mut durations = BTreeMap::new();
        let mut skipped = Vec::new();
        for (key, value) in items {
            let key = describe(key);
            let Some(kind) = resolver.resolve_kind(&key) else {
                skipped.push(RuleError::UnknownKind { key });
                continue;
            };
            match parse_seconds(value) {
                Some(seconds) => {
                    durations.insert(kind, seconds);
                }
                None => skipped.push(RuleError::InvalidDuration {
                    key,
                    value: describe(value),
                }),
            }
        }
        (Self { durations }, skipped)
    }

    /// Build rules from a loaded config, logging each skipped entry.
    pub fn load<R: KindResolver + ?Sized>(config: &DespawnConfig, resolver: &R) -> Self {
        let Some(items) = config.items.as_ref() else {
            tracing::warn!("no 'items' section in config");
            return Self::empty();
        };
        let (rules, skipped) = Self::parse(items, resolver);
        for err in &skipped {
            tracing::warn!("{err}. Skipping.");
        }
        rules
    }

    pub fn seconds_for(&self, kind: &ItemKind) -> Option<u32> {
        self.durations.get(kind).copied()
    }

    pub fn len(&self) -> usize {
        self.durations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }

    /// Rules in kind order.
    pub fn iter(&self) -> impl Iterator<Item = (&ItemKind, u32)> {
        self.durations.iter().map(|(k, s)| (k, *s))
    }
}

fn parse_seconds(value: &Value) -> Option<u32> {
    let seconds = match value {
        Value::Number(n) => n.as_u64().and_then(|s| u32::try_from(s).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }?;
    (seconds > 0).then_some(seconds)
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Sequence(_) => "<list>".into(),
        Value::Mapping(_) => "<section>".into(),
        Value::Tagged(t) => t.tag.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHost;

    fn items(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn kind(name: &str) -> ItemKind {
        ItemKind::parse(name).unwrap()
    }

    #[test]
    fn valid_entries_become_rules() {
        let host = FakeHost::new();
        let (rules, skipped) = RuleSet::parse(&items("dirt: 30\nminecraft:cobblestone: 60\n"), &host);
        assert!(skipped.is_empty());
        assert_eq!(rules.len(), 2);
        assert_eq!(rules.seconds_for(&kind("dirt")), Some(30));
        assert_eq!(rules.seconds_for(&kind("cobblestone")), Some(60));
    }

    #[test]
    fn unknown_kinds_are_skipped() {
        let host = FakeHost::new();
        let (rules, skipped) = RuleSet::parse(&items("unobtainium: 30\ndirt: 5\n"), &host);
        assert_eq!(rules.len(), 1);
        assert_eq!(
            skipped,
            vec![RuleError::UnknownKind {
                key: "unobtainium".into()
            }]
        );
    }

    #[test]
    fn non_positive_and_unparseable_durations_are_skipped() {
        let host = FakeHost::new();
        let (rules, skipped) = RuleSet::parse(
            &items("dirt: 0\ncobblestone: -5\nrotten_flesh: soon\nsand: 1.5\ngravel: true\n"),
            &host,
        );
        assert!(rules.is_empty());
        assert_eq!(skipped.len(), 5);
        assert!(
            skipped
                .iter()
                .all(|e| matches!(e, RuleError::InvalidDuration { .. }))
        );
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let host = FakeHost::new();
        let (rules, skipped) = RuleSet::parse(&items("dirt: \"45\"\n"), &host);
        assert!(skipped.is_empty());
        assert_eq!(rules.seconds_for(&kind("dirt")), Some(45));
    }

    #[test]
    fn unknown_kind_is_reported_before_bad_duration() {
        let host = FakeHost::new();
        let (_, skipped) = RuleSet::parse(&items("nothing_here: 0\n"), &host);
        assert!(matches!(skipped[0], RuleError::UnknownKind { .. }));
    }

    #[test]
    fn missing_items_section_yields_empty_rules() {
        let host = FakeHost::new();
        let rules = RuleSet::load(&DespawnConfig::default(), &host);
        assert!(rules.is_empty());
    }

    #[test]
    fn iteration_is_in_kind_order() {
        let host = FakeHost::new();
        let (rules, _) = RuleSet::parse(&items("sand: 3\ndirt: 1\ncobblestone: 2\n"), &host);
        let names: Vec<&str> = rules.iter().map(|(k, _)| k.path()).collect();
        assert_eq!(names, vec!["cobblestone", "dirt", "sand"]);
    }
}
