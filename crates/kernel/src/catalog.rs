use std::collections::BTreeSet;

use despawnrate_common::ItemKind;
use despawnrate_core::KindResolver;

const STANDARD_KINDS: &[&str] = &[
    "dirt",
    "sand",
    "gravel",
    "cobblestone",
    "stone",
    "netherrack",
    "rotten_flesh",
    "bone",
    "string",
    "arrow",
    "oak_sapling",
    "wheat_seeds",
    "egg",
];

/// The set of item kinds the server knows how to spawn.
#[derive(Debug, Clone, Default)]
pub struct KindCatalog {
    kinds: BTreeSet<ItemKind>,
}

impl KindCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog pre-filled with common vanilla kinds.
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        for name in STANDARD_KINDS {
            if let Ok(kind) = ItemKind::parse(name) {
                catalog.kinds.insert(kind);
            }
        }
        catalog
    }

    /// Add a kind. Returns `false` if it was already known.
    pub fn insert(&mut self, kind: ItemKind) -> bool {
        self.kinds.insert(kind)
    }

    /// Normalize `name` and return the kind if it is known.
    pub fn resolve(&self, name: &str) -> Option<ItemKind> {
        let kind = ItemKind::parse(name).ok()?;
        self.kinds.contains(&kind).then_some(kind)
    }

    /// Number of known kinds.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Known kinds in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &ItemKind> {
        self.kinds.iter()
    }
}

impl KindResolver for KindCatalog {
    fn resolve_kind(&self, name: &str) -> Option<ItemKind> {
        self.resolve(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_is_case_and_namespace_insensitive() {
        let catalog = KindCatalog::standard();
        let expected = ItemKind::parse("minecraft:rotten_flesh").unwrap();
        assert_eq!(catalog.resolve("ROTTEN_FLESH"), Some(expected.clone()));
        assert_eq!(catalog.resolve("minecraft:rotten_flesh"), Some(expected));
    }

    #[test]
    fn unknown_and_malformed_names_do_not_resolve() {
        let catalog = KindCatalog::standard();
        assert_eq!(catalog.resolve("unobtainium"), None);
        assert_eq!(catalog.resolve("not a kind"), None);
    }

    #[test]
    fn custom_kinds_can_be_added() {
        let mut catalog = KindCatalog::new();
        assert!(catalog.is_empty());
        catalog.insert(ItemKind::parse("mymod:ruby").unwrap());
        assert!(catalog.resolve("MyMod:Ruby").is_some());
        assert_eq!(catalog.len(), 1);
    }
}
