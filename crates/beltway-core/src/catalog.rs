use std::collections::{BTreeSet, HashMap};

use crate::id::ItemKind;

/// An item kind definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindDef {
    /// Machine name, e.g. `iron_ore`.
    pub name: String,
    /// Whether this kind is a raw ore (see `ItemRegistry::contains_ore_kind`).
    pub ore: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("duplicate item kind name: {0}")]
    DuplicateName(String),
    #[error("item kind name must not be empty")]
    EmptyName,
}

/// Builder for an immutable [`KindCatalog`].
#[derive(Debug, Default)]
pub struct KindCatalogBuilder {
    kinds: Vec<KindDef>,
    name_to_id: HashMap<String, ItemKind>,
}

impl KindCatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind. Ids are assigned densely in registration order.
    pub fn register(&mut self, name: &str, ore: bool) -> Result<ItemKind, CatalogError> {
        if name.is_empty() {
            return Err(CatalogError::EmptyName);
        }
        if self.name_to_id.contains_key(name) {
            return Err(CatalogError::DuplicateName(name.to_string()));
        }
        let id = ItemKind(self.kinds.len() as u32);
        self.kinds.push(KindDef {
            name: name.to_string(),
            ore,
        });
        self.name_to_id.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn kind_id(&self, name: &str) -> Option<ItemKind> {
        self.name_to_id.get(name).copied()
    }

    pub fn build(self) -> KindCatalog {
        KindCatalog {
            kinds: self.kinds,
            name_to_id: self.name_to_id,
        }
    }
}

/// Frozen set of item kinds.
#[derive(Debug, Clone, Default)]
pub struct KindCatalog {
    kinds: Vec<KindDef>,
    name_to_id: HashMap<String, ItemKind>,
}

impl KindCatalog {
    pub fn get(&self, kind: ItemKind) -> Option<&KindDef> {
        self.kinds.get(kind.0 as usize)
    }

    pub fn kind_id(&self, name: &str) -> Option<ItemKind> {
        self.name_to_id.get(name).copied()
    }

    pub fn name(&self, kind: ItemKind) -> Option<&str> {
        self.get(kind).map(|def| def.name.as_str())
    }

    /// Human-readable name: underscores become spaces and each word is
    /// capitalised (`iron_ore` -> `Iron Ore`).
    pub fn display_name(&self, kind: ItemKind) -> Option<String> {
        self.name(kind).map(title_case)
    }

    /// All kinds flagged as raw ore.
    pub fn ore_kinds(&self) -> BTreeSet<ItemKind> {
        self.kinds
            .iter()
            .enumerate()
            .filter(|(_, def)| def.ore)
            .map(|(i, _)| ItemKind(i as u32))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

fn title_case(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
