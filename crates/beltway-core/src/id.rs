use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a live item in the registry arena.
    ///
    /// Keys are generational: a key whose item has been removed never
    /// resolves to a later item that reuses the slot.
    pub struct ItemId;
}

/// Identifies an item kind (resource or material) in the catalog. Cheap to
/// copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemKind(pub u32);
