//! Catalog listing.

use serde::Serialize;

use duckov_core::catalog::ItemTypeId;
use duckov_core::data::ContentPack;

/// One row of the listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    /// Type identifier.
    pub type_id: ItemTypeId,
    /// Display name.
    pub name: String,
    /// Largest stack.
    pub max_stack_count: u32,
    /// Weight of one unit.
    pub unit_weight: f64,
    /// Tags.
    pub tags: Vec<String>,
    /// Slot keys, in declaration order.
    pub slots: Vec<String>,
    /// Inventory capacity, if any.
    pub inventory_capacity: Option<usize>,
    /// Shop price per unit.
    pub price: i64,
    /// Formulas that produce this type.
    pub crafted_by: Vec<String>,
}

/// Summarize a pack, sorted by type id.
#[must_use]
pub fn catalog_entries(pack: &ContentPack) -> Vec<CatalogEntry> {
    let mut entries: Vec<CatalogEntry> = pack
        .items
        .iter()
        .map(|item| CatalogEntry {
            type_id: item.type_id,
            name: item.name.clone(),
            max_stack_count: item.max_stack_count,
            unit_weight: item.unit_weight.to_num(),
            tags: item.tags.iter().map(|tag| tag.as_str().to_string()).collect(),
            slots: item.slots.iter().map(|slot| slot.key.clone()).collect(),
            inventory_capacity: item.inventory_capacity,
            price: item.price,
            crafted_by: pack
                .formulas
                .iter()
                .filter(|formula| formula.result.type_id == item.type_id)
                .map(|formula| formula.id.clone())
                .collect(),
        })
        .collect();
    entries.sort_by_key(|entry| entry.type_id);
    entries
}

/// The listing as pretty-printed JSON.
///
/// # Errors
///
/// Fails only if serialization fails, which plain data does not.
pub fn catalog_json(pack: &ContentPack) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&catalog_entries(pack))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACK: &str = r#"
        ContentPack(
            items: [
                ItemDefinition(type_id: 11, name: "Brick", unit_weight: 1.5),
                ItemDefinition(type_id: 10, name: "Ore", max_stack_count: 20, tags: ["Material"]),
            ],
            formulas: [
                CraftingFormula(
                    id: "OreBrick",
                    cost: Cost(items: [CostEntry(type_id: 10, amount: 5)]),
                    result: CraftingResult(type_id: 11, amount: 1),
                ),
            ],
        )
    "#;

    #[test]
    fn test_entries_sorted_with_formulas() {
        let pack = ContentPack::from_ron_str(PACK, "pack.ron").expect("valid RON");
        let entries = catalog_entries(&pack);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Ore");
        assert_eq!(entries[0].tags, vec!["Material".to_string()]);
        assert!(entries[0].crafted_by.is_empty());
        assert_eq!(entries[1].crafted_by, vec!["OreBrick".to_string()]);
        assert!((entries[1].unit_weight - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_json_output() {
        let pack = ContentPack::from_ron_str(PACK, "pack.ron").expect("valid RON");
        let json = catalog_json(&pack).expect("serializable");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");

        assert_eq!(value[0]["type_id"], 10);
        assert_eq!(value[1]["crafted_by"][0], "OreBrick");
    }
}
