//! Content packs: item definitions plus crafting formulas.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::catalog::{ItemCatalog, ItemDefinition};
use crate::crafting::{CraftingFormula, FormulaCollection};
use crate::error::Result;

/// One RON file worth of content.
///
/// # Example RON
///
/// ```ron
/// ContentPack(
///     items: [
///         ItemDefinition(type_id: 10, name: "Ore", max_stack_count: 20),
///     ],
///     formulas: [
///         CraftingFormula(
///             id: "OreBrick",
///             cost: Cost(items: [CostEntry(type_id: 10, amount: 5)]),
///             result: CraftingResult(type_id: 11, amount: 1),
///         ),
///     ],
/// )
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentPack {
    /// Item types.
    #[serde(default)]
    pub items: Vec<ItemDefinition>,
    /// Crafting formulas.
    #[serde(default)]
    pub formulas: Vec<CraftingFormula>,
}

impl ContentPack {
    /// Parse a pack from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::GameError::DataParseError`] on invalid RON.
    pub fn from_ron_str(text: &str, label: &str) -> Result<Self> {
        super::parse_ron(text, label)
    }

    /// Check the pack for authoring mistakes.
    ///
    /// Covers duplicate type and formula ids, per-definition sanity and
    /// formula references to unknown types.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let mut type_ids = BTreeSet::new();
        for item in &self.items {
            if !type_ids.insert(item.type_id) {
                errors.push(format!("Duplicate item type {} ('{}')", item.type_id, item.name));
            }
            errors.extend(item.validate());
        }

        let mut formula_ids = BTreeSet::new();
        for formula in &self.formulas {
            if !formula_ids.insert(formula.id.as_str()) {
                errors.push(format!("Duplicate formula id '{}'", formula.id));
            }
        }

        let catalog: ItemCatalog = self.items.iter().cloned().collect();
        let mut formulas = FormulaCollection::new();
        for formula in &self.formulas {
            // Duplicates were reported above.
            let _ = formulas.insert(formula.clone());
        }
        errors.extend(formulas.validate(&catalog));
        errors
    }

    /// Build the runtime registries.
    ///
    /// Duplicate item types are logged and the first kept; duplicate
    /// formulas are an error.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::GameError::DuplicateFormula`].
    pub fn into_registries(self) -> Result<(ItemCatalog, FormulaCollection)> {
        let catalog: ItemCatalog = self.items.into_iter().collect();
        let formulas = FormulaCollection::from_formulas(self.formulas)?;
        tracing::debug!(items = catalog.len(), formulas = formulas.len(), "Loaded content pack");
        Ok((catalog, formulas))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ItemTypeId;
    use crate::error::GameError;

    const PACK: &str = r#"
        ContentPack(
            items: [
                ItemDefinition(type_id: 10, name: "Ore", max_stack_count: 20, unit_weight: 0.5),
                ItemDefinition(type_id: 11, name: "Brick"),
            ],
            formulas: [
                CraftingFormula(
                    id: "OreBrick",
                    cost: Cost(money: 5, items: [CostEntry(type_id: 10, amount: 5)]),
                    result: CraftingResult(type_id: 11, amount: 1),
                    unlock_by_default: true,
                ),
            ],
        )
    "#;

    #[test]
    fn test_parse_pack() {
        let pack = ContentPack::from_ron_str(PACK, "pack.ron").expect("valid RON");
        assert!(pack.validate().is_empty(), "{:?}", pack.validate());

        let (catalog, formulas) = pack.into_registries().expect("unique formulas");
        assert_eq!(catalog.len(), 2);
        assert_eq!(
            formulas.get("OreBrick").map(|f| f.result.type_id),
            Some(ItemTypeId(11))
        );
    }

    #[test]
    fn test_validate_reports_problems() {
        let mut pack = ContentPack::from_ron_str(PACK, "pack.ron").expect("valid RON");
        pack.items.push(ItemDefinition::new(ItemTypeId(10), "Ore again"));
        let mut dup = pack.formulas[0].clone();
        dup.result.type_id = ItemTypeId(99);
        pack.formulas.push(dup);

        let errors = pack.validate();
        assert!(errors.iter().any(|e| e.contains("Duplicate item type")));
        assert!(errors.iter().any(|e| e.contains("Duplicate formula id")));
        assert!(matches!(
            pack.into_registries(),
            Err(GameError::DuplicateFormula(id)) if id == "OreBrick"
        ));
    }

    #[test]
    fn test_invalid_ron() {
        let result = ContentPack::from_ron_str("ContentPack(items: 5)", "bad.ron");
        assert!(matches!(result, Err(GameError::DataParseError { path, .. }) if path == "bad.ron"));
    }
}
