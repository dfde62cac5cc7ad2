//! Buildable sites in the base.
//!
//! A site has a one-off cost. Once built it stays built, and the flag is
//! persisted under `"ConstructionSite_" + id`.

use serde::{Deserialize, Serialize};

use crate::cost::{Cost, PaymentSources};
use crate::economy::Economy;
use crate::error::Result;
use crate::events::{EventQueue, GameEvent};
use crate::item::{ItemId, ItemWorld};
use crate::saves::{keys, SaveStore};

/// A site waiting to be (or already) built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructionSite {
    id: String,
    cost: Cost,
    built: bool,
}

impl ConstructionSite {
    /// Create an unbuilt site.
    #[must_use]
    pub fn new(id: impl Into<String>, cost: Cost) -> Self {
        Self {
            id: id.into(),
            cost,
            built: false,
        }
    }

    /// Site id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Build cost.
    #[must_use]
    pub fn cost(&self) -> &Cost {
        &self.cost
    }

    /// Whether the site has been built.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Pay the cost and build.
    ///
    /// Returns `false` if already built or the cost cannot be paid.
    pub fn try_build(
        &mut self,
        economy: &mut Economy,
        world: &mut ItemWorld,
        holder: ItemId,
        events: &mut EventQueue,
    ) -> bool {
        if self.built {
            return false;
        }
        if !self
            .cost
            .pay(economy, world, holder, PaymentSources::ALL, events)
        {
            return false;
        }
        self.built = true;
        events.push(GameEvent::ConstructionCompleted {
            site: self.id.clone(),
        });
        tracing::info!(site = %self.id, "Construction completed");
        true
    }

    /// Persist the built flag.
    ///
    /// # Errors
    ///
    /// Fails if encoding fails.
    pub fn save(&self, store: &mut SaveStore) -> Result<()> {
        store.save(&keys::construction_site(&self.id), &self.built)
    }

    /// Restore the built flag. Returns `false` if nothing was saved.
    ///
    /// # Errors
    ///
    /// Fails if the stored value is corrupt.
    pub fn load(&mut self, store: &SaveStore) -> Result<bool> {
        match store.load::<bool>(&keys::construction_site(&self.id))? {
            Some(built) => {
                self.built = built;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ItemDefinition, ItemTypeId};

    fn player(world: &mut ItemWorld) -> ItemId {
        world.spawn(&ItemDefinition::new(ItemTypeId(1), "Player").with_inventory(4), 1)
    }

    #[test]
    fn test_build_once() {
        let mut world = ItemWorld::new();
        let holder = player(&mut world);
        let mut events = EventQueue::new();
        let mut economy = Economy::new(500, None);
        let mut site = ConstructionSite::new("Workbench", Cost::money(300));

        assert!(site.try_build(&mut economy, &mut world, holder, &mut events));
        assert!(site.is_built());
        assert!(!site.try_build(&mut economy, &mut world, holder, &mut events));
        assert_eq!(economy.money(), 200);
        assert!(events.iter().any(|e| matches!(e, GameEvent::ConstructionCompleted { site } if site == "Workbench")));
    }

    #[test]
    fn test_cannot_afford() {
        let mut world = ItemWorld::new();
        let holder = player(&mut world);
        let mut events = EventQueue::new();
        let mut economy = Economy::new(100, None);
        let mut site = ConstructionSite::new("Bridge", Cost::money(300));

        assert!(!site.try_build(&mut economy, &mut world, holder, &mut events));
        assert!(!site.is_built());
        assert_eq!(economy.money(), 100);
    }

    #[test]
    fn test_built_flag_persists() {
        let mut store = SaveStore::new();
        let mut site = ConstructionSite::new("Bridge", Cost::money(0));
        let mut world = ItemWorld::new();
        let holder = player(&mut world);
        let mut events = EventQueue::new();
        let mut economy = Economy::new(0, None);
        site.try_build(&mut economy, &mut world, holder, &mut events);
        site.save(&mut store).expect("encodable");

        assert!(store.contains("ConstructionSite_Bridge"));
        let mut restored = ConstructionSite::new("Bridge", Cost::money(0));
        assert!(restored.load(&store).expect("decodable"));
        assert!(restored.is_built());
    }
}
