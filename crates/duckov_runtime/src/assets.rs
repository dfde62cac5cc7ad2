//! Async item definition loading.
//!
//! Definitions are the only thing a flow ever waits on from the content side;
//! once loaded, instantiation is synchronous and happens under a short
//! borrow of the game.

use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use duckov_core::catalog::{ItemCatalog, ItemDefinition, ItemTypeId};
use duckov_core::data::ContentPack;
use duckov_core::error::GameError;
use duckov_core::item::{stack_sizes, ItemId};

use crate::{Result, SharedState};

/// Source of item definitions.
#[allow(async_fn_in_trait)]
pub trait AssetLoader {
    /// Load the definition of `type_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownItemType`] if no such type exists.
    async fn load(&self, type_id: ItemTypeId) -> Result<ItemDefinition>;
}

/// Loads definitions from an in-memory catalog, optionally after a delay.
#[derive(Debug, Clone)]
pub struct CatalogLoader {
    catalog: Rc<ItemCatalog>,
    latency: Duration,
}

impl CatalogLoader {
    /// Serve definitions from `catalog` immediately.
    #[must_use]
    pub fn new(catalog: ItemCatalog) -> Self {
        Self {
            catalog: Rc::new(catalog),
            latency: Duration::ZERO,
        }
    }

    /// Serve definitions after `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// The catalog behind this loader.
    #[must_use]
    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }
}

impl AssetLoader for CatalogLoader {
    async fn load(&self, type_id: ItemTypeId) -> Result<ItemDefinition> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let definition = self
            .catalog
            .get(type_id)
            .cloned()
            .ok_or(GameError::UnknownItemType(type_id))?;
        tracing::trace!(type_id = type_id.0, "Loaded item definition");
        Ok(definition)
    }
}

/// Read and parse a RON content pack.
///
/// # Errors
///
/// Fails with [`GameError::Io`] if the file cannot be read and
/// [`GameError::DataParseError`] if it is not a valid pack.
pub async fn load_content_pack(path: impl AsRef<Path>) -> Result<ContentPack> {
    let path = path.as_ref();
    let label = path.display().to_string();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| GameError::Io {
            path: label.clone(),
            source,
        })?;
    let pack = ContentPack::from_ron_str(&text, &label)?;
    tracing::info!(path = %label, items = pack.items.len(), formulas = pack.formulas.len(), "Loaded content pack");
    Ok(pack)
}

/// Create `units` of a type as root stacks, loading the definition first.
///
/// # Errors
///
/// Fails if the loader does not know the type; nothing is created then.
pub async fn instantiate<L: AssetLoader>(
    state: &SharedState,
    loader: &L,
    type_id: ItemTypeId,
    units: u32,
) -> Result<Vec<ItemId>> {
    let definition = loader.load(type_id).await?;
    let mut state = state.borrow_mut();
    Ok(stack_sizes(units, definition.max_stack_count)
        .into_iter()
        .map(|count| state.world_mut().spawn(&definition, count))
        .collect())
}
