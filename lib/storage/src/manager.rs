use crate::store::{DistributionStore, ShelfManifest};
use crate::text_format;
use ahash::AHashMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use shelfx_core::{
    Algorithm, Catalog, Coord, Distribution, Error, Result, Shelf, ShelfConfig,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Manager settings
#[derive(Debug, Clone, Default)]
pub struct ManagerConfig {
    /// Directory for shelf manifests and distribution files. `None` keeps
    /// everything in memory.
    pub data_dir: Option<PathBuf>,
    /// Write a shelf back to disk after every change.
    pub autosave: bool,
}

/// Owns the catalog and every shelf, and keeps distribution names unique
/// across all shelves.
pub struct ShelfManager {
    catalog: RwLock<Catalog>,
    shelves: RwLock<BTreeMap<u32, Arc<Shelf>>>,
    /// Distribution name to owning shelf id.
    owners: RwLock<AHashMap<String, u32>>,
    store: Option<DistributionStore>,
    autosave: bool,
}

impl ShelfManager {
    /// In-memory manager.
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: RwLock::new(catalog),
            shelves: RwLock::new(BTreeMap::new()),
            owners: RwLock::new(AHashMap::new()),
            store: None,
            autosave: false,
        }
    }

    /// Manager persisting under `data_dir`, restoring whatever is already
    /// there.
    pub fn open<P: AsRef<Path>>(data_dir: P, catalog: Catalog) -> Result<Self> {
        Self::with_config(
            ManagerConfig {
                data_dir: Some(data_dir.as_ref().to_path_buf()),
                autosave: true,
            },
            catalog,
        )
    }

    pub fn with_config(config: ManagerConfig, catalog: Catalog) -> Result<Self> {
        let mut manager = Self::new(catalog);
        manager.autosave = config.autosave;
        if let Some(data_dir) = config.data_dir {
            let store = DistributionStore::new(&data_dir)?;
            manager.restore(&store)?;
            manager.store = Some(store);
            info!(
                "Loaded {} shelves from {:?}",
                manager.shelves.read().len(),
                data_dir
            );
        }
        Ok(manager)
    }

    fn restore(&self, store: &DistributionStore) -> Result<()> {
        for manifest in store.read_manifests()? {
            let products = match self.catalog.read().product_list(&manifest.product_list) {
                Ok(products) => products,
                Err(e) => {
                    warn!(shelf = manifest.id, "Skipping shelf: {}", e);
                    continue;
                }
            };
            let config = ShelfConfig {
                id: manifest.id,
                xsize: manifest.xsize,
                ysize: manifest.ysize,
            };
            let shelf = match Shelf::new(config, products) {
                Ok(shelf) => Arc::new(shelf),
                Err(e) => {
                    warn!(shelf = manifest.id, "Skipping shelf: {}", e);
                    continue;
                }
            };

            let mut owners = self.owners.write();
            for name in &manifest.history {
                if owners.contains_key(name) {
                    warn!(shelf = manifest.id, distribution = %name, "Skipping duplicate distribution");
                    continue;
                }
                let restored = store
                    .read_distribution(manifest.id, name)
                    .and_then(|d| shelf.restore_distribution(d));
                match restored {
                    Ok(()) => {
                        owners.insert(name.clone(), manifest.id);
                    }
                    Err(e) => {
                        warn!(shelf = manifest.id, distribution = %name, "Failed to restore distribution: {}", e);
                    }
                }
            }
            drop(owners);
            self.shelves.write().insert(manifest.id, shelf);
        }
        Ok(())
    }

    pub fn catalog(&self) -> RwLockReadGuard<'_, Catalog> {
        self.catalog.read()
    }

    pub fn catalog_mut(&self) -> RwLockWriteGuard<'_, Catalog> {
        self.catalog.write()
    }

    pub fn create_shelf(&self, config: ShelfConfig, product_list: &str) -> Result<Arc<Shelf>> {
        let products = self.catalog.read().product_list(product_list)?;
        let mut shelves = self.shelves.write();
        if shelves.contains_key(&config.id) {
            return Err(Error::ShelfExists(config.id));
        }
        let shelf = Arc::new(Shelf::new(config, products)?);
        shelves.insert(config.id, shelf.clone());
        drop(shelves);

        if let Err(e) = self.autosave_shelf(&shelf) {
            self.shelves.write().remove(&config.id);
            if let Some(store) = &self.store {
                if let Err(cleanup) = store.remove_shelf(config.id) {
                    warn!(shelf = config.id, "Failed to clean up shelf directory: {}", cleanup);
                }
            }
            return Err(e);
        }
        info!(shelf = config.id, xsize = config.xsize, ysize = config.ysize, "created shelf");
        Ok(shelf)
    }

    #[inline]
    pub fn shelf(&self, id: u32) -> Result<Arc<Shelf>> {
        self.shelves
            .read()
            .get(&id)
            .cloned()
            .ok_or(Error::ShelfNotFound(id))
    }

    /// Shelf ids in ascending order.
    pub fn list_shelves(&self) -> Vec<u32> {
        self.shelves.read().keys().copied().collect()
    }

    /// Remove a shelf together with all of its distributions.
    pub fn delete_shelf(&self, id: u32) -> Result<()> {
        let shelf = self
            .shelves
            .write()
            .remove(&id)
            .ok_or(Error::ShelfNotFound(id))?;
        let mut owners = self.owners.write();
        for name in shelf.distribution_names() {
            owners.remove(&name);
        }
        drop(owners);
        if let Some(store) = &self.store {
            store.remove_shelf(id)?;
        }
        info!(shelf = id, "deleted shelf");
        Ok(())
    }

    /// Shelf id owning the named distribution.
    pub fn distribution_owner(&self, name: &str) -> Option<u32> {
        self.owners.read().get(name).copied()
    }

    pub fn generate_distribution(
        &self,
        shelf_id: u32,
        name: &str,
        algorithm: Algorithm,
        limit: i64,
    ) -> Result<Distribution> {
        let shelf = self.shelf(shelf_id)?;

        // Reserve the name so concurrent requests cannot both take it.
        {
            let mut owners = self.owners.write();
            if owners.contains_key(name) {
                return Err(Error::DuplicateDistribution(name.to_string()));
            }
            owners.insert(name.to_string(), shelf_id);
        }

        let generated = {
            let catalog = self.catalog.read();
            shelf.generate_distribution(name, algorithm, limit, catalog.similarity())
        };
        let saved = generated.and_then(|distribution| match self.autosave_shelf(&shelf) {
            Ok(()) => Ok(distribution),
            Err(e) => {
                shelf.discard_distribution(name)?;
                Err(e)
            }
        });
        if saved.is_err() {
            self.owners.write().remove(name);
        }
        saved
    }

    fn owned_shelf(&self, shelf_id: u32, name: &str) -> Result<Arc<Shelf>> {
        let shelf = self.shelf(shelf_id)?;
        match self.distribution_owner(name) {
            Some(owner) if owner == shelf_id => Ok(shelf),
            _ => Err(Error::DistributionNotFound(name.to_string())),
        }
    }

    pub fn distribution(&self, shelf_id: u32, name: &str) -> Result<Distribution> {
        self.owned_shelf(shelf_id, name)?.distribution_named(name)
    }

    pub fn swap(&self, shelf_id: u32, name: &str, a: Coord, b: Coord) -> Result<Distribution> {
        let shelf = self.owned_shelf(shelf_id, name)?;
        let before = shelf.distribution_named(name)?;
        let position = shelf.position_of(name);
        let distribution = shelf.swap(name, a, b)?;
        if let Err(e) = self.autosave_shelf(&shelf) {
            shelf.discard_distribution(name)?;
            shelf.restore_distribution(before)?;
            if let Some(position) = position {
                shelf.reposition(name, position)?;
            }
            return Err(e);
        }
        Ok(distribution)
    }

    pub fn promote(&self, shelf_id: u32, name: &str) -> Result<Distribution> {
        let shelf = self.owned_shelf(shelf_id, name)?;
        let position = shelf.position_of(name);
        let distribution = shelf.promote(name)?;
        if let Err(e) = self.autosave_shelf(&shelf) {
            if let Some(position) = position {
                shelf.reposition(name, position)?;
            }
            return Err(e);
        }
        Ok(distribution)
    }

    /// Assign another product list to a shelf, dropping its history.
    pub fn reassign_products(&self, shelf_id: u32, product_list: &str) -> Result<Vec<String>> {
        let shelf = self.shelf(shelf_id)?;
        let products = self.catalog.read().product_list(product_list)?;
        let cleared = shelf.reassign_products(products)?;

        let mut owners = self.owners.write();
        for name in &cleared {
            owners.remove(name);
        }
        drop(owners);

        if let Some(store) = &self.store {
            for name in &cleared {
                store.remove_distribution(shelf_id, name)?;
            }
        }
        self.autosave_shelf(&shelf)?;
        Ok(cleared)
    }

    /// Text form of one distribution.
    pub fn export_distribution(&self, shelf_id: u32, name: &str) -> Result<String> {
        text_format::write_distribution(&self.distribution(shelf_id, name)?)
    }

    fn autosave_shelf(&self, shelf: &Shelf) -> Result<()> {
        if self.autosave && self.store.is_some() {
            self.persist_shelf(shelf)?;
        }
        Ok(())
    }

    fn persist_shelf(&self, shelf: &Shelf) -> Result<()> {
        let Some(store) = &self.store else {
            return Err(Error::Persistence("manager has no data directory".to_string()));
        };
        let config = shelf.config();
        let mut history = Vec::with_capacity(shelf.history_len());
        for entry in shelf.distribution_history_log() {
            let distribution = shelf.distribution_named(&entry.name)?;
            store.write_distribution(config.id, &distribution)?;
            history.push(entry.name);
        }
        store.write_manifest(&ShelfManifest {
            id: config.id,
            xsize: config.xsize,
            ysize: config.ysize,
            product_list: shelf.products().name().to_string(),
            history,
        })
    }

    /// Write one shelf to the data directory.
    pub fn save_shelf(&self, shelf_id: u32) -> Result<()> {
        let shelf = self.shelf(shelf_id)?;
        self.persist_shelf(&shelf)
    }

    /// Write every shelf to the data directory.
    pub fn save_all(&self) -> Result<()> {
        let shelves: Vec<Arc<Shelf>> = self.shelves.read().values().cloned().collect();
        for shelf in shelves {
            self.persist_shelf(&shelf)?;
        }
        Ok(())
    }
}
