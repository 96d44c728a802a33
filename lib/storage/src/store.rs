// On-disk layout for shelves and their distributions:
//
//   <data_dir>/shelves/<id>/shelf.json
//   <data_dir>/shelves/<id>/<distribution>.txt
use crate::text_format::{read_distribution, write_distribution};
use atomicwrites::{AllowOverwrite, AtomicFile};
use serde::{Deserialize, Serialize};
use shelfx_core::{Distribution, Error, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const MANIFEST_FILE: &str = "shelf.json";
const DISTRIBUTION_EXTENSION: &str = "txt";

/// What is needed to rebuild a shelf: its shape, the product list it uses and
/// its history order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShelfManifest {
    pub id: u32,
    pub xsize: usize,
    pub ysize: usize,
    pub product_list: String,
    pub history: Vec<String>,
}

pub struct DistributionStore {
    root: PathBuf,
}

/// Keep letters, digits, `-` and `_`; escape everything else as `%XX` so any
/// distribution name maps to a distinct, safe file name.
fn file_stem(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    AtomicFile::new(path, AllowOverwrite)
        .write(|f| f.write_all(data))
        .map_err(|e| Error::Persistence(format!("failed to write {:?}: {}", path, e)))
}

impl DistributionStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let root = data_dir.as_ref().join("shelves");
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn shelf_dir(&self, id: u32) -> PathBuf {
        self.root.join(id.to_string())
    }

    pub fn distribution_path(&self, id: u32, name: &str) -> PathBuf {
        self.shelf_dir(id)
            .join(file_stem(name))
            .with_extension(DISTRIBUTION_EXTENSION)
    }

    pub fn write_manifest(&self, manifest: &ShelfManifest) -> Result<()> {
        let dir = self.shelf_dir(manifest.id);
        fs::create_dir_all(&dir)?;
        let json = serde_json::to_vec_pretty(manifest)?;
        write_atomic(&dir.join(MANIFEST_FILE), &json)
    }

    /// All manifests, ordered by shelf id.
    pub fn read_manifests(&self) -> Result<Vec<ShelfManifest>> {
        let mut manifests = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path().join(MANIFEST_FILE);
            if !path.is_file() {
                continue;
            }
            let data = fs::read(&path)?;
            manifests.push(serde_json::from_slice::<ShelfManifest>(&data)?);
        }
        manifests.sort_by_key(|m| m.id);
        Ok(manifests)
    }

    pub fn write_distribution(&self, id: u32, distribution: &Distribution) -> Result<PathBuf> {
        let text = write_distribution(distribution)?;
        fs::create_dir_all(self.shelf_dir(id))?;
        let path = self.distribution_path(id, distribution.name());
        write_atomic(&path, text.as_bytes())?;
        Ok(path)
    }

    pub fn read_distribution(&self, id: u32, name: &str) -> Result<Distribution> {
        let path = self.distribution_path(id, name);
        if !path.exists() {
            return Err(Error::DistributionNotFound(name.to_string()));
        }
        let distribution = read_distribution(&fs::read_to_string(&path)?)?;
        if distribution.name() != name {
            return Err(Error::Persistence(format!(
                "{:?} holds distribution {:?}, expected {:?}",
                path,
                distribution.name(),
                name
            )));
        }
        Ok(distribution)
    }

    pub fn remove_distribution(&self, id: u32, name: &str) -> Result<bool> {
        let path = self.distribution_path(id, name);
        if path.exists() {
            fs::remove_file(&path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn remove_shelf(&self, id: u32) -> Result<bool> {
        let dir = self.shelf_dir(id);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfx_core::Grid;

    #[test]
    fn test_file_stem_escapes_separators() {
        assert_eq!(file_stem("week-1_a"), "week-1_a");
        assert_eq!(file_stem("a/b"), "a%2Fb");
        assert_eq!(file_stem("a b.c"), "a%20b%2Ec");
    }

    #[test]
    fn test_distribution_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = DistributionStore::new(dir.path()).unwrap();
        let grid = Grid::from_rows(vec![vec![Some("a".to_string()), None]]).unwrap();
        let d = Distribution::from_grid("spring/2026", grid).unwrap();

        let path = store.write_distribution(3, &d).unwrap();
        assert!(path.starts_with(dir.path().join("shelves").join("3")));
        let back = store.read_distribution(3, "spring/2026").unwrap();
        assert_eq!(back.grid(), d.grid());

        assert!(store.remove_distribution(3, "spring/2026").unwrap());
        assert!(!store.remove_distribution(3, "spring/2026").unwrap());
        assert!(matches!(
            store.read_distribution(3, "spring/2026"),
            Err(Error::DistributionNotFound(_))
        ));
    }

    #[test]
    fn test_manifests() {
        let dir = tempfile::tempdir().unwrap();
        let store = DistributionStore::new(dir.path()).unwrap();
        for id in [7, 2] {
            store
                .write_manifest(&ShelfManifest {
                    id,
                    xsize: 2,
                    ysize: 2,
                    product_list: "deli".to_string(),
                    history: vec!["a".to_string()],
                })
                .unwrap();
        }
        let manifests = store.read_manifests().unwrap();
        assert_eq!(manifests.iter().map(|m| m.id).collect::<Vec<_>>(), vec![2, 7]);

        assert!(store.remove_shelf(7).unwrap());
        assert_eq!(store.read_manifests().unwrap().len(), 1);
    }
}
