//! Product lists and the similarity table that describes them.
//!
//! Catalog documents are JSON:
//!
//! ```json
//! {
//!   "product_lists": [
//!     { "name": "deli", "products": [ { "name": "ham", "category": "meat", "price": 2.5 } ] }
//!   ],
//!   "similarities": [ { "a": "ham", "b": "salami", "score": 0.9 } ]
//! }
//! ```

use crate::similarity::SimilarityEntry;
use crate::{Error, Product, ProductList, Result, SimilarityTable};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    product_lists: Vec<ProductListDocument>,
    #[serde(default)]
    similarities: Vec<SimilarityEntry>,
    /// Fill pairs missing from `similarities` from category and price.
    #[serde(default)]
    derive_missing: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProductListDocument {
    name: String,
    products: Vec<Product>,
}

/// Product lists by name plus the similarity table shared by all of them.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    product_lists: AHashMap<String, Arc<ProductList>>,
    similarity: SimilarityTable,
}

impl Catalog {
    pub fn new(similarity: SimilarityTable) -> Self {
        Self {
            product_lists: AHashMap::new(),
            similarity,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let document: CatalogDocument = serde_json::from_str(json)?;
        let mut similarity = SimilarityTable::from_entries(&document.similarities)?;

        let mut catalog = Catalog::default();
        for list in document.product_lists {
            let list = ProductList::new(list.name, list.products)?;
            if document.derive_missing {
                let derived = SimilarityTable::derive_from_attributes(list.products());
                for entry in derived.entries() {
                    if !similarity.contains(&entry.a, &entry.b) {
                        similarity.set(&entry.a, &entry.b, entry.score)?;
                    }
                }
            }
            catalog.add_product_list(list);
        }
        catalog.similarity = similarity;
        Ok(catalog)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        let mut names: Vec<&String> = self.product_lists.keys().collect();
        names.sort();
        let document = CatalogDocument {
            product_lists: names
                .into_iter()
                .map(|name| ProductListDocument {
                    name: name.clone(),
                    products: self.product_lists[name].products().to_vec(),
                })
                .collect(),
            similarities: self.similarity.entries(),
            derive_missing: false,
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Add or replace a product list.
    pub fn add_product_list(&mut self, list: ProductList) -> Arc<ProductList> {
        let list = Arc::new(list);
        self.product_lists
            .insert(list.name().to_string(), list.clone());
        list
    }

    pub fn product_list(&self, name: &str) -> Result<Arc<ProductList>> {
        self.product_lists
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ProductListNotFound(name.to_string()))
    }

    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.product_lists.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn similarity(&self) -> &SimilarityTable {
        &self.similarity
    }

    pub fn similarity_mut(&mut self) -> &mut SimilarityTable {
        &mut self.similarity
    }
}
