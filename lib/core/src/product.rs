use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A catalog item that can be placed on a shelf.
///
/// Identity is the name: two products with the same name are the same product
/// regardless of price or stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub original_price: f64,
    #[serde(default)]
    pub amount: u32,
}

impl Product {
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: String::new(),
            price: 0.0,
            original_price: 0.0,
            amount: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self.original_price = price;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_amount(mut self, amount: u32) -> Self {
        self.amount = amount;
        self
    }
}

impl PartialEq for Product {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Product {}

impl Hash for Product {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// A named set of products, kept in insertion order with unique names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductList {
    name: String,
    products: Vec<Product>,
}

impl ProductList {
    pub fn new(name: impl Into<String>, products: Vec<Product>) -> Result<Self> {
        let mut seen = ahash::AHashSet::with_capacity(products.len());
        for product in &products {
            if !seen.insert(product.name.as_str()) {
                return Err(Error::DuplicateProduct(product.name.clone()));
            }
        }
        Ok(Self {
            name: name.into(),
            products,
        })
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            products: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.products.iter().any(|p| p.name == name)
    }

    /// Product names in ascending order.
    pub fn sorted_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.products.iter().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        names
    }
}
