use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid shelf dimensions: xsize={xsize}, ysize={ysize}")]
    InvalidDimensions { xsize: i64, ysize: i64 },

    #[error("Invalid search limit: 0 (use a negative limit for an unbounded search)")]
    InvalidLimit,

    #[error("Unknown placement algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("Distribution already exists: {0}")]
    DuplicateDistribution(String),

    #[error("Capacity exceeded: {products} products for {capacity} cells")]
    CapacityExceeded { products: usize, capacity: usize },

    #[error("Duplicate product: {0}")]
    DuplicateProduct(String),

    #[error("Invalid similarity between {a} and {b}: {score}")]
    InvalidSimilarity { a: String, b: String, score: f64 },

    #[error("Grid dimension mismatch: expected {expected_rows}x{expected_cols}, got {rows}x{cols}")]
    DimensionMismatch {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Shelf not found: {0}")]
    ShelfNotFound(u32),

    #[error("Shelf already exists: {0}")]
    ShelfExists(u32),

    #[error("Distribution not found: {0}")]
    DistributionNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Product list not found: {0}")]
    ProductListNotFound(String),

    #[error("Shelf {0} has no distributions")]
    EmptyHistory(u32),

    #[error("Cell ({row}, {col}) is outside a {rows}x{cols} grid")]
    CellOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// True for errors raised by validating a request before any work starts.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::InvalidDimensions { .. }
                | Error::InvalidLimit
                | Error::UnknownAlgorithm(_)
                | Error::DuplicateDistribution(_)
                | Error::CapacityExceeded { .. }
                | Error::DuplicateProduct(_)
                | Error::InvalidSimilarity { .. }
                | Error::DimensionMismatch { .. }
                | Error::ShelfExists(_)
        )
    }

    /// True for lookups that named something that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::ShelfNotFound(_)
                | Error::DistributionNotFound(_)
                | Error::ProductNotFound(_)
                | Error::ProductListNotFound(_)
                | Error::EmptyHistory(_)
                | Error::CellOutOfBounds { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
