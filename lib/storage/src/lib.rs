pub mod manager;
pub mod store;
pub mod text_format;

pub use manager::{ManagerConfig, ShelfManager};
pub use store::{DistributionStore, ShelfManifest};
pub use text_format::{read_distribution, write_distribution};
