pub mod factory;
pub mod marketplace;

pub use factory::{BackendConfig, BackendFactory, BackendRegistry};
pub use marketplace::{BackendError, InventoryStore, MarketplaceBackend};
