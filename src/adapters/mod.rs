// Adapters layer: concrete implementations for external systems (inventory exports, the verification service).

pub mod http;
pub mod inventory;

pub use http::VahanClient;
pub use inventory::{FileInventory, InventoryFormat};
