pub mod mock_backend;
pub mod mock_inventory;

pub use mock_backend::ScriptedBackend;
pub use mock_inventory::MockInventory;
