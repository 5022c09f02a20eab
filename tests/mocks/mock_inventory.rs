use std::future::Future;

use anyhow::anyhow;
use optibench::BackendInventory;

/// Inventory returning a fixed listing, or failing
#[derive(Debug, Clone)]
pub enum MockInventory {
    Listing(String),
    Unavailable(String),
}

impl MockInventory {
    pub fn listing(text: &str) -> Self {
        MockInventory::Listing(text.to_string())
    }

    pub fn unavailable(reason: &str) -> Self {
        MockInventory::Unavailable(reason.to_string())
    }
}

impl BackendInventory for MockInventory {
    fn list_backends(&self) -> impl Future<Output = anyhow::Result<String>> + Send {
        let listing = match self {
            MockInventory::Listing(text) => Ok(text.clone()),
            MockInventory::Unavailable(reason) => Err(anyhow!("{}", reason)),
        };
        async move { listing }
    }
}
