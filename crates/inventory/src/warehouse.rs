use serde::{Deserialize, Serialize};

use oilstock_core::WarehouseId;

/// A row of `warehouses` (`select id,name`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: WarehouseId,
    pub name: String,
}

impl Warehouse {
    pub fn new(id: WarehouseId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Sort warehouses the way the backend's `order=name.asc` does.
pub fn sort_by_name(warehouses: &mut [Warehouse]) {
    warehouses.sort_by(|a, b| a.name.cmp(&b.name));
}
