//! Inventory view-models for the oil warehouse.
//!
//! Everything here mirrors rows of the hosted database (warehouses, products,
//! the aggregated stock view) or validates what a user typed into the movement
//! form. There is no IO; the adapters in `oilstock-infra` fill these types.

pub mod format;
pub mod movement;
pub mod product;
pub mod stock;
pub mod warehouse;

pub use format::format_quantity;
pub use movement::{parse_units, MovementDraft, MovementKind, NewMovement};
pub use product::{Lot, PackageSize, ProductKey, Vintage, DEFAULT_VINTAGE, VINTAGES};
pub use stock::{StockRow, WarehouseFilter};
pub use warehouse::Warehouse;
