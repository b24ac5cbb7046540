//! Rows of the aggregated stock view (`v_stock_detailed`).

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::product::{Lot, PackageSize, Vintage};

/// Current stock for one (warehouse, vintage, lot, size) bucket.
///
/// Computed by the database; `approx_units` may be fractional when partial
/// units were moved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRow {
    pub warehouse: String,
    pub year: Vintage,
    pub lot: Lot,
    pub size: PackageSize,
    pub qty_ml: f64,
    pub approx_units: f64,
}

/// Warehouse selector value: every warehouse, or one by name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WarehouseFilter {
    #[default]
    All,
    Named(String),
}

impl WarehouseFilter {
    /// Selector value meaning "no filter".
    pub const ALL_VALUE: &'static str = "all";

    /// Interpret the raw selector value; empty and `all` mean no filter.
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some(Self::ALL_VALUE) => WarehouseFilter::All,
            Some(name) => WarehouseFilter::Named(name.to_string()),
        }
    }

    /// Warehouse name to filter on, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            WarehouseFilter::All => None,
            WarehouseFilter::Named(name) => Some(name),
        }
    }

    /// Value to put back into the selector / query string.
    pub fn as_param(&self) -> &str {
        self.name().unwrap_or(Self::ALL_VALUE)
    }

    pub fn matches(&self, row: &StockRow) -> bool {
        self.name().is_none_or(|name| row.warehouse == name)
    }
}

impl fmt::Display for WarehouseFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}
