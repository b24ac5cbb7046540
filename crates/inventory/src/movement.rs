//! Inventory movements: what the form collects and what gets inserted.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use oilstock_core::{DomainError, DomainResult, ProductId, UserId, WarehouseId};

use crate::product::ProductKey;

/// Kind of ledger entry (`inventory_movements.movement`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    #[default]
    In,
    Out,
    Adjustment,
}

impl MovementKind {
    pub const ALL: [MovementKind; 3] = [MovementKind::In, MovementKind::Out, MovementKind::Adjustment];

    pub fn code(&self) -> &'static str {
        match self {
            MovementKind::In => "in",
            MovementKind::Out => "out",
            MovementKind::Adjustment => "adjustment",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MovementKind::In => "Ingresso",
            MovementKind::Out => "Uscita",
            MovementKind::Adjustment => "Rettifica",
        }
    }

    /// +1 for stock-increasing kinds, -1 for outbound.
    ///
    /// Adjustments are recorded as positive quantities.
    pub fn sign(&self) -> i64 {
        match self {
            MovementKind::Out => -1,
            MovementKind::In | MovementKind::Adjustment => 1,
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for MovementKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "in" => Ok(MovementKind::In),
            "out" => Ok(MovementKind::Out),
            "adjustment" => Ok(MovementKind::Adjustment),
            other => Err(DomainError::unknown_code("movement kind", other)),
        }
    }
}

/// Parse the "units" form field. An empty field counts as one unit;
/// fractions are rejected rather than truncated.
pub fn parse_units(raw: &str) -> DomainResult<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(1);
    }
    let units: i64 = raw
        .parse()
        .map_err(|_| DomainError::validation(format!("units must be a whole number, got '{raw}'")))?;
    if units < 1 {
        return Err(DomainError::validation("units must be at least 1"));
    }
    Ok(units)
}

/// Movement as entered in the form, before the product id is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementDraft {
    pub warehouse_id: Option<WarehouseId>,
    pub product: ProductKey,
    pub kind: MovementKind,
    pub units: i64,
    pub note: String,
}

impl MovementDraft {
    /// Signed millilitres this draft moves: `sign * units * ml_per_unit`.
    pub fn quantity_ml(&self) -> DomainResult<i64> {
        if self.units < 1 {
            return Err(DomainError::validation("units must be at least 1"));
        }
        self.units
            .checked_mul(self.product.size.ml_per_unit())
            .map(|ml| ml * self.kind.sign())
            .ok_or_else(|| DomainError::validation("quantity is too large"))
    }

    /// Turn the draft into an insertable row once the product is known.
    ///
    /// Fails when no warehouse was selected; a blank note becomes `None`.
    pub fn into_new_movement(self, product_id: ProductId, user_id: UserId) -> DomainResult<NewMovement> {
        let quantity_ml = self.quantity_ml()?;
        let warehouse_id = self
            .warehouse_id
            .ok_or_else(|| DomainError::validation("warehouse is required"))?;
        let note = self.note.trim();

        Ok(NewMovement {
            warehouse_id,
            product_id,
            movement: self.kind,
            quantity_ml,
            note: (!note.is_empty()).then(|| note.to_string()),
            user_id,
        })
    }
}

/// Row inserted into `inventory_movements`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovement {
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub movement: MovementKind,
    pub quantity_ml: i64,
    pub note: Option<String>,
    pub user_id: UserId,
}
