//! Request and response shapes for pages and the JSON API.

use serde::{Deserialize, Serialize};

use oilstock_core::{DomainError, DomainResult, UserId, WarehouseId};
use oilstock_inventory::{
    parse_units, Lot, MovementDraft, MovementKind, PackageSize, ProductKey, Vintage, DEFAULT_VINTAGE,
};

use crate::context::SessionContext;

#[derive(Debug, Deserialize)]
pub struct SignInForm {
    #[serde(default)]
    pub email: String,
}

/// Query string of the emailed sign-in link.
#[derive(Debug, Deserialize)]
pub struct ConfirmQuery {
    pub token_hash: Option<String>,
    #[serde(rename = "type")]
    pub link_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StockQuery {
    pub warehouse: Option<String>,
    pub notice: Option<String>,
}

/// Raw movement form; every field arrives as text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovementForm {
    #[serde(default)]
    pub warehouse_id: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub lot: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub units: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub filter: String,
}

impl MovementForm {
    /// Parse the fields into a draft. An empty warehouse stays unselected.
    pub fn to_draft(&self) -> DomainResult<MovementDraft> {
        let warehouse_id = match self.warehouse_id.trim() {
            "" => None,
            raw => Some(raw.parse::<WarehouseId>()?),
        };
        let year = match self.year.trim() {
            "" => DEFAULT_VINTAGE,
            raw => raw
                .parse::<Vintage>()
                .map_err(|_| DomainError::validation(format!("invalid year '{raw}'")))?,
        };
        let lot = or_default(&self.lot, Lot::A)?;
        let size = or_default(&self.size, PackageSize::Ml500)?;
        let kind = or_default(&self.kind, MovementKind::In)?;
        let units = parse_units(&self.units)?;

        Ok(MovementDraft {
            warehouse_id,
            product: ProductKey::new(year, lot, size),
            kind,
            units,
            note: self.note.clone(),
        })
    }
}

fn or_default<T>(raw: &str, default: T) -> DomainResult<T>
where
    T: core::str::FromStr<Err = DomainError>,
{
    match raw.trim() {
        "" => Ok(default),
        raw => raw.parse(),
    }
}

/// JSON body of `POST /api/movements`.
#[derive(Debug, Deserialize)]
pub struct MovementRequest {
    pub warehouse_id: Option<WarehouseId>,
    #[serde(default = "default_vintage")]
    pub year: Vintage,
    #[serde(default)]
    pub lot: Lot,
    #[serde(default)]
    pub size: PackageSize,
    #[serde(default)]
    pub kind: MovementKind,
    #[serde(default = "one")]
    pub units: i64,
    #[serde(default)]
    pub note: Option<String>,
}

fn default_vintage() -> Vintage {
    DEFAULT_VINTAGE
}

fn one() -> i64 {
    1
}

impl MovementRequest {
    pub fn into_draft(self) -> MovementDraft {
        MovementDraft {
            warehouse_id: self.warehouse_id,
            product: ProductKey::new(self.year, self.lot, self.size),
            kind: self.kind,
            units: self.units,
            note: self.note.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MovementRecorded {
    pub quantity_ml: i64,
}

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    pub user_id: UserId,
    pub email: Option<String>,
    pub role: Option<&'static str>,
    pub can_operate: bool,
}

impl From<&SessionContext> for WhoAmI {
    fn from(session: &SessionContext) -> Self {
        Self {
            user_id: session.user().id,
            email: session.user().email.clone(),
            role: session.role().map(|r| r.as_str()),
            can_operate: session.can_operate(),
        }
    }
}
