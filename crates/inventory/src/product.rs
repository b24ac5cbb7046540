//! Product coordinates: vintage year, lot and package size.
//!
//! A product row is uniquely identified by the triple (year, lot, size); the
//! movement form resolves that triple to a product id before inserting.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use oilstock_core::DomainError;

/// Vintage (harvest) year.
pub type Vintage = i32;

/// Vintages offered by the movement form.
pub const VINTAGES: [Vintage; 2] = [2024, 2025];

/// Vintage preselected in the movement form.
pub const DEFAULT_VINTAGE: Vintage = 2024;

/// Production lot within a vintage.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Lot {
    #[default]
    A,
    B,
    C,
}

impl Lot {
    pub const ALL: [Lot; 3] = [Lot::A, Lot::B, Lot::C];

    pub fn as_str(&self) -> &'static str {
        match self {
            Lot::A => "A",
            Lot::B => "B",
            Lot::C => "C",
        }
    }
}

impl fmt::Display for Lot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lot {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" => Ok(Lot::A),
            "B" => Ok(Lot::B),
            "C" => Ok(Lot::C),
            other => Err(DomainError::unknown_code("lot", other)),
        }
    }
}

/// Package size, stored by the backend as the enum codes `ml_250`, `ml_500`
/// and `lt_5`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PackageSize {
    #[serde(rename = "ml_250")]
    Ml250,
    #[default]
    #[serde(rename = "ml_500")]
    Ml500,
    #[serde(rename = "lt_5")]
    Lt5,
}

impl PackageSize {
    pub const ALL: [PackageSize; 3] = [PackageSize::Ml250, PackageSize::Ml500, PackageSize::Lt5];

    /// Backend enum code.
    pub fn code(&self) -> &'static str {
        match self {
            PackageSize::Ml250 => "ml_250",
            PackageSize::Ml500 => "ml_500",
            PackageSize::Lt5 => "lt_5",
        }
    }

    /// Human label used in the form.
    pub fn label(&self) -> &'static str {
        match self {
            PackageSize::Ml250 => "250ml",
            PackageSize::Ml500 => "500ml",
            PackageSize::Lt5 => "5LT",
        }
    }

    /// Millilitres held by one unit of this size.
    pub fn ml_per_unit(&self) -> i64 {
        match self {
            PackageSize::Ml250 => 250,
            PackageSize::Ml500 => 500,
            PackageSize::Lt5 => 5000,
        }
    }
}

impl fmt::Display for PackageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for PackageSize {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ml_250" => Ok(PackageSize::Ml250),
            "ml_500" => Ok(PackageSize::Ml500),
            "lt_5" => Ok(PackageSize::Lt5),
            other => Err(DomainError::unknown_code("package size", other)),
        }
    }
}

/// Lookup key for `products` (`year`, `lot`, `size`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductKey {
    pub year: Vintage,
    pub lot: Lot,
    pub size: PackageSize,
}

impl ProductKey {
    pub fn new(year: Vintage, lot: Lot, size: PackageSize) -> Self {
        Self { year, lot, size }
    }
}

impl fmt::Display for ProductKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.year, self.lot, self.size)
    }
}
