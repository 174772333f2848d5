//! Fixed-point hourly rate type.
//!
//! Catalog prices flow through ordering, identity comparison, and savings
//! math; fixed-point with 4 decimal places keeps those exact where f64
//! would drift.

use derive_more::{Add, AddAssign, From, Into, Sub, SubAssign, Sum};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Scale factor: 4 decimal places.
const RATE_SCALE: i64 = 10_000;

/// Hourly USD rate with 4 decimal places.
///
/// # Examples
/// - `UsdPerHour(30_600)` = $3.06/hr
/// - `UsdPerHour(7_000)` = $0.70/hr
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Add,
    Sub,
    AddAssign,
    SubAssign,
    Sum,
    From,
    Into,
)]
pub struct UsdPerHour(pub i64);

impl UsdPerHour {
    pub const ZERO: UsdPerHour = UsdPerHour(0);

    /// Convert from a dollar amount, rounding to 4 decimal places.
    pub fn from_float(dollars: f64) -> Self {
        UsdPerHour((dollars * RATE_SCALE as f64).round() as i64)
    }

    /// Convert to a dollar amount.
    pub fn to_float(self) -> f64 {
        self.0 as f64 / RATE_SCALE as f64
    }

    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Scale by a float factor (used for simulated market jitter).
    pub fn scaled(self, factor: f64) -> Self {
        UsdPerHour::from_float(self.to_float() * factor)
    }
}

impl fmt::Debug for UsdPerHour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UsdPerHour({:.4})", self.to_float())
    }
}

impl fmt::Display for UsdPerHour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.4}/hr", self.to_float())
    }
}

// Datasets and the API carry prices as plain dollar floats ("3.06").
impl Serialize for UsdPerHour {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_float())
    }
}

impl<'de> Deserialize<'de> for UsdPerHour {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let dollars = f64::deserialize(deserializer)?;
        if !dollars.is_finite() {
            return Err(de::Error::custom("price must be a finite number"));
        }
        Ok(UsdPerHour::from_float(dollars))
    }
}
