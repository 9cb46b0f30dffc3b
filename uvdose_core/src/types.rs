//! Core domain types for the uvdose system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Skin sensitivity classes and safety margins
//! - Forecast samples
//! - Coverage policy for forecasts that do not reach the end of the day
//! - Exposure and safe-time reports

use crate::{Error, Result};
use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Skin Sensitivity
// ============================================================================

/// Skin sensitivity class (Fitzpatrick-type analogue)
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SkinClass {
    I,
    II,
    III,
    IV,
    V,
    VI,
}

impl SkinClass {
    /// All classes, lightest to darkest
    pub const ALL: [SkinClass; 6] = [
        SkinClass::I,
        SkinClass::II,
        SkinClass::III,
        SkinClass::IV,
        SkinClass::V,
        SkinClass::VI,
    ];

    /// Roman-numeral label
    pub fn as_str(&self) -> &'static str {
        match self {
            SkinClass::I => "I",
            SkinClass::II => "II",
            SkinClass::III => "III",
            SkinClass::IV => "IV",
            SkinClass::V => "V",
            SkinClass::VI => "VI",
        }
    }
}

impl fmt::Display for SkinClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts roman numerals ("III") or digits ("3"), case-insensitive
impl FromStr for SkinClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "I" | "1" => Ok(SkinClass::I),
            "II" | "2" => Ok(SkinClass::II),
            "III" | "3" => Ok(SkinClass::III),
            "IV" | "4" => Ok(SkinClass::IV),
            "V" | "5" => Ok(SkinClass::V),
            "VI" | "6" => Ok(SkinClass::VI),
            _ => Err(Error::UnknownSkinClass(s.to_string())),
        }
    }
}

impl TryFrom<String> for SkinClass {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<SkinClass> for String {
    fn from(class: SkinClass) -> Self {
        class.as_str().to_string()
    }
}

// ============================================================================
// Safety Margin
// ============================================================================

/// Fraction of the MED treated as the operative limit, in (0, 1]
///
/// 1.0 means 100% corresponds to the full MED; 0.75 builds in a 25% buffer.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SafetyMargin(f64);

impl SafetyMargin {
    pub const FULL: SafetyMargin = SafetyMargin(1.0);

    pub fn new(fraction: f64) -> Result<Self> {
        if fraction.is_finite() && fraction > 0.0 && fraction <= 1.0 {
            Ok(Self(fraction))
        } else {
            Err(Error::InvalidMargin(fraction))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for SafetyMargin {
    fn default() -> Self {
        Self::FULL
    }
}

impl TryFrom<f64> for SafetyMargin {
    type Error = Error;

    fn try_from(fraction: f64) -> Result<Self> {
        Self::new(fraction)
    }
}

impl From<SafetyMargin> for f64 {
    fn from(margin: SafetyMargin) -> Self {
        margin.0
    }
}

// ============================================================================
// Forecast Samples
// ============================================================================

/// One forecast point: an instant in the forecast's zone and its UV index
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub at: DateTime<Tz>,
    pub uv_index: f64,
}

impl Sample {
    pub fn new(at: DateTime<Tz>, uv_index: f64) -> Self {
        Self { at, uv_index }
    }
}

/// What to do when the forecast has no usable samples for the rest of the day
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoveragePolicy {
    /// Treat the missing coverage as zero dose (nothing proves it unsafe)
    #[default]
    AssumeSafe,
    /// Fail with `Error::InsufficientCoverage`
    Fail,
}

// ============================================================================
// Reports
// ============================================================================

/// Answer to "what share of my limit do I use if I go out now until midnight?"
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExposureReport {
    pub zone: String,
    pub window_start: DateTime<FixedOffset>,
    pub window_end: DateTime<FixedOffset>,
    pub skin_class: SkinClass,
    pub margin: f64,
    pub dose_sed: f64,
    pub threshold_sed: f64,
    /// Unclamped; above 100 means the limit is exceeded
    pub percent: f64,
    /// False when the forecast did not cover the window and safety was assumed
    pub covered: bool,
}

impl ExposureReport {
    pub fn exceeds_limit(&self) -> bool {
        self.dose_sed > self.threshold_sed
    }
}

/// Whether going out now is already safe for the rest of the day
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafeStatus {
    RightNow,
    Later,
}

/// Earliest instant from which staying outside until midnight stays under the limit
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SafeTimeReport {
    pub status: SafeStatus,
    pub safe_time: DateTime<FixedOffset>,
    pub zone: String,
    pub covered: bool,
}

/// Both answers computed against one exposure window
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub exposure: ExposureReport,
    pub safe_time: SafeTimeReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skin_class_parsing() {
        assert_eq!("III".parse::<SkinClass>().unwrap(), SkinClass::III);
        assert_eq!("vi".parse::<SkinClass>().unwrap(), SkinClass::VI);
        assert_eq!("2".parse::<SkinClass>().unwrap(), SkinClass::II);
        assert!(matches!(
            "VII".parse::<SkinClass>(),
            Err(Error::UnknownSkinClass(s)) if s == "VII"
        ));
    }

    #[test]
    fn test_skin_class_serde() {
        let json = serde_json::to_string(&SkinClass::IV).unwrap();
        assert_eq!(json, "\"IV\"");
        let parsed: SkinClass = serde_json::from_str("\"4\"").unwrap();
        assert_eq!(parsed, SkinClass::IV);
        assert!(serde_json::from_str::<SkinClass>("\"X\"").is_err());
    }

    #[test]
    fn test_margin_bounds() {
        assert!(SafetyMargin::new(1.0).is_ok());
        assert!(SafetyMargin::new(0.2).is_ok());
        assert!(matches!(SafetyMargin::new(0.0), Err(Error::InvalidMargin(_))));
        assert!(matches!(SafetyMargin::new(1.5), Err(Error::InvalidMargin(_))));
        assert!(matches!(
            SafetyMargin::new(f64::NAN),
            Err(Error::InvalidMargin(_))
        ));
        assert_eq!(SafetyMargin::default().value(), 1.0);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&SafeStatus::RightNow).unwrap(),
            "\"right_now\""
        );
        assert_eq!(
            serde_json::to_string(&SafeStatus::Later).unwrap(),
            "\"later\""
        );
    }
}
