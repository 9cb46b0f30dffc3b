#![forbid(unsafe_code)]

//! Core domain model and dose engine for the uvdose system.
//!
//! This crate provides:
//! - Domain types (skin classes, safety margins, reports)
//! - Forecast payload parsing and validation
//! - Exposure window clipping
//! - Erythemal dose integration with precomputed suffix sums
//! - Exposure evaluation (percent of limit, earliest safe start)

pub mod types;
pub mod error;
pub mod med;
pub mod config;
pub mod logging;
pub mod forecast;
pub mod series;
pub mod dose;
pub mod evaluator;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use med::{default_med_table, MedTable};
pub use config::Config;
pub use forecast::{ForecastPayload, ForecastSeries, HourlyBlock};
pub use series::{normalize, ClippedSeries, ExposureWindow};
pub use dose::DoseProfile;
pub use evaluator::{
    percent_exposure_if_outside_now, safe_start_time_for_rest_of_day, ExposureEvaluator,
};
