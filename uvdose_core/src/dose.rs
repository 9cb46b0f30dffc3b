//! Erythemal dose model.
//!
//! UV index is converted to erythemal irradiance (1 UV index unit =
//! 0.025 W/m²) and the irradiance is treated as piecewise linear between
//! forecast samples, so each segment contributes a trapezoid.
//!
//! ## Query strategy
//!
//! [`DoseProfile`] integrates every segment once and keeps right-to-left
//! running sums, so `remaining[i]` is the dose from sample `i` to the window
//! end. A query for an arbitrary instant binary-searches its segment,
//! integrates the partial segment, and adds the suffix sum: O(log n).
//!
//! The straightforward alternative is to re-integrate every segment that
//! overlaps `[t, end]` on each query. It gives the same numbers but costs
//! O(n) per query, which adds up inside the safe-time bisection.

use crate::series::{interpolate_uv, seconds_between, ClippedSeries};
use crate::Sample;
use chrono::DateTime;
use chrono_tz::Tz;

/// Erythemal irradiance in W/m² per UV index unit
pub const IRRADIANCE_PER_UV_INDEX: f64 = 0.025;

/// One standard erythema dose (SED) in J/m²
pub const JOULES_PER_SED: f64 = 100.0;

/// Erythemal irradiance (W/m²) for a UV index value
pub fn uv_index_to_irradiance(uv_index: f64) -> f64 {
    uv_index * IRRADIANCE_PER_UV_INDEX
}

/// Dose in SED for a segment whose UV index goes linearly from `u0` to `u1`
pub fn segment_dose_sed(u0: f64, u1: f64, seconds: f64) -> f64 {
    let mean_irradiance = (uv_index_to_irradiance(u0) + uv_index_to_irradiance(u1)) / 2.0;
    mean_irradiance * seconds / JOULES_PER_SED
}

/// Precomputed dose-to-end lookup for one clipped series
#[derive(Clone, Debug)]
pub struct DoseProfile {
    samples: Vec<Sample>,
    /// `remaining[i]` = dose in SED from `samples[i]` to the window end
    remaining: Vec<f64>,
    end: DateTime<Tz>,
}

impl DoseProfile {
    pub fn new(series: &ClippedSeries) -> Self {
        let end = series.window().end;
        if series.is_exhausted() {
            return Self {
                samples: Vec::new(),
                remaining: Vec::new(),
                end,
            };
        }

        let samples = series.samples().to_vec();
        let mut remaining = vec![0.0; samples.len()];
        for i in (0..samples.len() - 1).rev() {
            let (a, b) = (&samples[i], &samples[i + 1]);
            let dose = segment_dose_sed(a.uv_index, b.uv_index, seconds_between(a.at, b.at));
            remaining[i] = remaining[i + 1] + dose;
        }

        Self {
            samples,
            remaining,
            end,
        }
    }

    /// Dose in SED accumulated from `t` until the window end
    ///
    /// Zero at or after the end. Before the first sample the full suffix is
    /// returned, since nothing is known about earlier irradiance.
    pub fn dose_from(&self, t: DateTime<Tz>) -> f64 {
        if self.samples.is_empty() || t >= self.end {
            return 0.0;
        }

        // First sample strictly after t
        let next = self.samples.partition_point(|s| s.at <= t);
        if next == 0 {
            return self.remaining[0];
        }
        if next == self.samples.len() {
            return 0.0;
        }

        let (a, b) = (&self.samples[next - 1], &self.samples[next]);
        let uv_start = interpolate_uv(a, b, t);
        segment_dose_sed(uv_start, b.uv_index, seconds_between(t, b.at)) + self.remaining[next]
    }

    /// Dose over the whole clipped series
    pub fn total(&self) -> f64 {
        self.remaining.first().copied().unwrap_or(0.0)
    }

    /// True when built from an exhausted series
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn end(&self) -> DateTime<Tz> {
        self.end
    }
}
