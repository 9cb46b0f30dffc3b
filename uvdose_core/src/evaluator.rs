//! Exposure evaluator.
//!
//! Answers the two questions the system exists for:
//! - What share of my limit do I use if I go out now and stay out until
//!   midnight?
//! - If that is over the limit, from when on is it safe to go out for the
//!   rest of the day?
//!
//! Both build a fresh clipped series and [`DoseProfile`] per call. The
//! current instant is always passed in; callers that need both answers
//! should use [`ExposureEvaluator::assess`] so they share one window.

use crate::dose::DoseProfile;
use crate::med::default_med_table;
use crate::series::{normalize, ClippedSeries};
use crate::{
    Assessment, CoveragePolicy, Error, ExposureReport, ForecastSeries, MedTable, Result,
    SafeStatus, SafeTimeReport, SafetyMargin, SkinClass,
};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

/// Default resolution of the safe-time search
pub const DEFAULT_PRECISION_SECONDS: i64 = 60;

/// Evaluates forecasts against a MED table
#[derive(Clone, Debug)]
pub struct ExposureEvaluator<'a> {
    med: &'a MedTable,
    policy: CoveragePolicy,
    precision: Duration,
}

/// One normalized forecast, its dose profile, and the limit it is judged against
struct Evaluation {
    clipped: ClippedSeries,
    profile: DoseProfile,
    threshold: f64,
}

impl Default for ExposureEvaluator<'static> {
    fn default() -> Self {
        Self::new(default_med_table())
    }
}

impl<'a> ExposureEvaluator<'a> {
    pub fn new(med: &'a MedTable) -> Self {
        Self {
            med,
            policy: CoveragePolicy::default(),
            precision: Duration::seconds(DEFAULT_PRECISION_SECONDS),
        }
    }

    pub fn with_policy(mut self, policy: CoveragePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the safe-time search resolution (at least one second)
    pub fn with_precision(mut self, precision: Duration) -> Result<Self> {
        if precision < Duration::seconds(1) {
            return Err(Error::InvalidPrecision(precision.num_seconds()));
        }
        self.precision = precision;
        Ok(self)
    }

    pub fn precision(&self) -> Duration {
        self.precision
    }

    /// Percent of the limit used by going out at `now` and staying out until midnight
    pub fn percent_exposure_if_outside_now(
        &self,
        forecast: &ForecastSeries,
        skin: SkinClass,
        margin: SafetyMargin,
        now: DateTime<Utc>,
    ) -> Result<ExposureReport> {
        let eval = self.prepare(forecast, skin, margin, now)?;
        Ok(self.exposure_report(&eval, skin, margin))
    }

    /// Earliest instant from which staying out until midnight stays within the limit
    pub fn safe_start_time_for_rest_of_day(
        &self,
        forecast: &ForecastSeries,
        skin: SkinClass,
        margin: SafetyMargin,
        now: DateTime<Utc>,
    ) -> Result<SafeTimeReport> {
        let eval = self.prepare(forecast, skin, margin, now)?;
        Ok(self.safe_time_report(&eval))
    }

    /// Both answers against a single window derived from `now`
    pub fn assess(
        &self,
        forecast: &ForecastSeries,
        skin: SkinClass,
        margin: SafetyMargin,
        now: DateTime<Utc>,
    ) -> Result<Assessment> {
        let eval = self.prepare(forecast, skin, margin, now)?;
        Ok(Assessment {
            exposure: self.exposure_report(&eval, skin, margin),
            safe_time: self.safe_time_report(&eval),
        })
    }

    fn prepare(
        &self,
        forecast: &ForecastSeries,
        skin: SkinClass,
        margin: SafetyMargin,
        now: DateTime<Utc>,
    ) -> Result<Evaluation> {
        let threshold = self.med.med_sed(skin)? * margin.value();
        let clipped = normalize(forecast, now);

        if clipped.is_exhausted() {
            match self.policy {
                CoveragePolicy::AssumeSafe => {
                    tracing::warn!(
                        "Forecast for {} does not cover the rest of the day; assuming zero dose",
                        clipped.zone()
                    );
                }
                CoveragePolicy::Fail => {
                    return Err(Error::InsufficientCoverage {
                        zone: clipped.zone().to_string(),
                    });
                }
            }
        }

        let profile = DoseProfile::new(&clipped);
        tracing::debug!(
            "Evaluating skin class {} with margin {}: threshold {:.3} SED",
            skin,
            margin.value(),
            threshold
        );

        Ok(Evaluation {
            clipped,
            profile,
            threshold,
        })
    }

    fn exposure_report(
        &self,
        eval: &Evaluation,
        skin: SkinClass,
        margin: SafetyMargin,
    ) -> ExposureReport {
        let window = eval.clipped.window();
        let dose = eval.profile.dose_from(window.start);
        let percent = dose / eval.threshold * 100.0;

        tracing::debug!(
            "Dose from {} to {}: {:.3} SED ({:.1}% of limit)",
            window.start,
            window.end,
            dose,
            percent
        );

        ExposureReport {
            zone: eval.clipped.zone().to_string(),
            window_start: window.start.fixed_offset(),
            window_end: window.end.fixed_offset(),
            skin_class: skin,
            margin: margin.value(),
            dose_sed: dose,
            threshold_sed: eval.threshold,
            percent,
            covered: !eval.clipped.is_exhausted(),
        }
    }

    fn safe_time_report(&self, eval: &Evaluation) -> SafeTimeReport {
        let window = eval.clipped.window();
        let (status, safe_time) = match earliest_safe_start(
            &eval.profile,
            eval.threshold,
            window.start,
            window.end,
            self.precision,
        ) {
            None => (SafeStatus::RightNow, window.start),
            Some(at) => (SafeStatus::Later, at),
        };

        tracing::debug!("Safe start: {:?} at {}", status, safe_time);

        SafeTimeReport {
            status,
            safe_time: safe_time.fixed_offset(),
            zone: eval.clipped.zone().to_string(),
            covered: !eval.clipped.is_exhausted(),
        }
    }
}

/// Bisect for the earliest instant whose dose-to-end is within `threshold`
///
/// Returns `None` when `start` itself is already safe. Otherwise keeps
/// `dose_from(lo) > threshold` and `dose_from(hi) <= threshold` (true at
/// `end`, where the dose is zero) and returns `hi` once the bracket is no
/// wider than `precision`. Relies on dose-to-end being non-increasing in
/// time, which holds for non-negative UV index.
fn earliest_safe_start(
    profile: &DoseProfile,
    threshold: f64,
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    precision: Duration,
) -> Option<DateTime<Tz>> {
    if profile.dose_from(start) <= threshold {
        return None;
    }

    let mut lo = start;
    let mut hi = end;
    while hi - lo > precision {
        let mid = lo + (hi - lo) / 2;
        if profile.dose_from(mid) <= threshold {
            hi = mid;
        } else {
            lo = mid;
        }
    }

    Some(hi)
}

/// Percent-of-limit query against the reference MED table
pub fn percent_exposure_if_outside_now(
    forecast: &ForecastSeries,
    skin: SkinClass,
    margin: SafetyMargin,
    now: DateTime<Utc>,
) -> Result<ExposureReport> {
    ExposureEvaluator::default().percent_exposure_if_outside_now(forecast, skin, margin, now)
}

/// Safe-time query against the reference MED table
pub fn safe_start_time_for_rest_of_day(
    forecast: &ForecastSeries,
    skin: SkinClass,
    margin: SafetyMargin,
    precision: Duration,
    now: DateTime<Utc>,
) -> Result<SafeTimeReport> {
    ExposureEvaluator::default()
        .with_precision(precision)?
        .safe_start_time_for_rest_of_day(forecast, skin, margin, now)
}
