//! Exposure window and series clipping.
//!
//! The window runs from `now` to the next local midnight in the forecast's
//! zone. The forecast is cut down to the samples that bracket that window,
//! with a synthetic sample placed exactly on the window end.

use crate::{ForecastSeries, Sample};
use chrono::{DateTime, Days, Duration, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Longest DST gap we walk across when resolving a wall-clock time
const MAX_GAP_MINUTES: i64 = 3 * 60;

/// Resolve a wall-clock time in `zone` to an instant
///
/// Ambiguous times (fall back) resolve to the earlier instant. Times inside a
/// spring-forward gap resolve to the first wall-clock minute after the gap.
pub(crate) fn resolve_local(zone: Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => (1..=MAX_GAP_MINUTES)
            .find_map(|m| zone.from_local_datetime(&(naive + Duration::minutes(m))).earliest()),
    }
}

/// Half-open interval `[start, end)` from now until the next local midnight
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExposureWindow {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl ExposureWindow {
    /// Window from `now` to the start of the following calendar day in `zone`
    pub fn rest_of_day(zone: Tz, now: DateTime<Utc>) -> Self {
        let start = now.with_timezone(&zone);
        let end = start
            .date_naive()
            .checked_add_days(Days::new(1))
            .and_then(|day| day.and_hms_opt(0, 0, 0))
            .and_then(|midnight| resolve_local(zone, midnight))
            .unwrap_or_else(|| start + Duration::days(1));

        Self { start, end }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Forecast samples restricted to an exposure window
///
/// Either empty (exhausted) or at least two samples whose last instant is
/// exactly `window.end`.
#[derive(Clone, Debug)]
pub struct ClippedSeries {
    zone: Tz,
    window: ExposureWindow,
    samples: Vec<Sample>,
}

impl ClippedSeries {
    fn exhausted(zone: Tz, window: ExposureWindow) -> Self {
        Self {
            zone,
            window,
            samples: Vec::new(),
        }
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    pub fn window(&self) -> ExposureWindow {
        self.window
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// True when the forecast has no usable coverage for the window
    pub fn is_exhausted(&self) -> bool {
        self.samples.len() < 2
    }
}

/// Clip a forecast to the window `[now, next local midnight)`
///
/// Keeps the sample just before `now` so the segment containing `now` is
/// intact. A forecast that stops before midnight is closed with a zero-UV
/// sample at midnight; one that runs past it gets a sample at midnight
/// interpolated from the two samples around it.
pub fn normalize(series: &ForecastSeries, now: DateTime<Utc>) -> ClippedSeries {
    let zone = series.zone();
    let window = ExposureWindow::rest_of_day(zone, now);
    let samples = series.samples();

    let first_current = samples.partition_point(|s| s.at < window.start);
    let first_past_end = samples.partition_point(|s| s.at < window.end);

    if first_current == samples.len() || first_past_end == 0 {
        tracing::debug!(
            "Forecast for {} ({} .. {}) does not cover window {} .. {}",
            zone,
            samples[0].at,
            samples[samples.len() - 1].at,
            window.start,
            window.end
        );
        return ClippedSeries::exhausted(zone, window);
    }

    let lo = first_current.saturating_sub(1);
    let hi = first_past_end.min(samples.len() - 1);
    let mut clipped = samples[lo..=hi].to_vec();

    let last = clipped[clipped.len() - 1];
    if last.at < window.end {
        clipped.push(Sample::new(window.end, 0.0));
    } else if last.at > window.end {
        // samples[hi - 1] is the last sample before the window end
        let before = samples[hi - 1];
        let uv_index = interpolate_uv(&before, &last, window.end);
        if let Some(tail) = clipped.last_mut() {
            *tail = Sample::new(window.end, uv_index);
        }
    }

    if clipped.len() < 2 {
        return ClippedSeries::exhausted(zone, window);
    }

    tracing::debug!(
        "Clipped forecast to {} samples for window {} .. {}",
        clipped.len(),
        window.start,
        window.end
    );

    ClippedSeries {
        zone,
        window,
        samples: clipped,
    }
}

/// Seconds from `from` to `to` (negative if `to` is earlier)
pub(crate) fn seconds_between(from: DateTime<Tz>, to: DateTime<Tz>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

/// Linearly interpolated UV index at `t` on the segment `a`..`b`
pub(crate) fn interpolate_uv(a: &Sample, b: &Sample, t: DateTime<Tz>) -> f64 {
    let span = seconds_between(a.at, b.at);
    if span <= 0.0 {
        return b.uv_index;
    }
    let fraction = seconds_between(a.at, t) / span;
    a.uv_index + (b.uv_index - a.uv_index) * fraction
}
