//! Forecast payload loading and validation.
//!
//! The payload mirrors the hourly UV response of a forecast provider
//! (Open-Meteo with `hourly=uv_index&timezone=auto`): an optional IANA zone
//! name plus parallel `hourly.time` / `hourly.uv_index` arrays. Timestamps
//! are local wall-clock times in that zone.

use crate::series::resolve_local;
use crate::{Error, Result, Sample};
use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// Formats accepted for offset-less local timestamps
const LOCAL_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Raw forecast payload as delivered by the provider
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ForecastPayload {
    #[serde(default)]
    pub timezone: Option<String>,

    #[serde(default)]
    pub hourly: Option<HourlyBlock>,
}

/// Parallel hourly arrays
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HourlyBlock {
    #[serde(default)]
    pub time: Option<Vec<String>>,

    /// `null` entries are hours the provider has no value for
    #[serde(default)]
    pub uv_index: Option<Vec<Option<f64>>>,
}

impl ForecastPayload {
    /// Parse a payload from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a payload from any reader (e.g. stdin)
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Load a payload from a JSON file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let payload = Self::from_json_str(&contents)?;
        tracing::info!("Loaded forecast payload from {:?}", path);
        Ok(payload)
    }
}

/// Validated, zone-anchored UV-index series
///
/// Invariants: at least two samples, strictly increasing instants, finite
/// non-negative UV values.
#[derive(Clone, Debug)]
pub struct ForecastSeries {
    zone: Tz,
    samples: Vec<Sample>,
}

impl ForecastSeries {
    /// Build a series from already-resolved samples
    pub fn new(zone: Tz, samples: Vec<Sample>) -> Result<Self> {
        if samples.len() < 2 {
            return Err(Error::InvalidForecastData(format!(
                "need at least 2 samples, got {}",
                samples.len()
            )));
        }

        for (i, sample) in samples.iter().enumerate() {
            if !(sample.uv_index.is_finite() && sample.uv_index >= 0.0) {
                return Err(Error::InvalidForecastData(format!(
                    "uv_index[{}] must be a non-negative number, got {}",
                    i, sample.uv_index
                )));
            }
        }

        if let Some(i) = samples.windows(2).position(|w| w[1].at <= w[0].at) {
            return Err(Error::InvalidForecastData(format!(
                "time[{}] ({}) is not after time[{}] ({})",
                i + 1,
                samples[i + 1].at,
                i,
                samples[i].at
            )));
        }

        Ok(Self { zone, samples })
    }

    /// Validate a raw payload and resolve its timestamps in the payload's zone
    pub fn from_payload(payload: &ForecastPayload) -> Result<Self> {
        let zone = parse_zone(payload.timezone.as_deref())?;

        let hourly = payload.hourly.as_ref();
        let times = hourly.and_then(|h| h.time.as_ref());
        let values = hourly.and_then(|h| h.uv_index.as_ref());

        let (times, values) = match (times, values) {
            (Some(times), Some(values)) if times.len() >= 2 && times.len() == values.len() => {
                (times, values)
            }
            _ => {
                return Err(Error::InvalidForecastData(
                    "hourly.time and hourly.uv_index must exist and have same length >= 2"
                        .into(),
                ))
            }
        };

        let mut samples: Vec<Sample> = Vec::with_capacity(times.len());
        let mut last_in_gap = false;
        for (i, (raw, value)) in times.iter().zip(values).enumerate() {
            let (at, in_gap) = parse_timestamp(raw, zone).ok_or_else(|| {
                Error::InvalidForecastData(format!("time[{}] is not a valid timestamp: {}", i, raw))
            })?;
            let sample = Sample::new(at, value.unwrap_or(0.0));

            // A wall time skipped by spring-forward lands on the first instant
            // after the gap, which the next listed hour may also name.
            if last_in_gap && samples.last().map(|s| s.at) == Some(at) {
                tracing::debug!(
                    "time[{}] ({}) falls in a DST gap and collides with time[{}], dropping it",
                    i - 1,
                    times[i - 1],
                    i
                );
                samples.pop();
            }
            samples.push(sample);
            last_in_gap = in_gap;
        }

        let nulls = values.iter().filter(|v| v.is_none()).count();
        if nulls > 0 {
            tracing::debug!("Forecast has {} null uv_index entries, reading them as 0", nulls);
        }

        Self::new(zone, samples)
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when the series has no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl TryFrom<&ForecastPayload> for ForecastSeries {
    type Error = Error;

    fn try_from(payload: &ForecastPayload) -> Result<Self> {
        Self::from_payload(payload)
    }
}

/// Parse an IANA zone name, defaulting to UTC when absent
fn parse_zone(name: Option<&str>) -> Result<Tz> {
    match name.map(str::trim) {
        None | Some("") => Ok(Tz::UTC),
        Some(name) => name
            .parse::<Tz>()
            .map_err(|_| Error::InvalidForecastData(format!("unknown timezone: {}", name))),
    }
}

/// Parse a timestamp as local wall time in `zone`, or as RFC 3339 with offset
///
/// The flag is true when the wall time does not exist in `zone` and was
/// moved past the DST gap.
fn parse_timestamp(raw: &str, zone: Tz) -> Option<(DateTime<Tz>, bool)> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some((instant.with_timezone(&zone), false));
    }

    let naive = LOCAL_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())?;
    let in_gap = matches!(zone.from_local_datetime(&naive), LocalResult::None);
    resolve_local(zone, naive).map(|at| (at, in_gap))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn payload(zone: Option<&str>, times: &[&str], values: &[Option<f64>]) -> ForecastPayload {
        ForecastPayload {
            timezone: zone.map(String::from),
            hourly: Some(HourlyBlock {
                time: Some(times.iter().map(|t| t.to_string()).collect()),
                uv_index: Some(values.to_vec()),
            }),
        }
    }

    #[test]
    fn test_parses_open_meteo_shape() {
        let json = r#"{
            "latitude": 13.75,
            "longitude": 100.5,
            "timezone": "Asia/Bangkok",
            "hourly_units": {"time": "iso8601", "uv_index": ""},
            "hourly": {
                "time": ["2024-06-01T10:00", "2024-06-01T11:00", "2024-06-01T12:00"],
                "uv_index": [5.2, 8.1, null]
            }
        }"#;

        let payload = ForecastPayload::from_json_str(json).unwrap();
        let series = ForecastSeries::from_payload(&payload).unwrap();

        assert_eq!(series.zone(), chrono_tz::Asia::Bangkok);
        assert_eq!(series.len(), 3);
        assert_eq!(series.samples()[0].at.hour(), 10);
        assert_eq!(series.samples()[2].uv_index, 0.0);
        assert_eq!(
            series.samples()[0].at,
            chrono_tz::Asia::Bangkok
                .with_ymd_and_hms(2024, 6, 1, 10, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_missing_zone_defaults_to_utc() {
        let p = payload(None, &["2024-06-01T10:00", "2024-06-01T11:00"], &[Some(1.0), Some(2.0)]);
        let series = ForecastSeries::from_payload(&p).unwrap();
        assert_eq!(series.zone(), Tz::UTC);
    }

    #[test]
    fn test_rejects_short_series() {
        let p = payload(Some("UTC"), &["2024-06-01T10:00"], &[Some(1.0)]);
        assert!(matches!(
            ForecastSeries::from_payload(&p),
            Err(Error::InvalidForecastData(_))
        ));
    }

    #[test]
    fn test_rejects_mismatched_lengths() {
        let p = payload(
            Some("UTC"),
            &["2024-06-01T10:00", "2024-06-01T11:00", "2024-06-01T12:00"],
            &[Some(1.0), Some(2.0)],
        );
        assert!(matches!(
            ForecastSeries::from_payload(&p),
            Err(Error::InvalidForecastData(_))
        ));
    }

    #[test]
    fn test_rejects_missing_hourly() {
        let p = ForecastPayload::from_json_str(r#"{"timezone": "UTC"}"#).unwrap();
        assert!(matches!(
            ForecastSeries::from_payload(&p),
            Err(Error::InvalidForecastData(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_zone() {
        let p = payload(
            Some("Mars/Olympus_Mons"),
            &["2024-06-01T10:00", "2024-06-01T11:00"],
            &[Some(1.0), Some(2.0)],
        );
        let err = ForecastSeries::from_payload(&p).unwrap_err();
        assert!(err.to_string().contains("Mars/Olympus_Mons"));
    }

    #[test]
    fn test_rejects_bad_timestamp() {
        let p = payload(Some("UTC"), &["2024-06-01T10:00", "noon"], &[Some(1.0), Some(2.0)]);
        let err = ForecastSeries::from_payload(&p).unwrap_err();
        assert!(err.to_string().contains("time[1]"));
    }

    #[test]
    fn test_rejects_negative_uv() {
        let p = payload(
            Some("UTC"),
            &["2024-06-01T10:00", "2024-06-01T11:00"],
            &[Some(1.0), Some(-0.5)],
        );
        assert!(matches!(
            ForecastSeries::from_payload(&p),
            Err(Error::InvalidForecastData(_))
        ));
    }

    #[test]
    fn test_rejects_non_increasing_times() {
        let p = payload(
            Some("UTC"),
            &["2024-06-01T11:00", "2024-06-01T10:00"],
            &[Some(1.0), Some(2.0)],
        );
        assert!(matches!(
            ForecastSeries::from_payload(&p),
            Err(Error::InvalidForecastData(_))
        ));
    }

    #[test]
    fn test_accepts_offset_timestamps() {
        let p = payload(
            Some("Europe/Stockholm"),
            &["2024-06-01T08:00:00Z", "2024-06-01T11:00:00+02:00"],
            &[Some(1.0), Some(2.0)],
        );
        let series = ForecastSeries::from_payload(&p).unwrap();
        // 08:00Z is 10:00 CEST
        assert_eq!(series.samples()[0].at.hour(), 10);
        assert_eq!(series.samples()[1].at.hour(), 11);
    }

    #[test]
    fn test_spring_forward_gap_resolves_after_gap() {
        // 02:00 does not exist in Stockholm on 2024-03-31
        let p = payload(
            Some("Europe/Stockholm"),
            &["2024-03-31T01:00", "2024-03-31T02:00", "2024-03-31T04:00"],
            &[Some(0.0), Some(0.0), Some(1.0)],
        );
        let series = ForecastSeries::from_payload(&p).unwrap();
        assert_eq!(series.samples()[1].at.hour(), 3);
    }

    #[test]
    fn test_full_local_grid_across_spring_forward() {
        let times = [
            "2024-03-31T00:00",
            "2024-03-31T01:00",
            "2024-03-31T02:00",
            "2024-03-31T03:00",
            "2024-03-31T04:00",
            "2024-03-31T05:00",
        ];
        let values = [Some(0.0), Some(0.0), Some(0.5), Some(0.7), Some(1.0), Some(1.5)];
        let p = payload(Some("Europe/Stockholm"), &times, &values);

        let series = ForecastSeries::from_payload(&p).unwrap();
        let zone = chrono_tz::Europe::Stockholm;
        let hours: Vec<u32> = series.samples().iter().map(|s| s.at.hour()).collect();
        assert_eq!(hours, vec![0, 1, 3, 4, 5]);
        // The listed 03:00 value wins over the skipped 02:00
        assert_eq!(series.samples()[2].uv_index, 0.7);
        assert_eq!(
            series.samples()[2].at,
            zone.with_ymd_and_hms(2024, 3, 31, 3, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_repeated_wall_time_is_still_rejected() {
        let p = payload(
            Some("Europe/Stockholm"),
            &["2024-06-01T10:00", "2024-06-01T10:00"],
            &[Some(1.0), Some(2.0)],
        );
        assert!(matches!(
            ForecastSeries::from_payload(&p),
            Err(Error::InvalidForecastData(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forecast.json");
        std::fs::write(
            &path,
            r#"{"timezone":"UTC","hourly":{"time":["2024-06-01T10:00","2024-06-01T11:00"],"uv_index":[1,2]}}"#,
        )
        .unwrap();

        let payload = ForecastPayload::load_from(&path).unwrap();
        let series = ForecastSeries::try_from(&payload).unwrap();
        assert_eq!(series.len(), 2);
        assert!(!series.is_empty());
    }
}
