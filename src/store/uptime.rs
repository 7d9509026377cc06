//! Uptime roll-up over logged observations.
//!
//! Groups a service's observations into hourly buckets (last 24 hours)
//! and UTC-day buckets (last 30 days). Each bucket counts up and down
//! observations and averages their latency. Empty buckets are omitted.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::monitor::types::{HealthObservation, ServiceId};

const HOUR_SECS: i64 = 3_600;
const DAY_SECS: i64 = 86_400;

/// Window covered by the hourly series.
pub const HOURLY_WINDOW_HOURS: i64 = 24;

/// Window covered by the daily series.
pub const DAILY_WINDOW_DAYS: i64 = 30;

/// One roll-up bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthPoint {
    /// Bucket start.
    pub timestamp: DateTime<Utc>,
    pub up_count: u64,
    pub down_count: u64,
    /// Mean latency in milliseconds.
    pub latency: f64,
}

/// Hourly and daily roll-ups for one service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UptimeHistory {
    pub service_id: ServiceId,
    pub hourly: Vec<HealthPoint>,
    pub daily: Vec<HealthPoint>,
}

impl UptimeHistory {
    /// Overall uptime percentage across the daily series, or `None` when
    /// nothing was observed.
    pub fn uptime_percent(&self) -> Option<f64> {
        let (up, total) = self.daily.iter().fold((0u64, 0u64), |(up, total), p| {
            (up + p.up_count, total + p.up_count + p.down_count)
        });
        if total == 0 {
            None
        } else {
            Some(up as f64 * 100.0 / total as f64)
        }
    }
}

#[derive(Default)]
struct Bucket {
    up: u64,
    down: u64,
    latency_sum: u64,
}

impl Bucket {
    fn add(&mut self, observation: &HealthObservation) {
        if observation.status.is_online() {
            self.up += 1;
        } else {
            self.down += 1;
        }
        self.latency_sum = self.latency_sum.saturating_add(observation.latency_ms);
    }

    fn into_point(self, start_secs: i64) -> Option<HealthPoint> {
        let count = self.up + self.down;
        let timestamp = DateTime::from_timestamp(start_secs, 0)?;
        Some(HealthPoint {
            timestamp,
            up_count: self.up,
            down_count: self.down,
            latency: self.latency_sum as f64 / count as f64,
        })
    }
}

fn roll_up<'a>(
    observations: impl Iterator<Item = &'a HealthObservation>,
    since: DateTime<Utc>,
    now: DateTime<Utc>,
    bucket_secs: i64,
) -> Vec<HealthPoint> {
    let mut buckets: BTreeMap<i64, Bucket> = BTreeMap::new();
    for observation in observations {
        if observation.observed_at < since || observation.observed_at > now {
            continue;
        }
        let secs = observation.observed_at.timestamp();
        let start = secs - secs.rem_euclid(bucket_secs);
        buckets.entry(start).or_default().add(observation);
    }
    buckets
        .into_iter()
        .filter_map(|(start, bucket)| bucket.into_point(start))
        .collect()
}

/// Summarize `observations` of `service_id` as of `now`. Observations
/// belonging to other services are ignored.
pub fn summarize(
    service_id: &ServiceId,
    observations: &[HealthObservation],
    now: DateTime<Utc>,
) -> UptimeHistory {
    let own = || observations.iter().filter(|o| &o.service_id == service_id);

    let hourly_since = now - Duration::hours(HOURLY_WINDOW_HOURS);
    let daily_since = now - Duration::days(DAILY_WINDOW_DAYS);

    UptimeHistory {
        service_id: service_id.clone(),
        hourly: roll_up(own(), hourly_since, now, HOUR_SECS),
        daily: roll_up(own(), daily_since, now, DAY_SECS),
    }
}
