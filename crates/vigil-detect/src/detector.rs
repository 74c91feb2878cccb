//! Detector boundary and the built-in detection sources.
//!
//! Real video analysis lives outside this crate. It plugs in by
//! implementing [`Detector`]; the two sources here are a random sampler for
//! demos and a scripted replay for tests and offline review.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use vigil_core::config::DetectionConfig;
use vigil_core::{Category, DetectionEvent, Result};

/// Source of raw detection events.
#[async_trait]
pub trait Detector: Send {
    /// Wait for the next detection. `None` means the source is exhausted.
    async fn next_detection(&mut self) -> Option<DetectionEvent>;

    /// Name used in logs.
    fn name(&self) -> &str;
}

/// Placeholder detector that reports random anomalies.
///
/// Every `interval` it rolls once and, with probability `probability`,
/// emits an event for a uniformly chosen enabled category with a duration
/// uniform in `1..=max_duration_secs`.
#[derive(Debug, Clone)]
pub struct RandomSampler {
    interval: Duration,
    probability: f64,
    max_duration_secs: u32,
    categories: Vec<Category>,
}

impl RandomSampler {
    pub fn new(
        interval: Duration,
        probability: f64,
        max_duration_secs: u32,
        categories: Vec<Category>,
    ) -> Self {
        let probability = if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        };
        Self {
            interval,
            probability,
            max_duration_secs: max_duration_secs.max(1),
            categories,
        }
    }

    /// Unrecognised category codes are kept and reported verbatim.
    pub fn from_config(config: &DetectionConfig) -> Self {
        for category in config.enabled_categories.iter().filter(|c| !c.is_known()) {
            tracing::warn!(
                category = category.code(),
                "Unrecognised category enabled; it will be reported as a raw code"
            );
        }
        Self::new(
            Duration::from_secs(config.interval_secs),
            config.probability,
            config.max_duration_secs,
            config.enabled_categories.clone(),
        )
    }

    /// Whether this sampler can ever produce an event.
    pub fn is_productive(&self) -> bool {
        !self.categories.is_empty() && self.probability > 0.0
    }

    fn roll(&self) -> Option<DetectionEvent> {
        let mut rng = rand::rng();
        if !rng.random_bool(self.probability) {
            return None;
        }
        let category = self.categories[rng.random_range(0..self.categories.len())].clone();
        let duration_secs = rng.random_range(1..=self.max_duration_secs);
        Some(DetectionEvent::new(category, i64::from(duration_secs), Utc::now()))
    }
}

#[async_trait]
impl Detector for RandomSampler {
    async fn next_detection(&mut self) -> Option<DetectionEvent> {
        if !self.is_productive() {
            tracing::info!("Random sampler has nothing enabled; no detections will be produced");
            return None;
        }
        loop {
            tokio::time::sleep(self.interval).await;
            if let Some(event) = self.roll() {
                return Some(event);
            }
        }
    }

    fn name(&self) -> &str {
        "random-sampler"
    }
}

/// Replays a fixed list of detection events in order.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDetector {
    events: VecDeque<DetectionEvent>,
    pacing: Option<Duration>,
}

impl ScriptedDetector {
    pub fn new(events: impl IntoIterator<Item = DetectionEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
            pacing: None,
        }
    }

    /// Parse a JSON array of detection events.
    pub fn from_json(json: &str) -> Result<Self> {
        let events: Vec<DetectionEvent> = serde_json::from_str(json)?;
        Ok(Self::new(events))
    }

    /// Wait `pacing` before yielding each event.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = Some(pacing);
        self
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

#[async_trait]
impl Detector for ScriptedDetector {
    async fn next_detection(&mut self) -> Option<DetectionEvent> {
        if self.events.is_empty() {
            return None;
        }
        if let Some(pacing) = self.pacing {
            tokio::time::sleep(pacing).await;
        }
        self.events.pop_front()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
