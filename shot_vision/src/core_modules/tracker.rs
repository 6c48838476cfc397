// THEORY:
// The `tracker` module gives the detector its short-term memory. A hole that has
// just been reported keeps showing up in every following frame (it is still
// darker than the baseline), and a single hole can wobble by a pixel or two from
// frame to frame. Without memory, every frame would report it again.
//
// The `ShotGate` solves that with two cooperating debounce layers; a candidate
// must pass both:
// 1.  **Last accepted shot**: reject when the most recent accepted shot is both
//     younger than `cooldown_ms` and closer than `repeat_dist_px`.
// 2.  **Recent-detection buffer**: reject when *any* buffered shot younger than
//     `retention_ms` lies closer than `min_dist_px`.
//
// Accepted shots enter the buffer immediately, so they gate the remaining
// candidates of the same frame. Entries older than `retention_ms` are pruned
// lazily on insertion. Clearing the gate (reset / new baseline) forgets both
// layers at once.

use crate::core_modules::smart_blob::Point;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Debounce windows and radii.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Time window of the last-accepted-shot layer.
    pub cooldown_ms: u64,
    /// Radius of the last-accepted-shot layer, in frame pixels.
    pub repeat_dist_px: f64,
    /// Radius of the recent-buffer layer, in frame pixels.
    pub min_dist_px: f64,
    /// Lookback of the recent-buffer layer and the pruning horizon.
    pub retention_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 600,
            repeat_dist_px: 18.0,
            min_dist_px: 16.0,
            retention_ms: 3000,
        }
    }
}

/// A shot remembered for debouncing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecentShot {
    pub position: Point,
    pub at: Duration,
}

/// Why a candidate was suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    RepeatOfLastShot,
    NearRecentShot,
}

pub struct ShotGate {
    config: GateConfig,
    recent: VecDeque<RecentShot>,
    last_accepted: Option<RecentShot>,
}

impl ShotGate {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            recent: VecDeque::new(),
            last_accepted: None,
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Checks a candidate without recording it.
    pub fn check(&self, position: Point, now: Duration) -> Result<(), Suppression> {
        let cooldown = Duration::from_millis(self.config.cooldown_ms);
        let retention = Duration::from_millis(self.config.retention_ms);

        if let Some(last) = &self.last_accepted {
            if now.saturating_sub(last.at) < cooldown
                && position.distance_to(&last.position) < self.config.repeat_dist_px
            {
                return Err(Suppression::RepeatOfLastShot);
            }
        }

        let near_recent = self.recent.iter().rev().any(|shot| {
            now.saturating_sub(shot.at) < retention
                && position.distance_to(&shot.position) < self.config.min_dist_px
        });
        if near_recent {
            return Err(Suppression::NearRecentShot);
        }
        Ok(())
    }

    /// Accepts and records the candidate if it passes both layers.
    pub fn admit(&mut self, position: Point, now: Duration) -> Result<(), Suppression> {
        self.check(position, now)?;
        let shot = RecentShot { position, at: now };
        self.recent.push_back(shot);
        self.last_accepted = Some(shot);
        self.prune(now);
        Ok(())
    }

    /// Drops buffered shots older than the retention horizon.
    fn prune(&mut self, now: Duration) {
        let retention = Duration::from_millis(self.config.retention_ms);
        self.recent.retain(|shot| now.saturating_sub(shot.at) <= retention);
    }

    pub fn clear(&mut self) {
        self.recent.clear();
        self.last_accepted = None;
    }

    pub fn recent(&self) -> &VecDeque<RecentShot> {
        &self.recent
    }

    pub fn last_accepted(&self) -> Option<&RecentShot> {
        self.last_accepted.as_ref()
    }
}
