// Keeps a cosmetic's flipbook texture in phase with other viewers' copies
//
// Every time another viewer's copy restarts its cycle we note how far our own
// cycle is from a boundary, then nudge our clock toward that offset a little
// each tick.

use std::collections::VecDeque;

use super::model::TextureAnimation;
use crate::core::math::{approx_equal, wrap};

/// Phase synchronizer tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseSyncConfig {
    /// Rolling window of remembered phase samples
    pub max_samples: usize,
    /// Largest correction applied at once (seconds)
    pub max_step: f32,
    /// Minimum lifetime between two corrections (seconds)
    pub adjust_interval: f32,
}

pub const DEFAULT_PHASE_SYNC_CONFIG: PhaseSyncConfig = PhaseSyncConfig {
    max_samples: 3,
    max_step: 0.01,
    adjust_interval: 0.05,
};

impl Default for PhaseSyncConfig {
    fn default() -> Self {
        DEFAULT_PHASE_SYNC_CONFIG
    }
}

/// Slack when comparing lifetimes against the adjust interval
const INTERVAL_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone)]
pub struct TexturePhaseSync {
    animation: TextureAnimation,
    config: PhaseSyncConfig,
    samples: VecDeque<f32>,
    offset: f32,
    last_adjusted: Option<f32>,
}

impl TexturePhaseSync {
    pub fn new(animation: TextureAnimation) -> Self {
        Self::with_config(animation, PhaseSyncConfig::default())
    }

    pub fn with_config(animation: TextureAnimation, config: PhaseSyncConfig) -> Self {
        Self {
            animation,
            config,
            samples: VecDeque::with_capacity(config.max_samples + 1),
            offset: 0.0,
            last_adjusted: None,
        }
    }

    /// Note that some viewer's copy restarted at `lifetime`
    ///
    /// Stores the seconds left until our own next cycle boundary.
    pub fn record_cycle_start(&mut self, lifetime: f32) {
        let cycle = self.animation.cycle_length();
        if cycle <= 0.0 {
            return;
        }

        let remaining = wrap(cycle - wrap(lifetime, cycle), cycle);
        self.samples.push_back(remaining);
        while self.samples.len() > self.config.max_samples.max(1) {
            self.samples.pop_front();
        }
    }

    /// Lifetime with the accumulated phase correction applied
    pub fn adjust(&mut self, lifetime: f32) -> f32 {
        let cycle = self.animation.cycle_length();
        let Some(target) = self.target_offset() else {
            return lifetime + self.offset;
        };
        if cycle <= 0.0 {
            return lifetime + self.offset;
        }

        if let Some(last) = self.last_adjusted {
            let elapsed = lifetime - last;
            if elapsed < self.config.adjust_interval
                && !approx_equal(elapsed, self.config.adjust_interval, INTERVAL_EPSILON)
            {
                return lifetime + self.offset;
            }
        }

        // Drift forward to the target, or wrap back a full cycle: whichever is shorter
        let forward = wrap(target - self.offset, cycle);
        let backward = forward - cycle;
        let correction = if forward <= -backward { forward } else { backward };

        self.offset += correction.clamp(-self.config.max_step, self.config.max_step);
        self.last_adjusted = Some(lifetime);

        lifetime + self.offset
    }

    /// Mean of the recorded samples
    pub fn target_offset(&self) -> Option<f32> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f32>() / self.samples.len() as f32)
    }

    /// Phase distance between the accumulated offset and the target
    pub fn phase_error(&self) -> Option<f32> {
        let cycle = self.animation.cycle_length();
        let target = self.target_offset()?;
        let forward = wrap(target - self.offset, cycle);
        Some(forward.min(cycle - forward))
    }

    /// Flipbook frame to show at an already adjusted lifetime
    pub fn frame_at(&self, adjusted_lifetime: f32) -> u32 {
        let frames = self.animation.frame_count;
        if frames == 0 {
            return 0;
        }
        let cycle = self.animation.cycle_length();
        let frame = (wrap(adjusted_lifetime, cycle) * self.animation.fps) as u32;
        frame.min(frames - 1)
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn one_second_cycle() -> TexturePhaseSync {
        TexturePhaseSync::new(TextureAnimation {
            frame_count: 20,
            fps: 20.0,
        })
    }

    #[test]
    fn test_passthrough_without_samples() {
        let mut sync = one_second_cycle();
        assert_eq!(sync.adjust(3.25), 3.25);
        assert_eq!(sync.offset(), 0.0);
    }

    #[test]
    fn test_record_measures_time_to_boundary() {
        let mut sync = one_second_cycle();
        sync.record_cycle_start(0.75);
        assert_abs_diff_eq!(sync.target_offset().unwrap(), 0.25, epsilon = 1e-5);
    }

    #[test]
    fn test_window_keeps_three_samples() {
        let mut sync = one_second_cycle();
        for lifetime in [0.9, 0.8, 0.7, 0.6] {
            sync.record_cycle_start(lifetime);
        }
        assert_eq!(sync.sample_count(), 3);
        // 0.1 was evicted: mean of 0.2, 0.3, 0.4
        assert_abs_diff_eq!(sync.target_offset().unwrap(), 0.3, epsilon = 1e-5);
    }

    #[test]
    fn test_converges_monotonically() {
        let mut sync = one_second_cycle();
        for lifetime in [0.7, 1.7, 2.7] {
            sync.record_cycle_start(lifetime);
        }
        let target = sync.target_offset().unwrap();

        let mut previous_distance = (target - sync.offset()).abs();
        let mut previous_offset = sync.offset();
        for tick in 1..=60 {
            sync.adjust(3.0 + tick as f32 * 0.1);

            let step = (sync.offset() - previous_offset).abs();
            assert!(step <= 0.01 + 1e-6, "step {step} at tick {tick}");

            let distance = (target - sync.offset()).abs();
            assert!(distance <= previous_distance + 1e-6);
            previous_distance = distance;
            previous_offset = sync.offset();
        }
        assert_abs_diff_eq!(sync.offset(), target, epsilon = 1e-3);
    }

    #[test]
    fn test_picks_shorter_direction() {
        let mut sync = one_second_cycle();
        // 0.9 s to our next boundary: going back 0.1 s is shorter
        sync.record_cycle_start(0.1);
        sync.adjust(1.0);

        assert!(sync.offset() < 0.0);
        assert_abs_diff_eq!(sync.offset(), -0.01, epsilon = 1e-6);
    }

    #[test]
    fn test_adjusts_once_per_interval() {
        let mut sync = one_second_cycle();
        sync.record_cycle_start(0.5);

        sync.adjust(1.0);
        sync.adjust(1.02);
        sync.adjust(1.04);
        assert_abs_diff_eq!(sync.offset(), 0.01, epsilon = 1e-6);

        sync.adjust(1.05);
        assert_abs_diff_eq!(sync.offset(), 0.02, epsilon = 1e-6);
    }

    #[test]
    fn test_adjusted_lifetime_includes_offset() {
        let mut sync = one_second_cycle();
        sync.record_cycle_start(0.5);
        let adjusted = sync.adjust(2.0);
        assert_abs_diff_eq!(adjusted, 2.01, epsilon = 1e-6);
    }

    #[test]
    fn test_frame_at() {
        let sync = one_second_cycle();
        assert_eq!(sync.frame_at(0.0), 0);
        assert_eq!(sync.frame_at(0.52), 10);
        assert_eq!(sync.frame_at(1.52), 10);
    }

    #[test]
    fn test_phase_error_shrinks() {
        let mut sync = one_second_cycle();
        sync.record_cycle_start(0.8);
        let before = sync.phase_error().unwrap();
        sync.adjust(1.0);
        assert!(sync.phase_error().unwrap() < before);
    }
}
