pub type TileId = u32;

/// Per-tile-id behavior. Ids without a registered config are non-solid,
/// non-animated and display themselves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileConfig {
    pub solid: bool,
    pub animated: bool,
    pub frames: Vec<TileId>,
    pub frame_duration: f64,
}

impl TileConfig {
    pub fn solid() -> Self {
        Self {
            solid: true,
            ..Self::default()
        }
    }

    pub fn animated(frames: Vec<TileId>, frame_duration: f64) -> Self {
        Self {
            animated: true,
            frames,
            frame_duration,
            ..Self::default()
        }
    }

    pub fn with_solid(mut self, solid: bool) -> Self {
        self.solid = solid;
        self
    }

    /// Why the config cannot animate, if it cannot.
    pub(crate) fn validation_error(&self) -> Option<&'static str> {
        if !self.animated {
            return None;
        }
        if self.frames.is_empty() {
            return Some("animated tile needs at least one frame");
        }
        if !self.frame_duration.is_finite() || self.frame_duration <= 0.0 {
            return Some("animated tile needs a positive, finite frame duration");
        }
        None
    }

    pub fn cycle_duration(&self) -> Option<f64> {
        if !self.animated || self.validation_error().is_some() {
            return None;
        }
        Some(self.frame_duration * self.frames.len() as f64)
    }

    /// Frame shown at `time` seconds: `frames[floor(time / frame_duration) % len]`.
    pub fn frame_at(&self, time: f64) -> Option<TileId> {
        if !self.animated || self.validation_error().is_some() {
            return None;
        }
        let step = (time / self.frame_duration).floor();
        let index = (step as i64).rem_euclid(self.frames.len() as i64) as usize;
        self.frames.get(index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_cycles_every_duration() {
        let config = TileConfig::animated(vec![10, 11], 0.5);
        assert_eq!(config.frame_at(0.0), Some(10));
        assert_eq!(config.frame_at(0.49), Some(10));
        assert_eq!(config.frame_at(0.5), Some(11));
        assert_eq!(config.frame_at(0.99), Some(11));
        assert_eq!(config.frame_at(1.0), Some(10));
        assert_eq!(config.frame_at(1.6), Some(11));
    }

    #[test]
    fn frame_boundaries_hold_for_inexact_durations() {
        for duration in [0.1, 0.2] {
            let config = TileConfig::animated(vec![10, 11, 12], duration);
            assert_eq!(config.frame_at(0.0), Some(10), "duration {duration}");
            assert_eq!(config.frame_at(duration), Some(11), "duration {duration}");
            assert_eq!(config.frame_at(2.0 * duration), Some(12), "duration {duration}");
        }
        let water = TileConfig::animated(vec![4, 5, 6, 7], 0.2);
        assert_eq!(water.frame_at(0.2), Some(5));
        assert_eq!(water.frame_at(0.4), Some(6));
    }

    #[test]
    fn static_configs_have_no_frames() {
        assert_eq!(TileConfig::solid().frame_at(3.0), None);
        assert_eq!(TileConfig::default().cycle_duration(), None);
    }

    #[test]
    fn unplayable_animations_are_reported() {
        assert!(TileConfig::animated(Vec::new(), 0.5)
            .validation_error()
            .is_some());
        assert!(TileConfig::animated(vec![1], 0.0)
            .validation_error()
            .is_some());
        assert!(TileConfig::animated(vec![1], f64::NAN)
            .validation_error()
            .is_some());
        assert!(TileConfig::animated(vec![1, 2], 0.2)
            .with_solid(true)
            .validation_error()
            .is_none());
    }

    #[test]
    fn cycle_is_duration_times_frame_count() {
        let cycle = TileConfig::animated(vec![4, 5, 6, 7], 0.25)
            .cycle_duration()
            .expect("cycle");
        assert!((cycle - 1.0).abs() < 1e-9);
    }
}
