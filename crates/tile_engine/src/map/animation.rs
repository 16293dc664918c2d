use std::collections::HashMap;

use tracing::debug;

use super::tile_config::{TileConfig, TileId};

const CYCLE_MATCH_EPSILON: f64 = 1e-9;

/// Shared animation time for every layer of a map.
///
/// The clock wraps only when all animated configs agree on one cycle length;
/// wrapping by that length never changes a displayed frame. With mixed cycle
/// lengths it keeps accumulating in f64.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationClock {
    time: f64,
    wrap_cycle: Option<f64>,
}

impl AnimationClock {
    pub fn time(&self) -> f64 {
        self.time
    }

    pub(crate) fn wrap_cycle(&self) -> Option<f64> {
        self.wrap_cycle
    }

    pub fn set_time(&mut self, time: f64) {
        if !time.is_finite() {
            debug!(time, "animation_clock_set_ignored");
            return;
        }
        self.time = time;
    }

    pub fn advance(&mut self, dt: f64) {
        if !dt.is_finite() || dt < 0.0 {
            debug!(dt, "animation_clock_step_ignored");
            return;
        }
        self.time += dt;
        if let Some(cycle) = self.wrap_cycle {
            if self.time >= cycle {
                self.time = self.time.rem_euclid(cycle);
            }
        }
    }

    pub(crate) fn recompute_wrap_cycle(&mut self, configs: &HashMap<TileId, TileConfig>) {
        let mut shared: Option<f64> = None;
        for cycle in configs.values().filter_map(TileConfig::cycle_duration) {
            match shared {
                None => shared = Some(cycle),
                Some(existing) if (existing - cycle).abs() <= CYCLE_MATCH_EPSILON => {}
                Some(_) => {
                    self.wrap_cycle = None;
                    debug!("animation_cycles_disagree_wrap_disabled");
                    return;
                }
            }
        }
        self.wrap_cycle = shared;
    }
}
