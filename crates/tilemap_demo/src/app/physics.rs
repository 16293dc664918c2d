use tile_engine::{Rect, Tilemap, Vec2};

/// A quarter of a 32px tile per 60 Hz step.
const MAX_FALL_SPEED_PX: f32 = 480.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FallingBox {
    pub(crate) rect: Rect,
    pub(crate) velocity: Vec2,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct StepOutcome {
    pub(crate) grounded: bool,
    pub(crate) blocked_x: bool,
}

impl FallingBox {
    pub(crate) fn new(position: Vec2, size: f32, velocity: Vec2) -> Self {
        Self {
            rect: Rect::new(position.x, position.y, size, size),
            velocity,
        }
    }

    /// Integrates one step and pushes the box out of solid tiles. Landing
    /// stops vertical motion; hitting a wall reverses horizontal motion.
    pub(crate) fn step(
        &mut self,
        map: &Tilemap,
        dt: f32,
        gravity: f32,
        max_iterations: u32,
    ) -> StepOutcome {
        self.velocity.y = (self.velocity.y + gravity * dt).min(MAX_FALL_SPEED_PX);
        let moved = self.rect.translated(self.velocity * dt);
        let (resolved, correction) = map.resolve_rect(moved, max_iterations);
        self.rect = resolved;

        let grounded = correction.y < 0.0 && self.velocity.y > 0.0;
        let hit_ceiling = correction.y > 0.0 && self.velocity.y < 0.0;
        if grounded || hit_ceiling {
            self.velocity.y = 0.0;
        }
        let blocked_x = correction.x != 0.0;
        if blocked_x && correction.x.signum() != self.velocity.x.signum() {
            self.velocity.x = -self.velocity.x;
        }
        StepOutcome {
            grounded,
            blocked_x,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tile_engine::{SpriteSheet, Surface, TileConfig};

    use super::*;

    const DT: f32 = 1.0 / 60.0;

    /// 10x8 map of 32px tiles with a floor on row 5 and a wall in column 6.
    fn walled_map() -> Tilemap {
        let atlas = Arc::new(SpriteSheet::from_surface(Surface::new(1, 1)));
        let mut map = Tilemap::new(32, 32, atlas).expect("map");
        let ground = map.add_layer("ground", 10, 8, None).expect("layer");
        for x in 0..10 {
            ground.set_tile(x, 5, 1).expect("floor");
        }
        for y in 0..5 {
            ground.set_tile(6, y, 1).expect("wall");
        }
        map.set_tile_config(1, TileConfig::solid()).expect("config");
        map.set_collision_layer("ground").expect("collision layer");
        map
    }

    #[test]
    fn box_lands_on_the_floor_and_stops() {
        let map = walled_map();
        let mut falling = FallingBox::new(Vec2::new(40.0, 0.0), 16.0, Vec2::ZERO);
        let mut landed = false;
        for _ in 0..120 {
            landed |= falling.step(&map, DT, 900.0, 4).grounded;
        }
        assert!(landed);
        assert!((falling.rect.bottom() - 160.0).abs() < 1e-3, "{:?}", falling.rect);
        assert_eq!(falling.velocity.y, 0.0);
        assert!(map.check_collision(&falling.rect).is_none());
    }

    #[test]
    fn resting_box_stays_put() {
        let map = walled_map();
        let mut resting = FallingBox::new(Vec2::new(40.0, 144.0), 16.0, Vec2::ZERO);
        let outcome = resting.step(&map, DT, 900.0, 4);
        assert!(outcome.grounded);
        assert_eq!(resting.velocity.y, 0.0);
        assert!((resting.rect.y - 144.0).abs() < 1e-3);
    }

    #[test]
    fn walls_reverse_horizontal_motion() {
        let map = walled_map();
        let mut sliding = FallingBox::new(Vec2::new(150.0, 100.0), 16.0, Vec2::new(120.0, 0.0));
        let mut blocked = false;
        for _ in 0..60 {
            blocked |= sliding.step(&map, DT, 0.0, 4).blocked_x;
        }
        assert!(blocked);
        assert!(sliding.velocity.x < 0.0);
        assert!(sliding.rect.right() <= 192.0 + 1e-3);
    }

    #[test]
    fn speed_is_capped() {
        let map = walled_map();
        let mut falling = FallingBox::new(Vec2::new(40.0, -10_000.0), 16.0, Vec2::ZERO);
        for _ in 0..600 {
            falling.step(&map, DT, 900.0, 4);
        }
        assert!(falling.velocity.y <= MAX_FALL_SPEED_PX);
    }
}
