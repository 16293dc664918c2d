use std::ops::{Add, AddAssign, Mul};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned rectangle in world pixels.
///
/// `(x, y)` is the top-left corner and y grows downward, matching surface
/// coordinates. Width and height are expected to be non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Width and height of the intersection with `other`. Either component is
    /// zero or negative when the rectangles do not overlap on that axis.
    pub fn overlap(&self, other: &Rect) -> (f32, f32) {
        let dx = self.right().min(other.right()) - self.left().max(other.left());
        let dy = self.bottom().min(other.bottom()) - self.top().max(other.top());
        (dx, dy)
    }

    /// Strict overlap test; rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        let (dx, dy) = self.overlap(other);
        dx > 0.0 && dy > 0.0
    }

    pub fn translated(&self, offset: Vec2) -> Rect {
        Rect::new(self.x + offset.x, self.y + offset.y, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_edges_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 32.0, 32.0);
        let right_neighbor = Rect::new(32.0, 0.0, 32.0, 32.0);
        let below_neighbor = Rect::new(0.0, 32.0, 32.0, 32.0);
        assert!(!a.intersects(&right_neighbor));
        assert!(!a.intersects(&below_neighbor));
        assert_eq!(a.overlap(&right_neighbor), (0.0, 32.0));
    }

    #[test]
    fn overlap_reports_intersection_extent() {
        let tile = Rect::new(32.0, 32.0, 32.0, 32.0);
        let query = Rect::new(28.0, 40.0, 16.0, 16.0);
        assert!(query.intersects(&tile));
        assert_eq!(query.overlap(&tile), (12.0, 16.0));
        assert_eq!(tile.overlap(&query), (12.0, 16.0));
    }

    #[test]
    fn translation_keeps_size() {
        let moved = Rect::new(1.0, 2.0, 3.0, 4.0).translated(Vec2::new(-1.0, 0.5));
        assert_eq!(moved, Rect::new(0.0, 2.5, 3.0, 4.0));
        assert_eq!(moved.center(), Vec2::new(1.5, 4.5));
    }
}
