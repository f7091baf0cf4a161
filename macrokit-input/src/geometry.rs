use serde::{Deserialize, Serialize};

/// A position on the virtual screen, in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

/// An axis-aligned rectangle in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// Fractional coordinates of an absolute point within this rectangle,
    /// clamped to [0, 1] on both axes. Degenerate rectangles yield `None`.
    pub fn relative_of(&self, x: i32, y: i32) -> Option<(f64, f64)> {
        if self.width <= 0 || self.height <= 0 {
            return None;
        }
        let rel_x = f64::from(x - self.x) / f64::from(self.width);
        let rel_y = f64::from(y - self.y) / f64::from(self.height);
        Some((rel_x.clamp(0.0, 1.0), rel_y.clamp(0.0, 1.0)))
    }

    /// Absolute point for fractional coordinates within this rectangle.
    pub fn absolute_of(&self, rel_x: f64, rel_y: f64) -> Position {
        Position {
            x: self.x + (f64::from(self.width) * rel_x).round() as i32,
            y: self.y + (f64::from(self.height) * rel_y).round() as i32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_of_maps_corners_and_center() {
        let rect = Rect { x: 100, y: 200, width: 400, height: 300 };
        assert_eq!(rect.relative_of(100, 200), Some((0.0, 0.0)));
        assert_eq!(rect.relative_of(500, 500), Some((1.0, 1.0)));
        assert_eq!(rect.relative_of(300, 350), Some((0.5, 0.5)));
    }

    #[test]
    fn relative_of_clamps_outside_points() {
        let rect = Rect { x: 0, y: 0, width: 100, height: 100 };
        assert_eq!(rect.relative_of(-50, 150), Some((0.0, 1.0)));
    }

    #[test]
    fn relative_of_rejects_degenerate_rect() {
        let rect = Rect { x: 10, y: 10, width: 0, height: 50 };
        assert_eq!(rect.relative_of(10, 10), None);
    }

    #[test]
    fn absolute_of_round_trips_relative_of() {
        let rect = Rect { x: -20, y: 40, width: 640, height: 480 };
        let (rel_x, rel_y) = rect.relative_of(300, 280).unwrap();
        let abs = rect.absolute_of(rel_x, rel_y);
        assert_eq!(abs, Position { x: 300, y: 280 });
    }
}
