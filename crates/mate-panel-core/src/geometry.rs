use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in desktop pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// One past the last column
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// One past the last row
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        i64::from(self.width.max(0)) * i64::from(self.height.max(0))
    }

    /// True when the two rectangles share at least one pixel
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Screen edge a panel is docked to.
///
/// The discriminants form a ring (`TOP = 1 << 0` .. `LEFT = 1 << 3`) so that
/// rotation is a shift with wrap-around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Orientation {
    #[default]
    Top = 1 << 0,
    Right = 1 << 1,
    Bottom = 1 << 2,
    Left = 1 << 3,
}

impl Orientation {
    pub const ALL: [Orientation; 4] = [
        Orientation::Top,
        Orientation::Right,
        Orientation::Bottom,
        Orientation::Left,
    ];

    pub fn bits(self) -> u8 {
        self as u8
    }

    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            1 => Some(Self::Top),
            2 => Some(Self::Right),
            4 => Some(Self::Bottom),
            8 => Some(Self::Left),
            _ => None,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Orientation::Top | Orientation::Bottom)
    }

    pub fn is_vertical(self) -> bool {
        !self.is_horizontal()
    }

    /// Next orientation around the ring
    pub fn rotated(self, clockwise: bool) -> Self {
        let bits = self.bits();
        let next = if clockwise { bits << 1 } else { bits >> 1 };
        match Self::from_bits(next) {
            Some(orientation) => orientation,
            None if clockwise => Orientation::Top,
            None => Orientation::Left,
        }
    }

    /// Sort rank used by the strut allocator
    pub fn order(self) -> u8 {
        match self {
            Orientation::Top => 1,
            Orientation::Bottom => 2,
            Orientation::Left => 3,
            Orientation::Right => 4,
        }
    }

    /// Orientation a drawer takes when attached to a panel with this orientation
    pub fn drawer_orientation(self) -> Self {
        match self {
            Orientation::Top => Orientation::Left,
            Orientation::Bottom => Orientation::Right,
            Orientation::Left => Orientation::Top,
            Orientation::Right => Orientation::Bottom,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Top => "top",
            Orientation::Bottom => "bottom",
            Orientation::Left => "left",
            Orientation::Right => "right",
        }
    }
}

bitflags! {
    /// Frame edges that get a bevel
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PanelEdges: u8 {
        const TOP = 1 << 0;
        const RIGHT = 1 << 1;
        const BOTTOM = 1 << 2;
        const LEFT = 1 << 3;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_is_a_closed_ring() {
        for start in Orientation::ALL {
            let mut orientation = start;
            for _ in 0..4 {
                orientation = orientation.rotated(true);
            }
            assert_eq!(orientation, start);

            for _ in 0..4 {
                orientation = orientation.rotated(false);
            }
            assert_eq!(orientation, start);
        }
    }

    #[test]
    fn test_rotation_wraps() {
        assert_eq!(Orientation::Left.rotated(true), Orientation::Top);
        assert_eq!(Orientation::Top.rotated(false), Orientation::Left);
        assert_eq!(Orientation::Top.rotated(true), Orientation::Right);
    }

    #[test]
    fn test_rect_intersection_excludes_touching() {
        let a = Rect::new(0, 0, 100, 24);
        let b = Rect::new(0, 24, 100, 24);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&Rect::new(99, 23, 10, 10)));
    }

    #[test]
    fn test_orientation_serde_lowercase() {
        let json = serde_json::to_string(&Orientation::Bottom).unwrap();
        assert_eq!(json, "\"bottom\"");
        let parsed: Orientation = serde_json::from_str("\"left\"").unwrap();
        assert_eq!(parsed, Orientation::Left);
    }
}
