/*! Geometry types for screen coordinates. */

use serde::{Deserialize, Serialize};

/// Rectangle in root-window pixel coordinates.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Bounds {
  pub x: i32,
  pub y: i32,
  pub w: u32,
  pub h: u32,
}

impl Bounds {
  pub const fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
    Self { x, y, w, h }
  }

  /// Check if a pixel lies inside. The right and bottom edges are exclusive.
  pub fn contains(&self, point: Point) -> bool {
    let (px, py) = (i64::from(point.x), i64::from(point.y));
    let (x, y) = (i64::from(self.x), i64::from(self.y));
    px >= x && px < x + i64::from(self.w) && py >= y && py < y + i64::from(self.h)
  }

  /// Centre pixel, rounded towards the origin.
  pub fn center(&self) -> Point {
    let cx = i64::from(self.x) + i64::from(self.w) / 2;
    let cy = i64::from(self.y) + i64::from(self.h) / 2;
    Point::new(saturate(cx), saturate(cy))
  }

  /// True if the rectangle covers no pixel.
  pub const fn is_empty(&self) -> bool {
    self.w == 0 || self.h == 0
  }
}

/// A pixel position in root-window coordinates.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Point {
  pub x: i32,
  pub y: i32,
}

impl Point {
  pub const fn new(x: i32, y: i32) -> Self {
    Self { x, y }
  }
}

fn saturate(value: i64) -> i32 {
  i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}
