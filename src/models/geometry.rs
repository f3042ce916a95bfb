use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn as_pair(&self) -> [u32; 2] {
        [self.width, self.height]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    pub fn as_pair(&self) -> [u32; 2] {
        [self.x, self.y]
    }
}

/// Pixel rectangle inside an image. Only `geometry::compute_region` builds
/// one, so every `Region` already lies within its image bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    x0: u32,
    y0: u32,
    width: u32,
    height: u32,
}

impl Region {
    pub(crate) fn from_parts(x0: u32, y0: u32, width: u32, height: u32) -> Self {
        Self {
            x0,
            y0,
            width,
            height,
        }
    }

    pub fn x0(&self) -> u32 {
        self.x0
    }

    pub fn y0(&self) -> u32 {
        self.y0
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Exclusive end column.
    pub fn x_end(&self) -> u32 {
        self.x0 + self.width
    }

    /// Exclusive end row.
    pub fn y_end(&self) -> u32 {
        self.y0 + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x0 && x < self.x_end() && y >= self.y0 && y < self.y_end()
    }
}

/// Region request expressed as fractions of the source image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionRatios {
    pub x0: f64,
    pub y0: f64,
    pub width: f64,
    pub height: f64,
}

impl RegionRatios {
    pub fn new(x0: f64, y0: f64, width: f64, height: f64) -> Self {
        Self {
            x0,
            y0,
            width,
            height,
        }
    }
}

impl Default for RegionRatios {
    /// Centered half-size box, the control panel's starting selection.
    fn default() -> Self {
        Self::new(0.25, 0.25, 0.5, 0.5)
    }
}

/// Outpainting growth per edge, as a multiple of the original dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeRatios {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl EdgeRatios {
    pub fn new(left: f64, right: f64, top: f64, bottom: f64) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    pub fn uniform(ratio: f64) -> Self {
        Self::new(ratio, ratio, ratio, ratio)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CanvasPlacement {
    pub canvas_size: Size,
    pub original_size: Size,
    pub original_location: Point,
}
