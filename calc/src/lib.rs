#![cfg_attr(not(test), no_std)]

/// Side length of a dispatch tile, in work-items.
pub const TILE_SIZE: u32 = 8;

/// Identity of one work-item: the global invocation index.
///
/// Only `x` and `y` address pixels; `z` is always `0` for a 2D dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalId {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}
impl GlobalId {
    #[inline(always)]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y, z: 0 }
    }
    /// The index of the work-item at `local` inside tile `tile`.
    #[inline(always)]
    pub const fn from_tile(tile: (u32, u32), local: (u32, u32)) -> Self {
        Self::new(tile.0 * TILE_SIZE + local.0, tile.1 * TILE_SIZE + local.1)
    }
    #[inline(always)]
    pub const fn in_bounds(self, width: u32, height: u32) -> bool {
        self.x < width && self.y < height
    }
}

/// Number of tiles to launch in each dimension so every pixel is covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    pub tiles_x: u32,
    pub tiles_y: u32,
}
impl Dispatch {
    pub const fn covering(width: u32, height: u32) -> Self {
        Self {
            tiles_x: div_ceil(width, TILE_SIZE),
            tiles_y: div_ceil(height, TILE_SIZE),
        }
    }
    /// Total work-items launched, including the discarded edge over-coverage.
    pub const fn invocations(&self) -> u64 {
        self.tiles_x as u64 * self.tiles_y as u64 * (TILE_SIZE * TILE_SIZE) as u64
    }
    pub const fn is_empty(&self) -> bool {
        self.tiles_x == 0 || self.tiles_y == 0
    }
}

#[inline(always)]
const fn div_ceil(value: u32, divisor: u32) -> u32 {
    value / divisor + (value % divisor != 0) as u32
}

/// RGBA value with floats. Range: 0..=1
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RGBAF {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}
impl RGBAF {
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    #[inline(always)]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
    #[inline(always)]
    pub const fn from_array([r, g, b, a]: [f32; 4]) -> Self {
        Self::new(r, g, b, a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RGBA {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}
impl RGBA {
    #[inline(always)]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}
impl From<RGBAF> for RGBA {
    /// Quantizes like a unorm texture store: clamp to `0..=1`, scale, round.
    fn from(rgba: RGBAF) -> Self {
        Self::new(
            unorm8(rgba.r),
            unorm8(rgba.g),
            unorm8(rgba.b),
            unorm8(rgba.a),
        )
    }
}

#[inline(always)]
fn unorm8(channel: f32) -> u8 {
    // NaN fails both comparisons and lands on 0.
    let clamped = if channel > 1.0 {
        1.0
    } else if channel >= 0.0 {
        channel
    } else {
        0.0
    };
    (clamped * 255.0 + 0.5) as u8
}

#[inline(always)]
fn normalized(coord: u32, max: u32) -> f32 {
    coord as f32 / max as f32
}

/// The per-pixel initialization kernel.
///
/// Returns the value work-item `id` stores, or [`None`] if `id` lies outside
/// the `width`×`height` image and must not write anything.
#[inline(always)]
pub fn init_pixel(id: GlobalId, width: u32, height: u32) -> Option<RGBAF> {
    if !id.in_bounds(width, height) {
        return None;
    }
    let u = normalized(id.x, width);
    // Only the horizontal ramp is stored; `v` stays unused.
    let _v = normalized(id.y, height);
    Some(RGBAF::new(u, 0.0, 0.0, 1.0))
}
