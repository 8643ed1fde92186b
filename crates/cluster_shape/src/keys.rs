use crate::constants::{PIXEL_N, PIXEL_N_BARREL, STRIP_N};
use std::fmt;

/// Storage type of a packed cluster-shape key
pub type KeyType = u8;

/// Pixel cluster-shape key built from `(part, dx, dy)`.
///
/// Barrel (`part == 0`) and endcap (any other part) use separate packings
/// laid out one after the other. Anything outside the packed ranges maps to
/// [`PixelKey::INVALID`], which is also the last slot of a limits table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PixelKey(KeyType);

impl PixelKey {
    pub const OFFSET_ENDCAP_DY: i32 = 5;
    pub const OFFSET_ENDCAP_DX: i32 = 10;
    pub const N_BARREL: usize = PIXEL_N_BARREL;
    pub const N: usize = PIXEL_N;
    pub const INVALID: PixelKey = PixelKey(PIXEL_N as KeyType);

    pub fn new(part: u32, dx: i32, dy: i32) -> Self {
        let key = if part == 0 {
            Self::barrel_packing(dx, dy)
        } else {
            Self::endcap_packing(dx, dy)
        };
        PixelKey(key)
    }

    fn endcap_packing(dx: i32, dy: i32) -> KeyType {
        if dx < 0 || dy < 0 || dx > Self::OFFSET_ENDCAP_DX || dy > 4 {
            return Self::N as KeyType;
        }
        // max 137 + 10 * 5 + 4 = 191
        (Self::N_BARREL as i32 + dx * Self::OFFSET_ENDCAP_DY + dy) as KeyType
    }

    fn barrel_packing(dx: i32, dy: i32) -> KeyType {
        if dx < 0 || dy < 0 || dx > 10 || dy > 15 {
            return Self::N as KeyType;
        }
        if dx < 8 {
            return (dx * 16 + dy) as KeyType; // max 127
        }
        if dy > 2 {
            return Self::N as KeyType;
        }
        (128 + (dx - 8) * 3 + dy) as KeyType // max 136
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        (self.0 as usize) < Self::N
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<PixelKey> for u32 {
    fn from(key: PixelKey) -> Self {
        key.0 as u32
    }
}

impl From<PixelKey> for usize {
    fn from(key: PixelKey) -> Self {
        key.index()
    }
}

impl fmt::Display for PixelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "invalid")
        }
    }
}

/// Strip cluster-width key: `width - 1` for widths 1..=40
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StripKey(KeyType);

impl StripKey {
    pub const N: usize = STRIP_N;
    pub const INVALID: StripKey = StripKey(STRIP_N as KeyType);

    pub fn new(width: i32) -> Self {
        if width <= 0 || width as usize > Self::N {
            return Self::INVALID;
        }
        StripKey((width - 1) as KeyType)
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        (self.0 as usize) < Self::N
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<StripKey> for u32 {
    fn from(key: StripKey) -> Self {
        key.0 as u32
    }
}

impl From<StripKey> for usize {
    fn from(key: StripKey) -> Self {
        key.index()
    }
}

impl fmt::Display for StripKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "invalid")
        }
    }
}
