use crate::geometry::{DetId, LocalPoint};

/// Shape summary of a pixel cluster
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PixelClusterShape {
    /// Not a merge of several tracks' clusters
    pub is_straight: bool,
    /// Not truncated at a module edge
    pub is_complete: bool,
    pub has_big_pixels_only_inside: bool,
    /// Candidate `(dx, dy)` extents; a negative `dy` on the first entry marks
    /// a cluster elongated against local y
    pub sizes: Vec<(i32, i32)>,
}

impl PixelClusterShape {
    pub fn new(sizes: Vec<(i32, i32)>) -> Self {
        Self {
            is_straight: true,
            is_complete: true,
            has_big_pixels_only_inside: false,
            sizes,
        }
    }

    pub fn is_usable(&self) -> bool {
        self.is_straight && self.is_complete
    }
}

/// Reconstructed pixel hit
#[derive(Debug, Clone, PartialEq)]
pub struct PixelRecHit {
    pub det_id: DetId,
    pub local_position: LocalPoint,
    /// Total cluster charge in electrons
    pub charge: f32,
    pub shape: PixelClusterShape,
}

/// Strip cluster: first strip index and one amplitude per strip
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StripCluster {
    pub first_strip: u16,
    pub amplitudes: Vec<u8>,
}

impl StripCluster {
    pub fn new(first_strip: u16, amplitudes: Vec<u8>) -> Self {
        Self {
            first_strip,
            amplitudes,
        }
    }

    pub fn width(&self) -> i32 {
        self.amplitudes.len() as i32
    }

    /// Sum of amplitudes in ADC counts
    pub fn charge(&self) -> f32 {
        self.amplitudes.iter().map(|&a| a as f32).sum()
    }
}
