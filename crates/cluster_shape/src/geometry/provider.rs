//! Collaborators the filter is built from.
//!
//! The filter only reads these once, while building its geometry cache.

use super::types::*;
use std::collections::HashMap;

/// Access to every tracker element the filter caches
pub trait TrackerGeometry {
    fn pixel_barrel_dets(&self) -> &[PixelDetUnit];
    fn pixel_endcap_dets(&self) -> &[PixelDetUnit];
    fn strip_dets(&self) -> &[StripDetUnit];
}

/// Magnetic field map
pub trait MagneticField {
    /// Field at a global position, in tesla
    fn in_tesla(&self, gp: &GlobalPoint) -> GlobalVector;
}

/// Lorentz-angle calibration per element
pub trait LorentzAngle {
    /// tan(Lorentz angle) per tesla
    fn tan_lorentz_angle_per_tesla(&self, id: DetId) -> f32;
}

/// Tracker description held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryTracker {
    pub pixel_barrel: Vec<PixelDetUnit>,
    pub pixel_endcap: Vec<PixelDetUnit>,
    pub strips: Vec<StripDetUnit>,
}

impl InMemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pixel element to the barrel or endcap list by its subdetector
    pub fn add_pixel(&mut self, det: PixelDetUnit) {
        match det.subdetector {
            Subdetector::PixelEndcap => self.pixel_endcap.push(det),
            _ => self.pixel_barrel.push(det),
        }
    }

    pub fn add_strip(&mut self, det: StripDetUnit) {
        self.strips.push(det);
    }
}

impl TrackerGeometry for InMemoryTracker {
    fn pixel_barrel_dets(&self) -> &[PixelDetUnit] {
        &self.pixel_barrel
    }
    fn pixel_endcap_dets(&self) -> &[PixelDetUnit] {
        &self.pixel_endcap
    }
    fn strip_dets(&self) -> &[StripDetUnit] {
        &self.strips
    }
}

/// Same field everywhere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformField(pub GlobalVector);

impl MagneticField for UniformField {
    fn in_tesla(&self, _gp: &GlobalPoint) -> GlobalVector {
        self.0
    }
}

/// Same Lorentz angle for every element
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantLorentzAngle(pub f32);

impl LorentzAngle for ConstantLorentzAngle {
    fn tan_lorentz_angle_per_tesla(&self, _id: DetId) -> f32 {
        self.0
    }
}

/// Per-element table; elements without an entry have no drift
impl LorentzAngle for HashMap<DetId, f32> {
    fn tan_lorentz_angle_per_tesla(&self, id: DetId) -> f32 {
        self.get(&id).copied().unwrap_or(0.0)
    }
}
