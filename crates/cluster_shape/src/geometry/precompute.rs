use std::collections::HashMap;

use log::{info, warn};

use super::provider::{LorentzAngle, MagneticField, TrackerGeometry};
use super::types::*;
use crate::constants::{PART_BARREL, PART_ENDCAP};
use crate::error::{ClusterShapeError, Result};

/// Cached corrections of one pixel element
#[derive(Debug, Clone, PartialEq)]
pub struct PixelData {
    pub det: PixelDetUnit,
    pub part: u32,
    pub drift: (f32, f32),
    pub cotangent: (f32, f32),
}

/// Cached corrections of one strip element.
///
/// The cotangent is not cached since the pitch may depend on the position.
#[derive(Debug, Clone, PartialEq)]
pub struct StripData {
    pub det: StripDetUnit,
    pub drift: f32,
}

impl StripData {
    pub fn cotangent(&self, lp: &LocalPoint) -> f32 {
        strip_cotangent(&self.det, lp)
    }
}

/// Per-element corrections, filled in a single pass and read-only afterwards
#[derive(Debug, Clone, Default)]
pub struct GeometryCache {
    pixel: HashMap<DetId, PixelData>,
    strip: HashMap<DetId, StripData>,
}

impl GeometryCache {
    pub fn build<T, F, P, S>(tracker: &T, field: &F, pixel_la: &P, strip_la: &S) -> Self
    where
        T: TrackerGeometry + ?Sized,
        F: MagneticField + ?Sized,
        P: LorentzAngle + ?Sized,
        S: LorentzAngle + ?Sized,
    {
        let mut pixel = HashMap::with_capacity(
            tracker.pixel_barrel_dets().len() + tracker.pixel_endcap_dets().len(),
        );
        let parts = [
            (tracker.pixel_barrel_dets(), PART_BARREL),
            (tracker.pixel_endcap_dets(), PART_ENDCAP),
        ];
        for (dets, part) in parts {
            for det in dets {
                let pd = PixelData {
                    det: det.clone(),
                    part,
                    drift: pixel_drift(det, field, pixel_la),
                    cotangent: pixel_cotangent(det),
                };
                if pixel.insert(det.id, pd).is_some() {
                    warn!("duplicate pixel element {}, keeping the last one", det.id);
                }
            }
        }

        let mut strip = HashMap::with_capacity(tracker.strip_dets().len());
        for det in tracker.strip_dets() {
            let sd = StripData {
                det: det.clone(),
                drift: strip_drift(det, field, strip_la),
            };
            if strip.insert(det.id, sd).is_some() {
                warn!("duplicate strip element {}, keeping the last one", det.id);
            }
        }

        info!(
            "geometry cache built: {} pixel, {} strip elements",
            pixel.len(),
            strip.len()
        );
        Self { pixel, strip }
    }

    pub fn pixel(&self, id: DetId) -> Result<&PixelData> {
        self.pixel
            .get(&id)
            .ok_or(ClusterShapeError::UnknownDetector(id))
    }

    pub fn strip(&self, id: DetId) -> Result<&StripData> {
        self.strip
            .get(&id)
            .ok_or(ClusterShapeError::UnknownDetector(id))
    }

    pub fn pixel_count(&self) -> usize {
        self.pixel.len()
    }

    pub fn strip_count(&self) -> usize {
        self.strip.len()
    }
}

/// Thickness over pitch along local x and y
pub fn pixel_cotangent(det: &PixelDetUnit) -> (f32, f32) {
    (det.thickness / det.pitch.0, det.thickness / det.pitch.1)
}

/// Thickness over the pitch across the strips at `lp`.
///
/// For a fan topology the pitch depends only on the local y of `lp`.
pub fn strip_cotangent(det: &StripDetUnit, lp: &LocalPoint) -> f32 {
    det.thickness / det.topology.local_pitch(lp)
}

/// Field at the element centre rotated into its local frame
fn local_field<D, F>(det: &D, field: &F) -> LocalVector
where
    D: GeomDetUnit,
    F: MagneticField + ?Sized,
{
    let surface = det.surface();
    surface.to_local_vector(&field.in_tesla(&surface.position))
}

pub fn pixel_drift<F, P>(det: &PixelDetUnit, field: &F, la: &P) -> (f32, f32)
where
    F: MagneticField + ?Sized,
    P: LorentzAngle + ?Sized,
{
    let b = local_field(det, field);
    let tan_la = la.tan_lorentz_angle_per_tesla(det.id);
    (-tan_la * b.y, tan_la * b.x)
}

pub fn strip_drift<F, S>(det: &StripDetUnit, field: &F, la: &S) -> f32
where
    F: MagneticField + ?Sized,
    S: LorentzAngle + ?Sized,
{
    let b = local_field(det, field);
    la.tan_lorentz_angle_per_tesla(det.id) * b.y
}

/// Whether local +z points away from the interaction region
pub fn is_normal_oriented<D: GeomDetUnit + ?Sized>(det: &D) -> bool {
    let surface = det.surface();
    let origin = surface.to_global_point(&LocalPoint::origin());
    if det.subdetector().is_barrel() {
        let shifted = surface.to_global_point(&LocalPoint::new(0.0, 0.0, 1.0));
        shifted.coords.xy().norm() > origin.coords.xy().norm()
    } else {
        let rot = surface.to_global_vector(&LocalVector::z());
        rot.z * origin.z > 0.0
    }
}
