use crate::cluster::{PixelRecHit, StripCluster};
use crate::geometry::{GeomDetUnit, LocalVector, PixelDetUnit, StripDetUnit};

/// Deposited charge per unit path length, used by the optional charge cut
pub trait ChargeEstimator: Send + Sync {
    fn pixel_charge_per_cm(
        &self,
        det: &PixelDetUnit,
        hit: &PixelRecHit,
        ldir: &LocalVector,
    ) -> f32;

    fn strip_charge_per_cm(
        &self,
        det: &StripDetUnit,
        cluster: &StripCluster,
        ldir: &LocalVector,
    ) -> f32;
}

/// Cluster charge over the path length through the sensor
#[derive(Debug, Clone, Copy, Default)]
pub struct PathLengthCharge;

impl PathLengthCharge {
    /// `charge * |cos(theta)| / thickness`, theta measured from the sensor normal
    pub fn per_cm<D: GeomDetUnit>(det: &D, charge: f32, ldir: &LocalVector) -> f32 {
        charge * ldir.z.abs() / ldir.norm() / det.thickness()
    }
}

impl ChargeEstimator for PathLengthCharge {
    fn pixel_charge_per_cm(
        &self,
        det: &PixelDetUnit,
        hit: &PixelRecHit,
        ldir: &LocalVector,
    ) -> f32 {
        Self::per_cm(det, hit.charge, ldir)
    }

    fn strip_charge_per_cm(
        &self,
        det: &StripDetUnit,
        cluster: &StripCluster,
        ldir: &LocalVector,
    ) -> f32 {
        Self::per_cm(det, cluster.charge(), ldir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{DetId, GlobalPoint, StripTopology, Subdetector, Surface};
    use nalgebra::Rotation3;

    fn strip() -> StripDetUnit {
        StripDetUnit {
            id: DetId(1),
            subdetector: Subdetector::StripBarrel,
            surface: Surface::new(GlobalPoint::origin(), Rotation3::identity()),
            thickness: 0.05,
            topology: StripTopology::Rectangular {
                pitch: 0.01,
                nstrips: 512,
            },
        }
    }

    #[test]
    fn test_normal_incidence() {
        let cluster = StripCluster::new(10, vec![50, 100, 50]);
        let q = PathLengthCharge.strip_charge_per_cm(&strip(), &cluster, &LocalVector::z());
        assert!((q - 4000.0).abs() < 1e-2);
    }

    #[test]
    fn test_inclined_track_has_less_charge_per_cm() {
        let cluster = StripCluster::new(10, vec![50, 100, 50]);
        let normal = PathLengthCharge.strip_charge_per_cm(&strip(), &cluster, &LocalVector::z());
        let inclined = PathLengthCharge.strip_charge_per_cm(
            &strip(),
            &cluster,
            &LocalVector::new(1.0, 0.0, 1.0),
        );
        assert!((inclined - normal / 2f32.sqrt()).abs() < 1e-2);
    }
}
