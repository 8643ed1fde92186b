use nalgebra::{Point3, Rotation3, Vector3};
use serde::Serialize;
use std::fmt;
use strum_macros::{Display, EnumIter};

pub type LocalPoint = Point3<f32>;
pub type LocalVector = Vector3<f32>;
pub type GlobalPoint = Point3<f32>;
pub type GlobalVector = Vector3<f32>;

/// Detector element identifier (raw id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DetId(pub u32);

impl DetId {
    pub fn raw_id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tracker subdetector family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Subdetector {
    PixelBarrel,
    PixelEndcap,
    StripBarrel,
    StripEndcap,
}

impl Subdetector {
    pub fn is_barrel(self) -> bool {
        matches!(self, Subdetector::PixelBarrel | Subdetector::StripBarrel)
    }
}

/// Placement of a detector element: origin and local-to-global rotation
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub position: GlobalPoint,
    pub rotation: Rotation3<f32>,
}

impl Surface {
    pub fn new(position: GlobalPoint, rotation: Rotation3<f32>) -> Self {
        Self { position, rotation }
    }

    pub fn to_global_point(&self, lp: &LocalPoint) -> GlobalPoint {
        self.position + self.rotation * lp.coords
    }

    pub fn to_global_vector(&self, lv: &LocalVector) -> GlobalVector {
        self.rotation * *lv
    }

    pub fn to_local_point(&self, gp: &GlobalPoint) -> LocalPoint {
        LocalPoint::from(self.rotation.inverse_transform_vector(&(*gp - self.position)))
    }

    pub fn to_local_vector(&self, gv: &GlobalVector) -> LocalVector {
        self.rotation.inverse_transform_vector(gv)
    }
}

/// Common view of pixel and strip elements
pub trait GeomDetUnit {
    fn id(&self) -> DetId;
    fn subdetector(&self) -> Subdetector;
    fn surface(&self) -> &Surface;
    /// Sensor thickness in cm
    fn thickness(&self) -> f32;
}

#[derive(Debug, Clone, PartialEq)]
pub struct PixelDetUnit {
    pub id: DetId,
    pub subdetector: Subdetector,
    pub surface: Surface,
    pub thickness: f32,
    /// Pitch along local x and y in cm
    pub pitch: (f32, f32),
}

impl GeomDetUnit for PixelDetUnit {
    fn id(&self) -> DetId {
        self.id
    }
    fn subdetector(&self) -> Subdetector {
        self.subdetector
    }
    fn surface(&self) -> &Surface {
        &self.surface
    }
    fn thickness(&self) -> f32 {
        self.thickness
    }
}

/// Strip layout of a sensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StripTopology {
    /// Parallel strips with constant pitch
    Rectangular { pitch: f32, nstrips: u16 },
    /// Fan of strips; pitch grows with the distance from the fan origin,
    /// which lies `origin_to_center` below the local origin along y
    Radial {
        angular_width: f32,
        origin_to_center: f32,
        nstrips: u16,
    },
}

impl StripTopology {
    pub fn nstrips(&self) -> u16 {
        match *self {
            StripTopology::Rectangular { nstrips, .. } => nstrips,
            StripTopology::Radial { nstrips, .. } => nstrips,
        }
    }

    pub fn local_pitch(&self, lp: &LocalPoint) -> f32 {
        match *self {
            StripTopology::Rectangular { pitch, .. } => pitch,
            StripTopology::Radial {
                angular_width,
                origin_to_center,
                ..
            } => angular_width * (origin_to_center + lp.y),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StripDetUnit {
    pub id: DetId,
    pub subdetector: Subdetector,
    pub surface: Surface,
    pub thickness: f32,
    pub topology: StripTopology,
}

impl GeomDetUnit for StripDetUnit {
    fn id(&self) -> DetId {
        self.id
    }
    fn subdetector(&self) -> Subdetector {
        self.subdetector
    }
    fn surface(&self) -> &Surface {
        &self.surface
    }
    fn thickness(&self) -> f32 {
        self.thickness
    }
}
