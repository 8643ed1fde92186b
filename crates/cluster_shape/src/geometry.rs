pub mod precompute;
pub mod provider;
pub mod types;

pub use precompute::{GeometryCache, PixelData, StripData, is_normal_oriented};
pub use provider::{
    ConstantLorentzAngle, InMemoryTracker, LorentzAngle, MagneticField, TrackerGeometry,
    UniformField,
};
pub use types::{
    DetId, GeomDetUnit, GlobalPoint, GlobalVector, LocalPoint, LocalVector, PixelDetUnit,
    StripDetUnit, StripTopology, Subdetector, Surface,
};
