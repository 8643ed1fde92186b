pub mod charge;
pub mod cluster;
pub mod config;
pub mod constants;
pub mod error;
pub mod filter;
pub mod geometry;
pub mod keys;
pub mod limits;
pub mod triplet;

pub use charge::{ChargeEstimator, PathLengthCharge};
pub use cluster::{PixelClusterShape, PixelRecHit, StripCluster};
pub use config::FilterConfig;
pub use error::{ClusterShapeError, Result};
pub use filter::{ClusterShapeHitFilter, LimitResult, PixelSizes, PixelTrace, StripSizes};
pub use geometry::{DetId, GeometryCache, PixelData, StripData};
pub use keys::{PixelKey, StripKey};
pub use limits::{
    Limit2D, PixelLimits, PixelLimitsCollection, StripLimits, StripLimitsCollection,
};
pub use triplet::{TrackDirection, TripletFilter};
