use crate::cluster::PixelRecHit;
use crate::error::Result;
use crate::filter::ClusterShapeHitFilter;
use crate::geometry::{GlobalVector, LocalVector};

use log::debug;

/// Track direction at one hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackDirection {
    Local(LocalVector),
    Global(GlobalVector),
}

/// Checks every pixel hit of a track candidate against its direction
#[derive(Debug, Clone, Copy)]
pub struct TripletFilter<'a> {
    filter: &'a ClusterShapeHitFilter,
}

impl<'a> TripletFilter<'a> {
    pub fn new(filter: &'a ClusterShapeHitFilter) -> Self {
        Self { filter }
    }

    /// `false` at the first missing hit or incompatible shape.
    ///
    /// `hits` and `dirs` are paired by position; `None` is an invalid hit.
    pub fn check_track(
        &self,
        hits: &[Option<&PixelRecHit>],
        dirs: &[TrackDirection],
    ) -> Result<bool> {
        for (hit, dir) in hits.iter().zip(dirs) {
            let Some(hit) = hit else {
                debug!("[TripletFilter] invalid hit");
                return Ok(false);
            };

            let compatible = match dir {
                TrackDirection::Local(ldir) => self.filter.is_compatible_pixel(hit, ldir, None)?,
                TrackDirection::Global(gdir) => {
                    self.filter.is_compatible_pixel_global(hit, gdir, None)?
                }
            };
            if !compatible {
                debug!(
                    "[TripletFilter] clusShape problem on element {} at {:?}",
                    hit.det_id, hit.local_position
                );
                return Ok(false);
            }
        }
        Ok(true)
    }
}
