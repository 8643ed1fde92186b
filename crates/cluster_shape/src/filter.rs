//! Cluster-shape compatibility test for pixel and strip hits.
//!
//! A hit is compared against the cluster size predicted from a track
//! direction. The prediction is corrected for Lorentz drift and scaled to
//! channel units by the element's thickness/pitch ratio, then looked up in
//! the calibration limits of the measured shape.
//!
//! Clusters the filter cannot interpret (merged, truncated, or with a shape
//! outside the calibrated key space) are always accepted.

use crate::charge::{ChargeEstimator, PathLengthCharge};
use crate::cluster::{PixelRecHit, StripCluster};
use crate::config::FilterConfig;
use crate::error::Result;
use crate::geometry::{
    DetId, GeometryCache, GlobalPoint, GlobalVector, LocalPoint, LocalVector, LorentzAngle,
    MagneticField, PixelData, StripData, TrackerGeometry,
};
use crate::keys::{PixelKey, StripKey};
use crate::limits::{Limit2D, PixelLimitsCollection, StripLimitsCollection};

use log::info;
use serde::Serialize;

/// Measured pixel sizes and the corrected prediction
#[derive(Debug, Clone, PartialEq)]
pub struct PixelSizes {
    pub usable: bool,
    pub part: u32,
    /// Size entries with `dy` sign-canonicalised
    pub sizes: Vec<(i32, i32)>,
    pub pred: (f32, f32),
}

/// Measured strip width and the corrected prediction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StripSizes {
    pub usable: bool,
    pub width: i32,
    pub pred: f32,
}

/// Limits probed for one size entry
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LimitResult {
    pub limit_key: u32,
    pub limit_key_valid: bool,
    pub pred_inside_limits: bool,
    pub limits: [Limit2D; 2],
}

/// Every intermediate quantity of one pixel decision
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PixelTrace {
    pub compatible: bool,
    pub local_position: [f32; 3],
    pub local_direction: [f32; 3],
    pub det_id: Option<DetId>,
    pub is_straight: bool,
    pub is_complete: bool,
    pub has_big_pixels_only_inside: bool,
    pub usable: bool,
    pub part: u32,
    pub drift: [f32; 2],
    pub cotangent: [f32; 2],
    pub pred: [f32; 2],
    /// Size entries as stored on the cluster, before sign canonicalisation
    pub cluster_sizes: Vec<[i32; 2]>,
    pub limits: Vec<LimitResult>,
    pub has_pred_inside_limits: bool,
    pub has_invalid_key: bool,
}

pub struct ClusterShapeHitFilter {
    geometry: GeometryCache,
    pixel_limits: PixelLimitsCollection,
    strip_limits: StripLimitsCollection,
    charge: Box<dyn ChargeEstimator>,

    cut_on_pixel_charge: bool,
    cut_on_strip_charge: bool,
    min_good_pixel_charge: f32,
    min_good_strip_charge: f32,
    cut_on_pixel_shape: bool,
    cut_on_strip_shape: bool,
}

impl std::fmt::Debug for ClusterShapeHitFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterShapeHitFilter")
            .field("pixel_elements", &self.geometry.pixel_count())
            .field("strip_elements", &self.geometry.strip_count())
            .field("cut_on_pixel_shape", &self.cut_on_pixel_shape)
            .field("cut_on_strip_shape", &self.cut_on_strip_shape)
            .field("cut_on_pixel_charge", &self.cut_on_pixel_charge)
            .field("cut_on_strip_charge", &self.cut_on_strip_charge)
            .finish_non_exhaustive()
    }
}

impl ClusterShapeHitFilter {
    /// Loads both calibration tables and caches every tracker element.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or a calibration
    /// resource cannot be found or parsed
    pub fn new<T, F, P, S>(
        config: &FilterConfig,
        tracker: &T,
        field: &F,
        pixel_la: &P,
        strip_la: &S,
    ) -> Result<Self>
    where
        T: TrackerGeometry + ?Sized,
        F: MagneticField + ?Sized,
        P: LorentzAngle + ?Sized,
        S: LorentzAngle + ?Sized,
    {
        config.validate()?;
        let pixel_limits = PixelLimitsCollection::load(config.pixel_shape_path()?)?;
        let strip_limits = StripLimitsCollection::load(config.strip_shape_path()?)?;
        let geometry = GeometryCache::build(tracker, field, pixel_la, strip_la);

        let mut filter = Self::from_parts(geometry, pixel_limits, strip_limits);
        filter.apply_config(config);
        info!("cluster-shape hit filter ready: {filter:?}");
        Ok(filter)
    }

    /// Assembles a filter from prepared parts with every cut disabled
    pub fn from_parts(
        geometry: GeometryCache,
        pixel_limits: PixelLimitsCollection,
        strip_limits: StripLimitsCollection,
    ) -> Self {
        Self {
            geometry,
            pixel_limits,
            strip_limits,
            charge: Box::new(PathLengthCharge),
            cut_on_pixel_charge: false,
            cut_on_strip_charge: false,
            min_good_pixel_charge: 0.0,
            min_good_strip_charge: 0.0,
            cut_on_pixel_shape: false,
            cut_on_strip_shape: false,
        }
    }

    pub fn with_charge_estimator(mut self, estimator: Box<dyn ChargeEstimator>) -> Self {
        self.charge = estimator;
        self
    }

    pub fn apply_config(&mut self, config: &FilterConfig) {
        self.set_shape_cuts(config.cut_on_pixel_shape, config.cut_on_strip_shape);
        self.set_charge_cuts(
            config.cut_on_pixel_charge,
            config.min_good_pixel_charge,
            config.strip_charge_cut_enabled(),
            config.min_good_strip_charge,
        );
    }

    pub fn set_shape_cuts(&mut self, cut_on_pixel_shape: bool, cut_on_strip_shape: bool) {
        self.cut_on_pixel_shape = cut_on_pixel_shape;
        self.cut_on_strip_shape = cut_on_strip_shape;
    }

    pub fn set_charge_cuts(
        &mut self,
        cut_on_pixel_charge: bool,
        min_good_pixel_charge: f32,
        cut_on_strip_charge: bool,
        min_good_strip_charge: f32,
    ) {
        self.cut_on_pixel_charge = cut_on_pixel_charge;
        self.min_good_pixel_charge = min_good_pixel_charge;
        self.cut_on_strip_charge = cut_on_strip_charge;
        self.min_good_strip_charge = min_good_strip_charge;
    }

    pub fn geometry(&self) -> &GeometryCache {
        &self.geometry
    }

    pub fn pixel_limits(&self) -> &PixelLimitsCollection {
        &self.pixel_limits
    }

    pub fn strip_limits(&self) -> &StripLimitsCollection {
        &self.strip_limits
    }

    fn pixel_data<'a>(
        &'a self,
        hit: &PixelRecHit,
        pd: Option<&'a PixelData>,
    ) -> Result<&'a PixelData> {
        match pd {
            Some(pd) => Ok(pd),
            None => self.geometry.pixel(hit.det_id),
        }
    }

    // ---- pixel ----

    /// Measured sizes and corrected prediction of a pixel hit
    pub fn pixel_sizes(
        &self,
        hit: &PixelRecHit,
        ldir: &LocalVector,
        pd: Option<&PixelData>,
    ) -> Result<PixelSizes> {
        let pd = self.pixel_data(hit, pd)?;
        Ok(measure_pixel(hit, ldir, pd))
    }

    pub fn is_compatible_pixel(
        &self,
        hit: &PixelRecHit,
        ldir: &LocalVector,
        pd: Option<&PixelData>,
    ) -> Result<bool> {
        self.pixel_compatible(hit, ldir, pd, None)
    }

    pub fn is_compatible_pixel_traced(
        &self,
        hit: &PixelRecHit,
        ldir: &LocalVector,
        pd: Option<&PixelData>,
    ) -> Result<(bool, PixelTrace)> {
        let mut trace = PixelTrace::default();
        let compatible = self.pixel_compatible(hit, ldir, pd, Some(&mut trace))?;
        Ok((compatible, trace))
    }

    /// Same as [`Self::is_compatible_pixel`] with a direction in global coordinates
    pub fn is_compatible_pixel_global(
        &self,
        hit: &PixelRecHit,
        gdir: &GlobalVector,
        pd: Option<&PixelData>,
    ) -> Result<bool> {
        let pd = self.pixel_data(hit, pd)?;
        let ldir = pd.det.surface.to_local_vector(gdir);
        self.pixel_compatible(hit, &ldir, Some(pd), None)
    }

    pub fn is_compatible_pixel_global_traced(
        &self,
        hit: &PixelRecHit,
        gdir: &GlobalVector,
        pd: Option<&PixelData>,
    ) -> Result<(bool, PixelTrace)> {
        let pd = self.pixel_data(hit, pd)?;
        let ldir = pd.det.surface.to_local_vector(gdir);
        self.is_compatible_pixel_traced(hit, &ldir, Some(pd))
    }

    fn pixel_compatible(
        &self,
        hit: &PixelRecHit,
        ldir: &LocalVector,
        pd: Option<&PixelData>,
        mut trace: Option<&mut PixelTrace>,
    ) -> Result<bool> {
        let compatible = self.pixel_compatible_impl(hit, ldir, pd, trace.as_deref_mut())?;
        if let Some(trace) = trace {
            trace.det_id = Some(hit.det_id);
            trace.compatible = compatible;
            let p = &hit.local_position;
            trace.local_position = [p.x, p.y, p.z];
            trace.local_direction = [ldir.x, ldir.y, ldir.z];
        }
        Ok(compatible)
    }

    fn pixel_compatible_impl(
        &self,
        hit: &PixelRecHit,
        ldir: &LocalVector,
        pd: Option<&PixelData>,
        mut trace: Option<&mut PixelTrace>,
    ) -> Result<bool> {
        if self.cut_on_pixel_charge {
            let pd = self.pixel_data(hit, pd)?;
            let q = self.charge.pixel_charge_per_cm(&pd.det, hit, ldir);
            if q <= self.min_good_pixel_charge {
                return Ok(false);
            }
        }
        if !self.cut_on_pixel_shape {
            return Ok(true);
        }

        let pd = self.pixel_data(hit, pd)?;
        let sizes = measure_pixel(hit, ldir, pd);

        if let Some(trace) = trace.as_deref_mut() {
            let shape = &hit.shape;
            trace.part = pd.part;
            trace.drift = [pd.drift.0, pd.drift.1];
            trace.cotangent = [pd.cotangent.0, pd.cotangent.1];
            trace.is_straight = shape.is_straight;
            trace.is_complete = shape.is_complete;
            trace.has_big_pixels_only_inside = shape.has_big_pixels_only_inside;
            trace.usable = sizes.usable;
            trace.cluster_sizes = shape.sizes.iter().map(|&(dx, dy)| [dx, dy]).collect();
            trace.pred = [sizes.pred.0, sizes.pred.1];
        }

        if !sizes.usable {
            return Ok(true);
        }

        if let Some(trace) = trace {
            trace.has_pred_inside_limits = false;
            trace.has_invalid_key = false;
            for &(dx, dy) in &sizes.sizes {
                let key = PixelKey::new(sizes.part, dx, dy);
                let mut result = LimitResult {
                    limit_key: key.into(),
                    limit_key_valid: key.is_valid(),
                    ..Default::default()
                };
                if key.is_valid() {
                    let limits = &self.pixel_limits[key];
                    result.pred_inside_limits = limits.is_inside(sizes.pred);
                    result.limits = [limits.limit(0), limits.limit(1)];
                    trace.has_pred_inside_limits |= result.pred_inside_limits;
                } else {
                    trace.has_invalid_key = true;
                }
                trace.limits.push(result);
            }
        }

        Ok(self.pixel_sizes_compatible(&sizes))
    }

    fn pixel_sizes_compatible(&self, sizes: &PixelSizes) -> bool {
        if sizes.sizes.is_empty() {
            return true;
        }
        for &(dx, dy) in &sizes.sizes {
            let key = PixelKey::new(sizes.part, dx, dy);
            // an unknown shape is never held against the hit, even when
            // another entry of the same cluster has calibrated limits
            if !key.is_valid() {
                return true;
            }
            if self.pixel_limits[key].is_inside(sizes.pred) {
                return true;
            }
        }
        // none of the choices worked
        false
    }

    // ---- strip ----

    /// Measured width and corrected prediction of a strip cluster
    pub fn strip_sizes(
        &self,
        det_id: DetId,
        cluster: &StripCluster,
        lpos: &LocalPoint,
        ldir: &LocalVector,
    ) -> Result<StripSizes> {
        let sd = self.geometry.strip(det_id)?;
        Ok(measure_strip(sd, cluster, lpos, ldir))
    }

    pub fn is_compatible_strip(
        &self,
        det_id: DetId,
        cluster: &StripCluster,
        lpos: &LocalPoint,
        ldir: &LocalVector,
    ) -> Result<bool> {
        let sd = self.geometry.strip(det_id)?;

        if self.cut_on_strip_charge {
            let q = self.charge.strip_charge_per_cm(&sd.det, cluster, ldir);
            if q <= self.min_good_strip_charge {
                return Ok(false);
            }
        }
        if !self.cut_on_strip_shape {
            return Ok(true);
        }

        let sizes = measure_strip(sd, cluster, lpos, ldir);
        if sizes.usable {
            let key = StripKey::new(sizes.width);
            if key.is_valid() {
                return Ok(self.strip_limits[key].is_inside(sizes.pred));
            }
        }

        // not usable or no limits
        Ok(true)
    }

    /// Local direction only; the prediction is taken at the element origin
    pub fn is_compatible_strip_dir(
        &self,
        det_id: DetId,
        cluster: &StripCluster,
        ldir: &LocalVector,
    ) -> Result<bool> {
        self.is_compatible_strip(det_id, cluster, &LocalPoint::origin(), ldir)
    }

    /// Global position and direction; the position is moved along the
    /// direction onto the sensor mid-plane
    pub fn is_compatible_strip_global(
        &self,
        det_id: DetId,
        cluster: &StripCluster,
        gpos: &GlobalPoint,
        gdir: &GlobalVector,
    ) -> Result<bool> {
        let surface = &self.geometry.strip(det_id)?.det.surface;
        let ldir = surface.to_local_vector(gdir);
        let mut lpos = surface.to_local_point(gpos);
        lpos -= ldir * (lpos.z / ldir.z);
        self.is_compatible_strip(det_id, cluster, &lpos, &ldir)
    }

    pub fn is_compatible_strip_global_dir(
        &self,
        det_id: DetId,
        cluster: &StripCluster,
        gdir: &GlobalVector,
    ) -> Result<bool> {
        let ldir = self.geometry.strip(det_id)?.det.surface.to_local_vector(gdir);
        self.is_compatible_strip_dir(det_id, cluster, &ldir)
    }
}

fn measure_pixel(hit: &PixelRecHit, ldir: &LocalVector, pd: &PixelData) -> PixelSizes {
    let shape = &hit.shape;
    let mut pred = (ldir.x / ldir.z, ldir.y / ldir.z);
    let mut sizes = shape.sizes.clone();

    if shape.sizes.first().is_some_and(|&(_, dy)| dy < 0) {
        pred.1 = -pred.1;
        for size in &mut sizes {
            size.1 = -size.1;
        }
    }

    // take out drift, then apply cotangent
    pred.0 = (pred.0 + pd.drift.0) * pd.cotangent.0;
    pred.1 = (pred.1 + pd.drift.1) * pd.cotangent.1;

    PixelSizes {
        usable: shape.is_usable(),
        part: pd.part,
        sizes,
        pred,
    }
}

fn measure_strip(
    sd: &StripData,
    cluster: &StripCluster,
    lpos: &LocalPoint,
    ldir: &LocalVector,
) -> StripSizes {
    let width = cluster.width();
    let first_strip = cluster.first_strip as i32;
    let nstrips = sd.det.topology.nstrips() as i32;
    let usable = width > 0 && first_strip >= 1 && first_strip + width - 1 <= nstrips;

    let pred = (ldir.x / ldir.z + sd.drift) * sd.cotangent(lpos);

    StripSizes {
        usable,
        width,
        pred,
    }
}
