use crate::constants::{DEFAULT_LIMIT, PIXEL_N, STRIP_N};
use crate::error::{ClusterShapeError, Result};
use crate::keys::{PixelKey, StripKey};

use log::{debug, trace};
use serde::Serialize;
use std::io::Read;
use std::ops::Index;
use std::path::Path;
use std::str::{FromStr, SplitWhitespace};

pub const PIXEL_TABLE_SIZE: usize = PIXEL_N + 1;
pub const STRIP_TABLE_SIZE: usize = STRIP_N + 1;

/// Two rectangular acceptance regions in predicted-offset space.
///
/// `data[branch][axis][bound]` with axis 0 = x, 1 = y and bound 0 = low,
/// 1 = high. Intervals are open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelLimits {
    pub data: [[[f32; 2]; 2]; 2],
}

impl Default for PixelLimits {
    fn default() -> Self {
        let axis = [-DEFAULT_LIMIT, DEFAULT_LIMIT];
        Self {
            data: [[axis, axis], [axis, axis]],
        }
    }
}

impl PixelLimits {
    pub fn is_inside(&self, pred: (f32, f32)) -> bool {
        self.data.iter().any(|branch| {
            let [x, y] = branch;
            pred.0 > x[0] && pred.0 < x[1] && pred.1 > y[0] && pred.1 < y[1]
        })
    }

    /// Bounds of one branch as (low, high) corners
    pub fn limit(&self, branch: usize) -> Limit2D {
        let [x, y] = self.data[branch];
        Limit2D {
            low: [x[0], y[0]],
            high: [x[1], y[1]],
        }
    }
}

/// Rectangle corners of one pixel acceptance branch
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Limit2D {
    pub low: [f32; 2],
    pub high: [f32; 2],
}

/// Two open intervals of predicted width, `data[branch][bound]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StripLimits {
    pub data: [[f32; 2]; 2],
}

impl Default for StripLimits {
    fn default() -> Self {
        let interval = [-DEFAULT_LIMIT, DEFAULT_LIMIT];
        Self {
            data: [interval, interval],
        }
    }
}

impl StripLimits {
    pub fn is_inside(&self, pred: f32) -> bool {
        self.data
            .iter()
            .any(|limit| pred > limit[0] && pred < limit[1])
    }
}

/// Pixel limits for every key, loaded once from a calibration resource
#[derive(Debug, Clone)]
pub struct PixelLimitsCollection {
    limits: [PixelLimits; PIXEL_TABLE_SIZE],
}

impl PixelLimitsCollection {
    /// Reads a pixel calibration file
    ///
    /// # Errors
    /// Returns error if the file cannot be opened or a record is malformed
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = read_resource(path)?;
        let collection = Self::parse(&content, &path.display().to_string())?;
        debug!("pixel-cluster-shape filter loaded from {}", path.display());
        Ok(collection)
    }

    /// Reads pixel records from any reader; `origin` only labels errors
    pub fn from_reader<R: Read>(mut reader: R, origin: &str) -> Result<Self> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        Self::parse(&content, origin)
    }

    fn parse(content: &str, origin: &str) -> Result<Self> {
        let mut limits = [PixelLimits::default(); PIXEL_TABLE_SIZE];
        let mut tokens = Tokens::new(content, origin);

        while let Some(part) = tokens.first::<i32>("part")? {
            let dx: i32 = tokens.next("dx")?;
            let dy: i32 = tokens.next("dy")?;
            let part = if part == 0 { 0 } else { 1 };
            let key = PixelKey::new(part, dx, dy);
            if !key.is_valid() {
                trace!(
                    "{origin}: record {} ({part},{dx},{dy}) keyed to the invalid slot",
                    tokens.record
                );
            }

            let pl = &mut limits[key.index()];
            for branch in 0..2 {
                for axis in 0..2 {
                    for bound in 0..2 {
                        pl.data[branch][axis][bound] = tokens.next("limit")?;
                    }
                }
            }

            // provenance only: density and point count per branch
            let _: f64 = tokens.next("density")?;
            let _: i64 = tokens.next("points")?;
            let _: f64 = tokens.next("density")?;
            let _: i64 = tokens.next("points")?;
        }

        debug!("{origin}: {} pixel limit records", tokens.record);
        Ok(Self { limits })
    }

    /// Bounds-checked access by raw index
    pub fn get(&self, index: usize) -> Result<&PixelLimits> {
        self.limits.get(index).ok_or(ClusterShapeError::KeyOutOfRange {
            index,
            size: PIXEL_TABLE_SIZE,
        })
    }

    pub fn size(&self) -> usize {
        self.limits.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PixelLimits> {
        self.limits.iter()
    }
}

impl Default for PixelLimitsCollection {
    fn default() -> Self {
        Self {
            limits: [PixelLimits::default(); PIXEL_TABLE_SIZE],
        }
    }
}

impl Index<PixelKey> for PixelLimitsCollection {
    type Output = PixelLimits;

    fn index(&self, key: PixelKey) -> &PixelLimits {
        // every key, including the invalid one, has a slot
        &self.limits[key.index()]
    }
}

/// Strip limits for every width key
#[derive(Debug, Clone)]
pub struct StripLimitsCollection {
    limits: [StripLimits; STRIP_TABLE_SIZE],
}

impl StripLimitsCollection {
    /// Reads a strip calibration file
    ///
    /// # Errors
    /// Returns error if the file cannot be opened or a record is malformed
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = read_resource(path)?;
        let collection = Self::parse(&content, &path.display().to_string())?;
        debug!("strip-cluster-width filter loaded from {}", path.display());
        Ok(collection)
    }

    pub fn from_reader<R: Read>(mut reader: R, origin: &str) -> Result<Self> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        Self::parse(&content, origin)
    }

    fn parse(content: &str, origin: &str) -> Result<Self> {
        let mut limits = [StripLimits::default(); STRIP_TABLE_SIZE];
        let mut tokens = Tokens::new(content, origin);

        while let Some(width) = tokens.first::<i32>("width")? {
            let key = StripKey::new(width);
            if !key.is_valid() {
                trace!(
                    "{origin}: record {} (width {width}) keyed to the invalid slot",
                    tokens.record
                );
            }

            let sl = &mut limits[key.index()];
            for branch in 0..2 {
                for bound in 0..2 {
                    sl.data[branch][bound] = tokens.next("limit")?;
                }
            }
        }

        debug!("{origin}: {} strip limit records", tokens.record);
        Ok(Self { limits })
    }

    pub fn get(&self, index: usize) -> Result<&StripLimits> {
        self.limits.get(index).ok_or(ClusterShapeError::KeyOutOfRange {
            index,
            size: STRIP_TABLE_SIZE,
        })
    }

    pub fn size(&self) -> usize {
        self.limits.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StripLimits> {
        self.limits.iter()
    }
}

impl Default for StripLimitsCollection {
    fn default() -> Self {
        Self {
            limits: [StripLimits::default(); STRIP_TABLE_SIZE],
        }
    }
}

impl Index<StripKey> for StripLimitsCollection {
    type Output = StripLimits;

    fn index(&self, key: StripKey) -> &StripLimits {
        &self.limits[key.index()]
    }
}

fn read_resource(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| ClusterShapeError::OpenCalibration {
        path: path.to_path_buf(),
        source,
    })
}

/// Whitespace-separated record reader with record numbering for errors
struct Tokens<'a> {
    iter: SplitWhitespace<'a>,
    origin: &'a str,
    record: usize,
}

impl<'a> Tokens<'a> {
    fn new(content: &'a str, origin: &'a str) -> Self {
        Self {
            iter: content.split_whitespace(),
            origin,
            record: 0,
        }
    }

    /// First field of a record; `None` at end of input
    fn first<T: FromStr>(&mut self, field: &'static str) -> Result<Option<T>> {
        match self.iter.next() {
            None => Ok(None),
            Some(token) => {
                self.record += 1;
                self.parse(token, field).map(Some)
            }
        }
    }

    fn next<T: FromStr>(&mut self, field: &'static str) -> Result<T> {
        let token = self
            .iter
            .next()
            .ok_or_else(|| ClusterShapeError::TruncatedRecord {
                origin: self.origin.to_string(),
                record: self.record,
                field,
            })?;
        self.parse(token, field)
    }

    fn parse<T: FromStr>(&self, token: &str, field: &'static str) -> Result<T> {
        token
            .parse()
            .map_err(|_| ClusterShapeError::CalibrationParse {
                origin: self.origin.to_string(),
                record: self.record,
                field,
                value: token.to_string(),
            })
    }
}
