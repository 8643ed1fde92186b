/// Pixel key space (barrel packing first, endcap packing after it)
pub const PIXEL_N_BARREL: usize = 137;
pub const PIXEL_N_ENDCAP: usize = 55;
pub const PIXEL_N: usize = PIXEL_N_BARREL + PIXEL_N_ENDCAP;

/// Strip key space (width 1..=40)
pub const STRIP_N: usize = 40;

/// Unloaded limits span the whole real line on every axis
pub const DEFAULT_LIMIT: f32 = f32::INFINITY;

/// Calibration resource names
pub const DEFAULT_PIXEL_SHAPE_FILE: &str = "pixelShape.par";
pub const STRIP_SHAPE_FILE: &str = "stripShape.par";

/// Search path for calibration resources given by relative name
pub const ENV_DATA_DIR: &str = "CLUSTER_SHAPE_DATA_DIR";
pub const BUNDLED_DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data");

/// Subdetector part index used by the pixel key
pub const PART_BARREL: u32 = 0;
pub const PART_ENDCAP: u32 = 1;
