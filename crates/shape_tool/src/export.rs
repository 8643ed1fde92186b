use anyhow::{Context, Result};
use chrono::Local;
use cluster_shape::{PixelKey, PixelLimitsCollection, StripKey, StripLimitsCollection};
use csv::{Writer, WriterBuilder};
use std::{
    collections::HashMap,
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

const PIXEL_HEADER: [&str; 13] = [
    "Slot", "Part", "Dx", "Dy", "X0Low", "X0High", "Y0Low", "Y0High", "X1Low", "X1High", "Y1Low",
    "Y1High", "Valid",
];

const STRIP_HEADER: [&str; 7] = ["Slot", "Width", "Low0", "High0", "Low1", "High1", "Valid"];

/// Writes both tables as `pixel_limits_<timestamp>.csv` and
/// `strip_limits_<timestamp>.csv`, returning the two paths
pub fn export_tables_to_csv(
    pixel: &PixelLimitsCollection,
    strip: &StripLimitsCollection,
    output_dir: Option<&Path>,
) -> Result<(PathBuf, PathBuf)> {
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }
    let target = |name: String| match output_dir {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    };

    let pixel_path = target(format!("pixel_limits_{timestamp}.csv"));
    write_pixel_table(pixel, create_writer(&pixel_path)?)?;

    let strip_path = target(format!("strip_limits_{timestamp}.csv"));
    write_strip_table(strip, create_writer(&strip_path)?)?;

    Ok((pixel_path, strip_path))
}

fn create_writer(path: &Path) -> Result<Writer<BufWriter<File>>> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create file {}", path.display()))?;

    #[allow(unused_mut)]
    let mut builder = WriterBuilder::new();
    #[cfg(windows)]
    {
        use csv::Terminator;
        builder = builder.terminator(Terminator::CRLF);
    }
    Ok(builder.from_writer(BufWriter::new(file)))
}

/// Slot index to the `(part, dx, dy)` it was packed from
fn pixel_slot_shapes() -> HashMap<usize, (u32, i32, i32)> {
    let mut shapes = HashMap::new();
    for part in 0..2 {
        for dx in 0..=10 {
            for dy in 0..=15 {
                let key = PixelKey::new(part, dx, dy);
                if key.is_valid() {
                    shapes.insert(key.index(), (part, dx, dy));
                }
            }
        }
    }
    shapes
}

fn write_pixel_table<W: std::io::Write>(
    table: &PixelLimitsCollection,
    mut wtr: Writer<W>,
) -> Result<()> {
    let shapes = pixel_slot_shapes();
    wtr.write_record(PIXEL_HEADER)?;

    for (slot, limits) in table.iter().enumerate() {
        let mut row = match shapes.get(&slot) {
            Some((part, dx, dy)) => vec![
                slot.to_string(),
                part.to_string(),
                dx.to_string(),
                dy.to_string(),
            ],
            None => vec![slot.to_string(), String::new(), String::new(), String::new()],
        };
        for branch in limits.data {
            for axis in branch {
                row.extend(axis.iter().map(|v| v.to_string()));
            }
        }
        row.push((slot < PixelKey::N).to_string());
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

fn write_strip_table<W: std::io::Write>(
    table: &StripLimitsCollection,
    mut wtr: Writer<W>,
) -> Result<()> {
    wtr.write_record(STRIP_HEADER)?;

    for (slot, limits) in table.iter().enumerate() {
        let valid = slot < StripKey::N;
        let width = if valid { (slot + 1).to_string() } else { String::new() };
        let mut row = vec![slot.to_string(), width];
        for branch in limits.data {
            row.extend(branch.iter().map(|v| v.to_string()));
        }
        row.push(valid.to_string());
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}
