use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use redact_core::mosaic::domain::coordinate_mapper::PixelRect;
use redact_core::mosaic::domain::region::Region;
use redact_core::shared::normalized_rect::NormalizedRect;

/// Parses `x,y,w,h` in normalized top-left units.
pub fn parse_rect(s: &str) -> Result<NormalizedRect, String> {
    let [x, y, w, h] = split_four::<f64>(s)?;
    NormalizedRect::new(x, y, w, h).map_err(|e| e.to_string())
}

/// Parses `x,y,w,h` in top-left pixel units.
pub fn parse_pixel_rect(s: &str) -> Result<PixelRect, String> {
    let [x, y, width, height] = split_four::<u32>(s)?;
    Ok(PixelRect {
        x,
        y,
        width,
        height,
    })
}

fn split_four<T: std::str::FromStr>(s: &str) -> Result<[T; 4], String>
where
    T::Err: std::fmt::Display,
{
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(format!("expected x,y,w,h, got '{s}'"));
    }
    let mut values = Vec::with_capacity(4);
    for part in parts {
        values.push(part.parse::<T>().map_err(|e| format!("'{part}': {e}"))?);
    }
    values
        .try_into()
        .map_err(|_| format!("expected x,y,w,h, got '{s}'"))
}

/// Reads a JSON array of regions, e.g.
/// `[{"rect": {"x": 0.1, "y": 0.1, "width": 0.2, "height": 0.1}, "active": false}]`.
pub fn load_regions_file(path: &Path) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
    let file = File::open(path)
        .map_err(|e| format!("Cannot open regions file {}: {e}", path.display()))?;
    let regions: Vec<Region> = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| format!("Invalid regions file {}: {e}", path.display()))?;
    Ok(regions)
}
