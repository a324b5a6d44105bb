use crate::error::Result;
use crate::grid::Grid;
use crate::par_slice;

/// Write the grid as an RGB PNG, one pixel per cell, TURBO colored.
/// Values are scaled so the smallest cell is 0 and the largest is 1.
pub fn write_png<F: AsRef<std::path::Path>>(grid: &Grid, path: &F) -> Result<()> {
    let n = grid.n();
    let (lo, hi) =
        par_slice::min_max(grid.data(), n.max(1024)).unwrap_or((0.0, 0.0));
    let range = hi - lo;
    let gradient = colorous::TURBO;
    let mut img = image::RgbImage::new(n as u32, n as u32);
    for (l, v) in grid.data().iter().enumerate() {
        let r = if range > 0.0 { (v - lo) / range } else { 0.5 };
        let c = gradient.eval_continuous(r);
        img.put_pixel((l % n) as u32, (l / n) as u32, image::Rgb(c.as_array()));
    }
    img.save(path)?;
    Ok(())
}
