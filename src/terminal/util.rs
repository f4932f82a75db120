//! Terminal geometry utilities

/// Convert a widget's pixel size to a grid size
///
/// The grid never drops below `min_cols` x `min_rows`; a zero cell size
/// yields the minimum.
pub fn grid_size_from_pixels(
    width: u32,
    height: u32,
    cell_width: u32,
    cell_height: u32,
    min_cols: u16,
    min_rows: u16,
) -> (u16, u16) {
    let fit = |pixels: u32, cell: u32, min: u16| -> u16 {
        if cell == 0 {
            return min.max(1);
        }
        let count = (pixels / cell).min(u16::MAX as u32) as u16;
        count.max(min).max(1)
    };

    (
        fit(width, cell_width, min_cols),
        fit(height, cell_height, min_rows),
    )
}
