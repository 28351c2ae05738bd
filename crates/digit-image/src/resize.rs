use {
    crate::*,
    digit_base::{Rect, Vec2},
};

/// Crop `rect` out of a gray frame and area-resize it to `dst_size`.
///
/// Each output pixel is the rounded mean of the source pixels its cell
/// covers, computed in integer arithmetic so the result is bit-exact across
/// platforms. When upscaling, a cell covers at least one source pixel.
pub fn crop_resize(
    size: Vec2<usize>,
    gray: &[u8],
    rect: Rect<usize>,
    dst_size: Vec2<usize>,
) -> Result<Vec<u8>, ImageError> {
    PixelFormat::Gray8.ensure_frame(size, gray)?;
    if rect.is_empty() {
        return Err(ImageError::Region(format!("empty crop region {:?}", rect)));
    }
    if !rect.fits_in(size) {
        return Err(ImageError::Region(format!(
            "crop region {:?} exceeds {}x{} frame",
            rect, size.x, size.y
        )));
    }
    if dst_size.x == 0 || dst_size.y == 0 {
        return Err(ImageError::Region(format!(
            "empty output size {}x{}",
            dst_size.x, dst_size.y
        )));
    }

    let span = |out: usize, src_len: usize, dst_len: usize| {
        let start = out * src_len / dst_len;
        let end = ((out + 1) * src_len / dst_len).max(start + 1);
        (start, end)
    };

    let mut out = Vec::with_capacity(dst_size.area());
    for oy in 0..dst_size.y {
        let (y0, y1) = span(oy, rect.size.y, dst_size.y);
        for ox in 0..dst_size.x {
            let (x0, x1) = span(ox, rect.size.x, dst_size.x);
            let mut sum = 0u64;
            for y in y0..y1 {
                let row = (rect.origin.y + y) * size.x + rect.origin.x;
                sum += gray[row + x0..row + x1]
                    .iter()
                    .map(|&v| v as u64)
                    .sum::<u64>();
            }
            let count = ((y1 - y0) * (x1 - x0)) as u64;
            out.push(((sum + count / 2) / count) as u8);
        }
    }
    Ok(out)
}
