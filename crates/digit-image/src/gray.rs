use {crate::*, digit_base::Vec2};

/// Reduce a frame to one 8-bit intensity per pixel.
///
/// For the packed 4:2:2 formats this keeps the Y samples and drops U/V.
/// Trailing bytes beyond one packed frame are ignored.
pub fn to_gray(size: Vec2<usize>, data: &[u8], format: PixelFormat) -> Result<Vec<u8>, ImageError> {
    format.ensure_frame(size, data)?;
    let pixel_count = size.area();
    let gray = match format {
        PixelFormat::Uyvy => data[..pixel_count * 2]
            .chunks_exact(2)
            .map(|pair| pair[1])
            .collect(),
        PixelFormat::Yuyv => data[..pixel_count * 2]
            .chunks_exact(2)
            .map(|pair| pair[0])
            .collect(),
        PixelFormat::Gray8 => data[..pixel_count].to_vec(),
    };
    Ok(gray)
}
