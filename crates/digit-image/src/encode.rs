use {crate::*, crates_image::ImageEncoder, digit_base::Vec2};

/// Encode an 8-bit gray grid as PNG.
pub fn encode_gray_png(size: Vec2<usize>, gray: &[u8]) -> Result<Vec<u8>, ImageError> {
    PixelFormat::Gray8.ensure_frame(size, gray)?;
    let mut buffer = Vec::new();
    let encoder = crates_image::codecs::png::PngEncoder::new(&mut buffer);
    encoder.write_image(
        &gray[..size.area()],
        size.x as u32,
        size.y as u32,
        crates_image::ExtendedColorType::L8,
    )?;
    Ok(buffer)
}
