use std::path::Path;

use anyhow::Context;
use ash::vk;
use ravel_renderer::settings::linear_to_srgb;

/// 线性 HDR 像素 -> 8bit sRGB
pub fn to_rgba8(pixels: &[glam::Vec4], extent: vk::Extent2D) -> anyhow::Result<image::RgbaImage> {
    let bytes = pixels
        .iter()
        .flat_map(|texel| {
            let srgb = linear_to_srgb(texel.truncate()) * 255.0;
            [srgb.x, srgb.y, srgb.z, 255.0].map(|c| c.round().clamp(0.0, 255.0) as u8)
        })
        .collect::<Vec<_>>();

    image::RgbaImage::from_raw(extent.width, extent.height, bytes)
        .with_context(|| format!("pixel count does not match {}x{}", extent.width, extent.height))
}

pub fn save_png(pixels: &[glam::Vec4], extent: vk::Extent2D, path: &Path) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("create output dir {}", dir.display()))?;
    }
    to_rgba8(pixels, extent)?
        .save(path)
        .with_context(|| format!("save image to {}", path.display()))?;
    log::info!("image saved: {}", path.display());
    Ok(())
}
