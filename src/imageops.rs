use anyhow::{anyhow, ensure, Result};
use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage, RgbaImage};

/// マスクをアルファチャンネルとして RGB 画像に合成する
///
/// マスクの 0 が完全な透明（背景）、255 が不透明（前景）になる。
pub fn apply_alpha_mask(image: &RgbImage, mask: &GrayImage) -> Result<RgbaImage> {
    ensure!(
        image.dimensions() == mask.dimensions(),
        "Image and mask dimensions do not match: image {}x{}, mask {}x{}",
        image.width(),
        image.height(),
        mask.width(),
        mask.height()
    );

    let processed_pixels = image
        .pixels()
        .zip(mask.pixels())
        .flat_map(|(&Rgb([red, green, blue]), &Luma([alpha]))| [red, green, blue, alpha])
        .collect::<Vec<u8>>();

    ImageBuffer::from_raw(image.width(), image.height(), processed_pixels)
        .ok_or_else(|| anyhow!("Failed to create ImageBuffer from processed pixels"))
}

/// 予測値を min-max 正規化して 0..=255 の輝度に変換する
///
/// 全ての値が同じ場合は区別がつかないので全面を前景扱いにする。
pub fn normalize_mask(values: &[f32]) -> Vec<u8> {
    let (min, max) = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;

    if !range.is_finite() || range <= f32::EPSILON {
        return vec![u8::MAX; values.len()];
    }

    values
        .iter()
        .map(|&v| {
            let v = if v.is_finite() { v } else { min };
            (((v - min) / range) * 255.0).round().clamp(0.0, 255.0) as u8
        })
        .collect()
}

/// 行優先で並んだ予測値からマスク画像を作る
pub fn mask_from_values(values: &[f32], width: u32, height: u32) -> Result<GrayImage> {
    GrayImage::from_raw(width, height, normalize_mask(values)).ok_or_else(|| {
        anyhow!(
            "Mask has {} values, expected {}x{}",
            values.len(),
            width,
            height
        )
    })
}
