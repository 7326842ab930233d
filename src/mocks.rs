use crate::errors::{BgRemoveError, Result};
use crate::imageops::apply_alpha_mask;
use crate::traits::ImageSegmentationModel;
use image::{DynamicImage, GrayImage, Luma};

/// テスト用のモックセグメンテーションモデル
///
/// 左上の画素に近い色を背景とみなして透明にする。結果は入力だけで決まる。
#[derive(Debug, Clone)]
pub struct MockSegmentationModel {
    pub tolerance: u8,
}

impl MockSegmentationModel {
    pub const fn new(tolerance: u8) -> Self {
        Self { tolerance }
    }
}

impl Default for MockSegmentationModel {
    fn default() -> Self {
        Self::new(16)
    }
}

impl ImageSegmentationModel for MockSegmentationModel {
    fn segment_image(&self, img: &DynamicImage) -> Result<DynamicImage> {
        let rgb = img.to_rgb8();
        let Some(background) = rgb.pixels().next().copied() else {
            return Err(BgRemoveError::segmentation("image has no pixels"));
        };

        let mask = GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
            let pixel = rgb.get_pixel(x, y);
            let is_background = pixel
                .0
                .iter()
                .zip(background.0.iter())
                .all(|(a, b)| a.abs_diff(*b) <= self.tolerance);
            Luma([if is_background { 0 } else { u8::MAX }])
        });

        Ok(DynamicImage::ImageRgba8(apply_alpha_mask(&rgb, &mask)?))
    }
}

/// 常に失敗するモデル（エラー経路のテスト用）
#[derive(Debug, Clone, Default)]
pub struct FailingSegmentationModel;

impl ImageSegmentationModel for FailingSegmentationModel {
    fn segment_image(&self, _img: &DynamicImage) -> Result<DynamicImage> {
        Err(BgRemoveError::segmentation("mock model always fails"))
    }
}

/// テスト用のファクトリー関数
pub const fn create_mock_model() -> MockSegmentationModel {
    MockSegmentationModel::new(16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    #[test]
    fn test_mock_model_segment_image() -> Result<()> {
        let mock = create_mock_model();
        let mut img = RgbImage::from_pixel(10, 10, Rgb([255, 255, 255]));
        img.put_pixel(5, 5, Rgb([200, 0, 0]));
        let test_image = DynamicImage::ImageRgb8(img);

        let result = mock.segment_image(&test_image)?;
        assert_eq!(result.dimensions(), test_image.dimensions());

        let rgba = result.to_rgba8();
        assert_eq!(rgba.get_pixel(0, 0).0[3], 0);
        assert_eq!(rgba.get_pixel(5, 5).0, [200, 0, 0, 255]);
        Ok(())
    }

    #[test]
    fn test_mock_model_empty_image() {
        let mock = create_mock_model();
        let empty = DynamicImage::ImageRgb8(RgbImage::new(0, 0));

        assert!(mock.segment_image(&empty).is_err());
    }

    #[test]
    fn test_failing_model() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(1, 1));
        let err = FailingSegmentationModel.segment_image(&img).unwrap_err();

        assert!(matches!(err, BgRemoveError::Segmentation { .. }));
    }
}
