use std::path::Path;

use crate::{
    errors::{BgRemoveError, Result},
    imageops::{apply_alpha_mask, mask_from_values},
    traits::ImageSegmentationModel,
};
use image::{
    imageops, imageops::FilterType, DynamicImage, GenericImageView, GrayImage, RgbImage,
};
use ndarray::prelude::*;
use ort::value::TensorRef;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::{builder::SessionBuilder, Session},
};
use parking_lot::Mutex;

/// モデルの系統ごとの前処理パラメータ
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelProfile {
    pub mean: [f32; 3],
    pub std: [f32; 3],
    /// 入力サイズが動的なモデルで使う一辺の長さ
    pub fallback_size: u32,
}

impl ModelProfile {
    /// U2-Net 系（ImageNet の平均・分散、320x320 で学習）
    pub const U2NET: Self = Self {
        mean: [0.485, 0.456, 0.406],
        std: [0.229, 0.224, 0.225],
        fallback_size: 320,
    };

    /// ISNet 系（平均 0.5・分散 1.0、1024x1024 で学習）
    pub const ISNET: Self = Self {
        mean: [0.5, 0.5, 0.5],
        std: [1.0, 1.0, 1.0],
        fallback_size: 1024,
    };
}

impl Default for ModelProfile {
    fn default() -> Self {
        Self::U2NET
    }
}

fn model_error<E>(operation: &str, source: E) -> BgRemoveError
where
    E: std::error::Error + Send + Sync + 'static,
{
    BgRemoveError::segmentation_caused_by(format!("{}: {}", operation, source), source)
}

/// ONNX Runtime で動く顕著物体検出モデル（U2-Net / ISNet 系）
pub struct Model {
    pub image_size: u32,
    profile: ModelProfile,
    session: Mutex<Session>,
}

impl Model {
    pub fn new(model_path: &Path, device_id: i32) -> Result<Self> {
        Self::with_profile(model_path, device_id, ModelProfile::default())
    }

    pub fn with_profile(model_path: &Path, device_id: i32, profile: ModelProfile) -> Result<Self> {
        let load_operation = format!("モデルファイル読み込み ({})", model_path.display());
        if !model_path.is_file() {
            return Err(model_error(
                &load_operation,
                std::io::Error::new(std::io::ErrorKind::NotFound, "model file does not exist"),
            ));
        }

        let mut session = SessionBuilder::new()
            .map_err(|e| model_error("セッションビルダー初期化", e))?
            .with_execution_providers([
                TensorRTExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
                CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
            ])
            .map_err(|e| model_error("実行プロバイダー設定", e))?
            .with_memory_pattern(true)
            .map_err(|e| model_error("メモリパターン設定", e))?
            .commit_from_file(model_path)
            .map_err(|e| model_error(&load_operation, e))?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| BgRemoveError::segmentation("model has no inputs"))?;
        // NCHW の H。動的次元は -1 になる
        let image_size = input
            .input_type
            .tensor_shape()
            .and_then(|shape| shape.get(2).copied())
            .filter(|&dim| dim > 0)
            .map_or(profile.fallback_size, |dim| dim as u32);

        // initialize model
        let data = Array4::<f32>::zeros((1, 3, image_size as usize, image_size as usize));
        session
            .run(ort::inputs![TensorRef::from_array_view(&data)
                .map_err(|e| model_error("初期化テンソル作成", e))?])
            .map_err(|e| model_error("モデル初期化実行", e))?;

        log::info!(
            "loaded model {} (input {}x{})",
            model_path.display(),
            image_size,
            image_size
        );

        Ok(Self {
            image_size,
            profile,
            session: Mutex::new(session),
        })
    }

    /// テンソル予測（低レベルAPI）。最初の出力を NCHW のまま返す
    pub fn predict(&self, tensor: ArrayView4<f32>) -> Result<Array4<f32>> {
        let mut binding = self.session.lock();
        let output_name = binding
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| BgRemoveError::segmentation("model has no outputs"))?;
        let outputs =
            binding.run(ort::inputs![TensorRef::from_array_view(&tensor.as_standard_layout())?])?;
        let prediction = outputs[output_name.as_str()]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix4>()?
            .to_owned();
        Ok(prediction)
    }
}

impl ImageSegmentationModel for Model {
    fn segment_image(&self, img: &DynamicImage) -> Result<DynamicImage> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(BgRemoveError::segmentation("image has no pixels"));
        }

        let rgb_img = img.to_rgb8();
        let tensor = preprocess(&rgb_img, self.image_size, &self.profile);
        let prediction = self.predict(tensor.view())?;
        let mask = postprocess_mask(prediction, width, height)?;

        log::debug!("mask computed for {}x{} image", width, height);

        Ok(DynamicImage::ImageRgba8(apply_alpha_mask(&rgb_img, &mask)?))
    }
}

/// リサイズして平均・分散で正規化した 1x3xSxS のテンソルを作る
pub fn preprocess(image: &RgbImage, image_size: u32, profile: &ModelProfile) -> Array4<f32> {
    let resized = imageops::resize(image, image_size, image_size, FilterType::Lanczos3);
    let max = resized
        .as_raw()
        .iter()
        .copied()
        .max()
        .unwrap_or(u8::MAX)
        .max(1) as f32;

    let size = image_size as usize;
    Array4::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
        let value = resized.get_pixel(x as u32, y as u32).0[c] as f32 / max;
        (value - profile.mean[c]) / profile.std[c]
    })
}

/// 予測の最初のチャンネルを正規化し、元画像のサイズに戻す
pub fn postprocess_mask(prediction: Array4<f32>, width: u32, height: u32) -> Result<GrayImage> {
    let (batch, channels, _, _) = prediction.dim();
    if batch == 0 || channels == 0 {
        return Err(BgRemoveError::segmentation(format!(
            "model output has no mask channel (shape {:?})",
            prediction.shape()
        )));
    }

    let channel = prediction.slice(s![0, 0, .., ..]);
    let (mask_height, mask_width) = channel.dim();
    let values = channel.iter().copied().collect::<Vec<f32>>();

    let mask = mask_from_values(&values, mask_width as u32, mask_height as u32)?;
    Ok(imageops::resize(&mask, width, height, FilterType::Lanczos3))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_missing_model_file() {
        let result = Model::new(Path::new("definitely/not/here.onnx"), 0);
        let err = result.err().expect("missing model file must fail");

        assert!(matches!(err, BgRemoveError::Segmentation { .. }));
        assert!(err.to_string().contains("here.onnx"));
    }

    #[test]
    fn test_preprocess_shape_and_normalization() {
        let image = RgbImage::from_pixel(40, 20, Rgb([255, 255, 255]));
        let tensor = preprocess(&image, 32, &ModelProfile::U2NET);

        assert_eq!(tensor.shape(), &[1, 3, 32, 32]);
        for c in 0..3 {
            let expected = (1.0 - ModelProfile::U2NET.mean[c]) / ModelProfile::U2NET.std[c];
            assert!((tensor[[0, c, 0, 0]] - expected).abs() < 1e-4);
        }
    }

    #[test]
    fn test_preprocess_isnet_profile() {
        let image = RgbImage::from_pixel(16, 16, Rgb([200, 200, 200]));
        let tensor = preprocess(&image, 16, &ModelProfile::ISNET);

        // 一様な画像は最大値で割ると 1.0 になり、(1.0 - 0.5) / 1.0
        assert!(tensor.iter().all(|v| (v - 0.5).abs() < 1e-4));
    }

    #[test]
    fn test_preprocess_black_image_does_not_divide_by_zero() {
        let image = RgbImage::new(8, 8);
        let tensor = preprocess(&image, 8, &ModelProfile::default());

        assert!(tensor.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_postprocess_mask_resizes_to_original() -> Result<()> {
        let mut prediction = Array4::<f32>::zeros((1, 1, 4, 4));
        prediction.slice_mut(s![0, 0, 2.., ..]).fill(1.0);

        let mask = postprocess_mask(prediction, 8, 8)?;

        assert_eq!(mask.dimensions(), (8, 8));
        assert!(mask.get_pixel(0, 0).0[0] < 128);
        assert!(mask.get_pixel(7, 7).0[0] > 128);
        Ok(())
    }

    #[test]
    fn test_postprocess_mask_rejects_empty_output() {
        for shape in [(0, 1, 4, 4), (1, 0, 4, 4)] {
            let err = postprocess_mask(Array4::<f32>::zeros(shape), 8, 8).unwrap_err();
            assert!(matches!(err, BgRemoveError::Segmentation { .. }));
        }
    }
}
