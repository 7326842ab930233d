use crate::errors::Result;
use image::DynamicImage;

/// 画像セグメンテーションモデルの抽象化
///
/// 背景除去の処理はこのトレイトにだけ依存するので、ONNX モデルの代わりに
/// モックやクロージャを差し込んでテストできる。
pub trait ImageSegmentationModel: Send + Sync {
    /// 背景を透明にした RGBA 画像を返す（サイズは入力と同じ）
    fn segment_image(&self, img: &DynamicImage) -> Result<DynamicImage>;
}

impl<F> ImageSegmentationModel for F
where
    F: Fn(&DynamicImage) -> Result<DynamicImage> + Send + Sync,
{
    fn segment_image(&self, img: &DynamicImage) -> Result<DynamicImage> {
        self(img)
    }
}
