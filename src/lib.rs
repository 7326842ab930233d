pub mod config;
pub mod data_url;
pub mod errors;
pub mod imageops;
pub mod model;
pub mod traits;

pub mod mocks;

use image::{DynamicImage, ImageFormat};
use std::fs;
use std::io::{self, Cursor, Write};
use std::path::Path;

pub use config::{Config, ModelKind};
pub use data_url::{decode_base64_image, encode_png_data_url, strip_data_url_prefix};
pub use errors::{BgRemoveError, Result};
pub use model::{Model, ModelProfile};
pub use traits::*;

/// 背景除去の入口
///
/// セグメンテーションは `M` に任せ、ここではデコード・エンコードと入出力だけを扱う。
pub struct BackgroundRemover<M: ImageSegmentationModel> {
    model: M,
}

impl<M: ImageSegmentationModel> BackgroundRemover<M> {
    pub const fn new(model: M) -> Self {
        Self { model }
    }

    /// 背景を透明にした RGBA 画像を返す
    pub fn remove_background(&self, img: &DynamicImage) -> Result<DynamicImage> {
        let segmented = self.model.segment_image(img)?;
        Ok(DynamicImage::ImageRgba8(segmented.to_rgba8()))
    }

    /// 画像ファイルのバイト列から背景を除去し、PNG のバイト列を返す
    pub fn remove_background_from_bytes(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let img = image::load_from_memory(bytes)?;
        log::debug!("decoded {}x{} image", img.width(), img.height());

        let output = self.remove_background(&img)?;

        let mut png = Cursor::new(Vec::new());
        output
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|source| BgRemoveError::Encode { source })?;
        Ok(png.into_inner())
    }

    /// base64 画像（data URL 可）から背景を除去し、`data:image/png;base64,` 付きで返す
    pub fn remove_background_from_base64(&self, base64_image: &str) -> Result<String> {
        let bytes = decode_base64_image(base64_image)?;
        let png = self.remove_background_from_bytes(&bytes)?;
        Ok(encode_png_data_url(&png))
    }

    /// ファイルから背景を除去して PNG で保存する（エラーは呼び出し元に返す）
    pub fn try_remove_background_from_file(
        &self,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<()> {
        let bytes =
            fs::read(input_path).map_err(|e| BgRemoveError::io(input_path, "画像読み込み", e))?;
        let img = image::load_from_memory(&bytes)?;

        let output = self.remove_background(&img)?;

        output
            .save_with_format(output_path, ImageFormat::Png)
            .map_err(|e| match e {
                image::ImageError::IoError(source) => {
                    BgRemoveError::io(output_path, "画像保存", source)
                }
                source => BgRemoveError::Encode { source },
            })?;

        log::debug!("saved {}", output_path.display());
        Ok(())
    }

    /// ファイルから背景を除去して PNG で保存する
    ///
    /// 失敗してもエラーは返さず、結果を標準出力に表示するだけ。終了コードには影響しない。
    pub fn remove_background_from_file(&self, input_path: &Path, output_path: &Path) {
        let stdout = io::stdout();
        self.remove_background_from_file_with_report(input_path, output_path, &mut stdout.lock());
    }

    /// `remove_background_from_file` の本体。結果の表示先を `out` にする
    pub fn remove_background_from_file_with_report<W: Write>(
        &self,
        input_path: &Path,
        output_path: &Path,
        out: &mut W,
    ) {
        let written = match self.try_remove_background_from_file(input_path, output_path) {
            Ok(()) => writeln!(
                out,
                "✅ Background removed: {} -> {}",
                input_path.display(),
                output_path.display()
            ),
            Err(e) => writeln!(out, "❌ {}", e),
        };
        if let Err(e) = written {
            log::warn!("failed to write report: {}", e);
        }
    }
}

impl BackgroundRemover<Model> {
    pub fn with_onnx_model(config: &Config) -> Result<Self> {
        let model = Model::with_profile(
            &config.model_path,
            config.device_id,
            config.model_kind.profile(),
        )?;
        Ok(Self::new(model))
    }
}
