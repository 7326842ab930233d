use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::model::ModelProfile;

/// モデルの系統（前処理の平均・分散が異なる）
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ModelKind {
    #[default]
    U2net,
    Isnet,
}

impl ModelKind {
    pub const fn profile(self) -> ModelProfile {
        match self {
            Self::U2net => ModelProfile::U2NET,
            Self::Isnet => ModelProfile::ISNET,
        }
    }
}

/// 画像の背景を除去して透過 PNG として保存する
#[derive(Parser, Clone, Debug)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// 入力画像のパス
    #[arg(short, long, value_parser = check_path)]
    pub input: PathBuf,

    /// 出力先のパス（拡張子に関わらず PNG で書き出す）
    #[arg(short, long, value_parser = check_path)]
    pub output: PathBuf,

    /// ONNX モデルのパス
    #[arg(short, long, default_value = "models/u2net.onnx")]
    pub model_path: PathBuf,

    /// モデルの系統
    #[arg(short = 'k', long, value_enum, default_value_t = ModelKind::U2net)]
    pub model_kind: ModelKind,

    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self::parse()
    }
}

fn check_path(s: &str) -> Result<PathBuf, String> {
    if s.trim().is_empty() {
        return Err("path must not be empty".to_string());
    }
    Ok(PathBuf::from(s))
}
