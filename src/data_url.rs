//! base64 / data URL の変換
//!
//! 入力は `data:<mime>;base64,` ヘッダー付き・なしの両方を受け付け、出力は常に
//! `data:image/png;base64,` 付きの文字列を返す。

use base64::{
    alphabet,
    engine::{general_purpose, DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};

use crate::errors::{BgRemoveError, Result};

/// 出力する data URL のヘッダー
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

const DATA_URL_SCHEME: &str = "data:";

/// パディングの有無を問わない標準アルファベットのデコーダー
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// `data:` で始まる場合は最初のカンマまでのヘッダーを取り除く
pub fn strip_data_url_prefix(text: &str) -> Result<&str> {
    if !text.starts_with(DATA_URL_SCHEME) {
        return Ok(text);
    }

    text.split_once(',')
        .map(|(_, payload)| payload)
        .ok_or_else(|| BgRemoveError::decode("data URL header is not terminated by a comma"))
}

/// base64 文字列（data URL 可）を画像のバイト列に戻す
pub fn decode_base64_image(text: &str) -> Result<Vec<u8>> {
    let payload: String = strip_data_url_prefix(text)?
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    if payload.is_empty() {
        return Err(BgRemoveError::decode("payload is empty"));
    }

    Ok(LENIENT_STANDARD.decode(payload)?)
}

/// PNG のバイト列を data URL にする
pub fn encode_png_data_url(png_bytes: &[u8]) -> String {
    let mut out = String::with_capacity(PNG_DATA_URL_PREFIX.len() + png_bytes.len() * 4 / 3 + 4);
    out.push_str(PNG_DATA_URL_PREFIX);
    general_purpose::STANDARD.encode_string(png_bytes, &mut out);
    out
}
