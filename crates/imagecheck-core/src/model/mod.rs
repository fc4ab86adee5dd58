//! モデル定義
//!
//! イメージノード、ビルドタグ、ビルド結果などのデータモデルを定義します。

mod image;
mod result;

// Re-exports
pub use image::*;
pub use result::*;
