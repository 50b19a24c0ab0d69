//! BNN 推論コアの周辺ツール
//!
//! - `model_file`: BNNW モデルファイルの読み書き
//! - `image`: 入力画像（32bit ワード列 / テキスト）のデコード
//! - `arch_config`: TOML によるアーキテクチャ上書き
//! - `random_model`: seed 付き乱数モデルの生成
//! - `io`: gzip 対応のファイル I/O

pub mod arch_config;
pub mod image;
pub mod io;
pub mod model_file;
pub mod random_model;
