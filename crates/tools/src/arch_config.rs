//! アーキテクチャ設定（TOML）
//!
//! 省略したキーは参照モデルの値になる。
//!
//! ```toml
//! input_size = 16
//! kernel_size = 3
//! pad = 2
//! hidden_units = 256
//! num_classes = 10
//!
//! [[conv]]
//! out_channels = 16
//! pad_fill = "one"
//!
//! [[conv]]
//! out_channels = 32
//!
//! [flatten]
//! kind = "sliced"
//! order = ["channel", "col", "row"]
//! ```

use anyhow::{Context, Result};
use bnn_core::Architecture;
use log::info;
use std::path::Path;

/// TOML 文字列からアーキテクチャを読む
///
/// 形状として成立するか（`Architecture::shapes`）もここで確認する。
pub fn parse_architecture(text: &str) -> Result<Architecture> {
    let arch: Architecture = toml::from_str(text).context("invalid architecture TOML")?;
    arch.shapes()?;
    Ok(arch)
}

/// TOML ファイルからアーキテクチャを読む
pub fn load_architecture<P: AsRef<Path>>(path: P) -> Result<Architecture> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let arch =
        parse_architecture(&text).with_context(|| format!("in {}", path.display()))?;
    info!("architecture loaded from {}", path.display());
    Ok(arch)
}

/// `--arch` 指定があればそれを、なければ参照モデルを返す
pub fn resolve_architecture(path: Option<&Path>) -> Result<Architecture> {
    match path {
        Some(p) => load_architecture(p),
        None => Ok(Architecture::reference()),
    }
}
