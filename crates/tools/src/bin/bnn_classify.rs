//! BNN 画像分類ツール
//!
//! モデルファイルを読み込み、与えた画像それぞれのクラスを `path<TAB>class` で
//! 標準出力に書く（`--json` なら JSON Lines）。複数画像は rayon で並列に
//! 分類し、出力順は引数順。

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use log::{debug, info};
use rayon::prelude::*;

use tools::arch_config::resolve_architecture;
use tools::image::{load_image, ImageFormat};
use tools::model_file::load_network;

#[derive(Parser, Debug)]
#[command(name = "bnn-classify")]
#[command(about = "BNN モデルで 2値画像を分類する")]
struct Cli {
    /// モデルファイル（BNNW、.gz 可）
    #[arg(long)]
    model: PathBuf,

    /// アーキテクチャ設定（TOML）。Flatten の並びはここから取る
    #[arg(long)]
    arch: Option<PathBuf>,

    /// 画像ファイル形式
    #[arg(long, value_enum, default_value_t = ImageFormat::Words)]
    format: ImageFormat,

    /// 並列スレッド数（0 = 自動）
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// 1画像1行の JSON（path, class, scores）で出力する
    #[arg(long, default_value_t = false)]
    json: bool,

    /// 分類する画像ファイル
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to set thread count: {e}");
            });
    }

    let base = resolve_architecture(cli.arch.as_deref())?;
    let net = load_network(&cli.model, &base)?;
    let shape = net.shapes().input;
    info!("classifying {} image(s) with {} threads", cli.images.len(), rayon::current_num_threads());

    // 各推論は中間テンソルを自前で持つので、ネットワークは共有参照で足りる
    let results: Vec<Result<(usize, Vec<i32>)>> = cli
        .images
        .par_iter()
        .map(|path| {
            let image = load_image(path, cli.format, shape)?;
            let trace = net.forward_trace(&image)?;
            debug!("{}: scores={:?}", path.display(), trace.scores);
            Ok((trace.class, trace.scores))
        })
        .collect();

    let mut failures = 0usize;
    for (path, result) in cli.images.iter().zip(results) {
        match result {
            Ok((class, scores)) if cli.json => {
                let line = serde_json::json!({
                    "path": path.display().to_string(),
                    "class": class,
                    "scores": scores,
                });
                println!("{line}");
            }
            Ok((class, _)) => println!("{}\t{class}", path.display()),
            Err(e) => {
                failures += 1;
                eprintln!("{}: {e:#}", path.display());
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} image(s) could not be classified", cli.images.len());
    }
    Ok(())
}
