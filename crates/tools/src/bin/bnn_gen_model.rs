//! 乱数 BNN モデル生成ツール
//!
//! seed 付き乱数で重み・閾値を作り、BNNW 形式で書き出す。

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use tools::arch_config::resolve_architecture;
use tools::model_file::save_model;
use tools::random_model::random_model;

#[derive(Parser, Debug)]
#[command(name = "bnn-gen-model")]
#[command(about = "乱数の重みで BNN モデルファイルを生成する")]
struct Cli {
    /// 出力ファイル（.gz なら圧縮）
    #[arg(long)]
    out: PathBuf,

    /// アーキテクチャ設定（TOML、省略時は参照モデル）
    #[arg(long)]
    arch: Option<PathBuf>,

    /// 乱数 seed
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    let arch = resolve_architecture(cli.arch.as_deref())?;
    let weights = random_model(&arch, cli.seed)?;
    save_model(&cli.out, &arch, &weights)?;

    info!("wrote {} (seed {})", cli.out.display(), cli.seed);
    Ok(())
}
