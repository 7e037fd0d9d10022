use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "photo-match")]
#[command(about = "連番写真の特徴点マッチング計測・可視化ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 連番写真を順にマッチングしてCSVと可視化画像を出力
    Run {
        /// 写真フォルダのパス
        #[arg(required = true)]
        folder: PathBuf,

        /// 出力CSVファイル（デフォルト: 入力フォルダ/matching_results.csv）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 可視化画像の出力フォルダ（デフォルト: 入力フォルダ/match_vis）
        #[arg(long)]
        vis_dir: Option<PathBuf>,

        /// 可視化画像を出力しない
        #[arg(long)]
        no_vis: bool,

        /// 最大特徴点数（設定を上書き）
        #[arg(long)]
        max_keypoints: Option<usize>,

        /// FASTしきい値（設定を上書き）
        #[arg(long)]
        fast_threshold: Option<u8>,

        /// 比率テストしきい値（設定を上書き）
        #[arg(long)]
        ratio: Option<f32>,
    },

    /// CSVから処理時間・マッチ数の集計グラフを生成
    Plot {
        /// 入力CSVファイル
        #[arg(required = true)]
        input: PathBuf,

        /// グラフの出力フォルダ（デフォルト: CSVと同じフォルダ）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 設定を表示/編集
    Config {
        /// 最大特徴点数を設定
        #[arg(long)]
        set_max_keypoints: Option<usize>,

        /// FASTしきい値を設定
        #[arg(long)]
        set_fast_threshold: Option<u8>,

        /// 比率テストしきい値を設定
        #[arg(long)]
        set_ratio: Option<f32>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}
