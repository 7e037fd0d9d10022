use clap::Parser;
use photo_match_rust::{cli, config, error, export, matcher, plot, scanner};
use cli::{Cli, Commands};
use config::Config;
use error::Result;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Run {
            folder,
            output,
            vis_dir,
            no_vis,
            max_keypoints,
            fast_threshold,
            ratio,
        } => {
            println!("📷 photo-match - 連番写真マッチング\n");

            // CLI引数で設定を上書き
            let mut config = config;
            if let Some(n) = max_keypoints {
                config.max_keypoints = n;
            }
            if let Some(t) = fast_threshold {
                config.fast_threshold = t;
            }
            if let Some(r) = ratio {
                config.ratio_threshold = r;
            }

            // 1. 画像スキャン
            println!("[1/3] 写真をスキャン中...");
            let images = scanner::scan_folder(&folder)?;
            println!("✔ {}枚の写真を検出\n", images.len());

            if images.is_empty() {
                return Err(error::PhotoMatchError::NoImagesFound(
                    folder.display().to_string(),
                ));
            }
            if images.len() < 2 {
                return Err(error::PhotoMatchError::NotEnoughImages(images.len()));
            }

            // 2. ペアマッチング
            let num_pairs = images.len() - 1;
            println!("[2/3] {}ペアをマッチング中...", num_pairs);

            let pipeline = matcher::FeaturePipeline::from_config(&config);
            let vis_dir = if no_vis {
                None
            } else {
                Some(vis_dir.unwrap_or_else(|| export::default_vis_dir(&folder)))
            };

            let records =
                matcher::match_sequence(&images, &pipeline, vis_dir.as_deref(), cli.verbose)?;
            println!("✔ マッチング完了\n");

            // 3. CSV保存
            println!("[3/3] 結果を保存中...");
            let csv_path = output.unwrap_or_else(|| export::default_csv_path(&folder));
            export::csv::write_csv(&records, &csv_path)?;
            println!("✔ CSV出力: {}", csv_path.display());
            if let Some(dir) = &vis_dir {
                println!("✔ 可視化画像: {} ({}枚)", dir.display(), records.len());
            }

            let total_time: f64 = records.iter().map(|r| r.time_s).sum();
            let avg_time = total_time / records.len() as f64;
            println!("\n平均処理時間: {:.3}秒/ペア", avg_time);
            println!(
                "\n✅ 完了 ({})",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
            );
        }

        Commands::Plot { input, output } => {
            println!("📊 photo-match - 集計グラフ生成\n");

            // 1. CSV読み込み
            println!("[1/2] CSVを読み込み中...");
            let records = export::csv::read_csv(&input)?;
            println!("✔ {}件のレコードを読み込み\n", records.len());

            // 2. グラフ描画
            println!("[2/2] グラフを生成中...");
            let output_dir = output.unwrap_or_else(|| {
                match input.parent() {
                    Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                    _ => std::path::PathBuf::from("."),
                }
            });
            let (time_path, matches_path) = plot::render_reports(&records, &output_dir)?;
            println!("✔ 処理時間グラフ: {}", time_path.display());
            println!("✔ マッチ数グラフ: {}", matches_path.display());

            if let Some(stats) = plot::SummaryStats::from_records(&records) {
                println!("\n===== 集計サマリ =====");
                println!("処理ペア数: {}", stats.total_pairs);
                println!("処理時間:");
                println!("  平均: {:.2} ms", stats.avg_time_ms);
                println!(
                    "  最大: {:.2} ms (ペア {})",
                    stats.max_time_ms.0, stats.max_time_ms.1
                );
                println!(
                    "  最小: {:.2} ms (ペア {})",
                    stats.min_time_ms.0, stats.min_time_ms.1
                );
                println!("マッチ数:");
                println!("  平均: {:.1}", stats.avg_matches);
                println!(
                    "  最大: {} (ペア {})",
                    stats.max_matches.0, stats.max_matches.1
                );
                println!(
                    "  最小: {} (ペア {})",
                    stats.min_matches.0, stats.min_matches.1
                );
                println!("======================");
            }

            println!("\n✅ 完了");
        }

        Commands::Config {
            set_max_keypoints,
            set_fast_threshold,
            set_ratio,
            show,
        } => {
            let mut config = config;
            let mut changed = false;

            if let Some(n) = set_max_keypoints {
                config.max_keypoints = n;
                changed = true;
            }
            if let Some(t) = set_fast_threshold {
                config.fast_threshold = t;
                changed = true;
            }
            if let Some(r) = set_ratio {
                config.ratio_threshold = r;
                changed = true;
            }

            if changed {
                config.save()?;
                println!("✔ 設定を保存しました");
            }

            if show || !changed {
                println!("設定:");
                println!("  最大特徴点数: {}", config.max_keypoints);
                println!("  FASTしきい値: {}", config.fast_threshold);
                println!("  比率テストしきい値: {}", config.ratio_threshold);
                println!("  ピラミッド段数: {}", config.pyramid_levels);
            }
        }
    }

    Ok(())
}
