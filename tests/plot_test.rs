//! 集計グラフ生成の統合テスト
//!
//! CSVを書いて読み戻し、2枚のグラフPNGが生成されることを検証

use photo_match_rust::export::csv::{self, MatchRecord};
use photo_match_rust::plot;
use tempfile::tempdir;

fn sample_records(count: usize) -> Vec<MatchRecord> {
    (0..count)
        .map(|i| MatchRecord {
            pair_index: i,
            image1: format!("{}.jpg", i + 1),
            image2: format!("{}.jpg", i + 2),
            time_s: 0.05 + 0.01 * i as f64,
            matches: 10 + i * 3,
        })
        .collect()
}

#[test]
fn test_render_reports_creates_both_plots() {
    let dir = tempdir().expect("Failed to create temp dir");
    let records = sample_records(5);

    let (time_path, matches_path) =
        plot::render_reports(&records, dir.path()).expect("グラフ生成に失敗");

    assert!(time_path.exists());
    assert!(matches_path.exists());

    let time_meta = std::fs::metadata(&time_path).unwrap();
    let matches_meta = std::fs::metadata(&matches_path).unwrap();
    assert!(time_meta.len() > 0, "処理時間グラフが空");
    assert!(matches_meta.len() > 0, "マッチ数グラフが空");
}

#[test]
fn test_render_reports_single_pair() {
    let dir = tempdir().expect("Failed to create temp dir");
    let records = sample_records(1);

    // ペア1件でも描画できる
    let result = plot::render_reports(&records, dir.path());
    assert!(result.is_ok(), "1件のグラフ生成に失敗: {:?}", result.err());
}

#[test]
fn test_render_reports_empty_is_error() {
    let dir = tempdir().expect("Failed to create temp dir");
    let result = plot::render_reports(&[], dir.path());
    assert!(result.is_err());
}

/// CSV経由のエンドツーエンド: 書き出し → 読み込み → グラフ生成
#[test]
fn test_plot_from_csv_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let csv_path = dir.path().join("matching_results.csv");

    csv::write_csv(&sample_records(3), &csv_path).unwrap();
    let records = csv::read_csv(&csv_path).unwrap();
    assert_eq!(records.len(), 3);

    let output_dir = dir.path().join("plots");
    let (time_path, matches_path) = plot::render_reports(&records, &output_dir).unwrap();
    assert!(time_path.exists());
    assert!(matches_path.exists());
}
