//! 一括マッチング処理の統合テスト
//!
//! 合成画像の連番フォルダに対して スキャン → マッチング → CSV出力 を
//! 通しで実行し、出力ファイルの件数と内容を検証する

use photo_match_rust::config::Config;
use photo_match_rust::export;
use photo_match_rust::matcher::{self, FeaturePipeline};
use photo_match_rust::scanner;
use std::path::Path;
use tempfile::tempdir;

/// 明るさの違う矩形を数個描き、決定的なスペックルを重ねた合成画像。
/// スペックルで各コーナーの近傍が一意になり、記述子の重複を避けられる。
/// offsetで矩形を平行移動する
fn synthetic_image(offset: u32) -> image::RgbImage {
    let mut img = image::RgbImage::from_pixel(96, 96, image::Rgb([20, 20, 20]));

    for &(ox, oy, side, level) in &[
        (12u32, 12u32, 18u32, 230u8),
        (58, 16, 12, 180),
        (24, 56, 22, 140),
    ] {
        for y in (oy + offset)..(oy + offset + side).min(96) {
            for x in (ox + offset)..(ox + offset + side).min(96) {
                img.put_pixel(x, y, image::Rgb([level, level, level]));
            }
        }
    }

    // 線形合同法による固定シードのノイズ（±15）
    let mut state = 0x2545F491u32;
    for y in 0..96 {
        for x in 0..96 {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            let noise = (state >> 27) as i16 - 15;
            let v = img.get_pixel(x, y)[0] as i16 + noise;
            let v = v.clamp(0, 255) as u8;
            img.put_pixel(x, y, image::Rgb([v, v, v]));
        }
    }

    img
}

fn write_sequence(dir: &Path, count: usize) {
    for i in 0..count {
        let img = synthetic_image(i as u32 * 2);
        img.save(dir.join(format!("{}.png", i + 1))).unwrap();
    }
}

/// CSV行数 = ペア数、可視化画像 = ペアごとに1枚
#[test]
fn test_run_produces_csv_and_vis_per_pair() {
    let dir = tempdir().expect("Failed to create temp dir");
    write_sequence(dir.path(), 4);

    let images = scanner::scan_folder(dir.path()).unwrap();
    assert_eq!(images.len(), 4);

    let pipeline = FeaturePipeline::from_config(&Config::default());
    let vis_dir = dir.path().join("match_vis");
    let records =
        matcher::match_sequence(&images, &pipeline, Some(&vis_dir), false).unwrap();

    // ペア数 = 画像数 - 1
    assert_eq!(records.len(), 3);

    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.pair_index, i);
        assert!(record.time_s >= 0.0);

        let vis_path = vis_dir.join(format!("match_{:04}.png", i));
        assert!(vis_path.exists(), "可視化画像がない: {}", vis_path.display());
        let metadata = std::fs::metadata(&vis_path).unwrap();
        assert!(metadata.len() > 0, "可視化画像が空");
    }

    // ペアの並びはスキャン順と一致する
    assert_eq!(records[0].image1, "1.png");
    assert_eq!(records[0].image2, "2.png");
    assert_eq!(records[2].image1, "3.png");
    assert_eq!(records[2].image2, "4.png");

    // CSVに書いて読み戻す
    let csv_path = dir.path().join("matching_results.csv");
    export::csv::write_csv(&records, &csv_path).unwrap();
    let restored = export::csv::read_csv(&csv_path).unwrap();
    assert_eq!(restored.len(), 3);
}

/// 可視化なしでもレコードは揃う
#[test]
fn test_run_without_vis() {
    let dir = tempdir().expect("Failed to create temp dir");
    write_sequence(dir.path(), 3);

    let images = scanner::scan_folder(dir.path()).unwrap();
    let pipeline = FeaturePipeline::from_config(&Config::default());
    let records = matcher::match_sequence(&images, &pipeline, None, false).unwrap();

    assert_eq!(records.len(), 2);
    assert!(!dir.path().join("match_vis").exists());
}

/// 同一画像のペアはマッチが出る
#[test]
fn test_identical_pair_has_matches() {
    let dir = tempdir().expect("Failed to create temp dir");

    let img = synthetic_image(0);
    img.save(dir.path().join("1.png")).unwrap();
    img.save(dir.path().join("2.png")).unwrap();

    let images = scanner::scan_folder(dir.path()).unwrap();
    let pipeline = FeaturePipeline::from_config(&Config::default());
    let records = matcher::match_sequence(&images, &pipeline, None, false).unwrap();

    assert_eq!(records.len(), 1);
    assert!(records[0].matches > 0, "同一画像ペアでマッチ数0");
}

/// 数字なしファイル名が混ざっても順序が保たれる
#[test]
fn test_sequence_ordering_in_records() {
    let dir = tempdir().expect("Failed to create temp dir");

    synthetic_image(0).save(dir.path().join("img_2.png")).unwrap();
    synthetic_image(2).save(dir.path().join("img_10.png")).unwrap();
    synthetic_image(4).save(dir.path().join("img_1.png")).unwrap();

    let images = scanner::scan_folder(dir.path()).unwrap();
    let pipeline = FeaturePipeline::from_config(&Config::default());
    let records = matcher::match_sequence(&images, &pipeline, None, false).unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].image1, "img_1.png");
    assert_eq!(records[0].image2, "img_2.png");
    assert_eq!(records[1].image1, "img_2.png");
    assert_eq!(records[1].image2, "img_10.png");
}
