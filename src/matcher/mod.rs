//! 特徴点抽出とマッチングのパイプライン
//!
//! FASTコーナー検出 + 輝度重心による向き推定 + 回転BRIEF記述子。
//! ペア間は記述子のハミング距離で最近傍を取り、Loweの比率テストで選別する。

mod pattern;
pub mod types;

pub use types::{Feature, FeatureMatch, Keypoint};

use crate::config::Config;
use crate::error::{PhotoMatchError, Result};
use crate::export::csv::MatchRecord;
use crate::export::vis;
use crate::scanner::ImageInfo;
use image::{imageops, GrayImage};
use indicatif::ProgressBar;
use pattern::BRIEF_PATTERN;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::path::Path;
use std::time::Instant;

/// 記述子間ハミング距離の上限。これを超える最近傍は破棄
const MAX_HAMMING_DISTANCE: u32 = 80;

/// FAST円周上で連続して明/暗である必要のある画素数
const FAST_ARC_LENGTH: usize = 9;

/// ピラミッド各段の縮小率
const PYRAMID_SCALE_FACTOR: f32 = 1.2;

/// ピラミッドを打ち切る最小辺長
const MIN_PYRAMID_SIDE: u32 = 40;

pub struct FeaturePipeline {
    max_keypoints: usize,
    fast_threshold: u8,
    ratio_threshold: f32,
    pyramid_levels: u8,
}

impl FeaturePipeline {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_keypoints: config.max_keypoints.max(1),
            fast_threshold: config.fast_threshold,
            ratio_threshold: config.ratio_threshold,
            pyramid_levels: config.pyramid_levels.max(1),
        }
    }

    /// 画像から特徴点を抽出する。座標は元画像スケール
    pub fn extract(&self, image: &GrayImage) -> Vec<Feature> {
        let pyramid = self.build_pyramid(image);

        let mut features: Vec<Feature> = pyramid
            .par_iter()
            .flat_map(|(level_image, scale)| {
                self.extract_single_scale(level_image, *scale)
            })
            .collect();

        // 応答強度の高い順に上位だけ残す
        features.sort_by(|a, b| {
            b.keypoint
                .response
                .partial_cmp(&a.keypoint.response)
                .unwrap_or(Ordering::Equal)
        });
        features.truncate(self.max_keypoints);
        features
    }

    /// 2画像の特徴点集合をマッチングする
    ///
    /// 画像A側の各特徴点について画像B側の最近傍を取り、
    /// 距離上限とLoweの比率テストを通ったものだけ返す。
    pub fn match_pair(&self, features_a: &[Feature], features_b: &[Feature]) -> Vec<FeatureMatch> {
        features_a
            .par_iter()
            .enumerate()
            .filter_map(|(index_a, feature_a)| {
                let mut best_distance = u32::MAX;
                let mut second_best_distance = u32::MAX;
                let mut best_index_b = 0;

                for (index_b, feature_b) in features_b.iter().enumerate() {
                    let distance =
                        hamming_distance(&feature_a.descriptor, &feature_b.descriptor);

                    if distance < best_distance {
                        second_best_distance = best_distance;
                        best_distance = distance;
                        best_index_b = index_b;
                    } else if distance < second_best_distance {
                        second_best_distance = distance;
                    }
                }

                let passes_ratio = second_best_distance > 0
                    && (best_distance as f32 / second_best_distance as f32)
                        < self.ratio_threshold;

                if best_distance < MAX_HAMMING_DISTANCE && passes_ratio {
                    Some(FeatureMatch {
                        index_a,
                        index_b: best_index_b,
                        distance: best_distance,
                    })
                } else {
                    None
                }
            })
            .collect()
    }

    fn build_pyramid(&self, image: &GrayImage) -> Vec<(GrayImage, f32)> {
        let mut pyramid = Vec::with_capacity(self.pyramid_levels as usize);
        pyramid.push((image.clone(), 1.0));

        let mut current = image.clone();
        let mut scale = 1.0;

        for _ in 1..self.pyramid_levels {
            let new_width = (current.width() as f32 / PYRAMID_SCALE_FACTOR) as u32;
            let new_height = (current.height() as f32 / PYRAMID_SCALE_FACTOR) as u32;

            if new_width < MIN_PYRAMID_SIDE || new_height < MIN_PYRAMID_SIDE {
                break;
            }

            scale *= PYRAMID_SCALE_FACTOR;
            current = imageops::resize(
                &current,
                new_width,
                new_height,
                imageops::FilterType::Gaussian,
            );
            pyramid.push((current.clone(), scale));
        }

        pyramid
    }

    fn extract_single_scale(&self, image: &GrayImage, scale: f32) -> Vec<Feature> {
        let corners = self.detect_fast_corners(image);

        corners
            .par_iter()
            .map(|corner| {
                let angle =
                    compute_orientation(image, corner.x as u32, corner.y as u32);
                let descriptor = compute_descriptor(image, corner, angle);

                // 座標を元画像スケールへ戻す
                let keypoint = Keypoint {
                    x: corner.x * scale,
                    y: corner.y * scale,
                    response: corner.response,
                    angle,
                };

                Feature { keypoint, descriptor }
            })
            .collect()
    }

    fn detect_fast_corners(&self, image: &GrayImage) -> Vec<Keypoint> {
        let (width, height) = (image.width(), image.height());
        if width < 8 || height < 8 {
            return Vec::new();
        }

        let corners: Vec<Keypoint> = (3..(height - 3))
            .into_par_iter()
            .flat_map_iter(|y| {
                (3..(width - 3)).filter_map(move |x| {
                    let center = image.get_pixel(x, y)[0];

                    // 上下左右4点の先行チェックで大半を早期棄却
                    if !fast_pre_check(image, x, y, center, self.fast_threshold) {
                        return None;
                    }

                    if is_fast_corner(image, x, y, center, self.fast_threshold) {
                        Some(Keypoint {
                            x: x as f32,
                            y: y as f32,
                            response: corner_response(image, x, y),
                            angle: 0.0,
                        })
                    } else {
                        None
                    }
                })
            })
            .collect();

        self.non_maximum_suppression(corners)
    }

    /// グリッドベースの非最大抑制。近接コーナーは応答最大の1点に絞る
    fn non_maximum_suppression(&self, mut corners: Vec<Keypoint>) -> Vec<Keypoint> {
        if corners.is_empty() {
            return corners;
        }

        corners.sort_by(|a, b| {
            b.response.partial_cmp(&a.response).unwrap_or(Ordering::Equal)
        });

        let suppression_radius = 5.0_f32;
        let mut occupied = std::collections::HashSet::new();
        let mut selected = Vec::new();

        for corner in corners {
            let grid_x = (corner.x / suppression_radius) as i32;
            let grid_y = (corner.y / suppression_radius) as i32;

            let mut is_maximum = true;
            'grid: for dy in -1..=1 {
                for dx in -1..=1 {
                    if occupied.contains(&(grid_x + dx, grid_y + dy)) {
                        is_maximum = false;
                        break 'grid;
                    }
                }
            }

            if is_maximum {
                occupied.insert((grid_x, grid_y));
                selected.push(corner);
                if selected.len() >= self.max_keypoints {
                    break;
                }
            }
        }

        selected
    }
}

fn fast_pre_check(image: &GrayImage, x: u32, y: u32, center: u8, threshold: u8) -> bool {
    let bright = center.saturating_add(threshold);
    let dark = center.saturating_sub(threshold);

    let cardinal = [
        image.get_pixel(x, y - 3)[0],
        image.get_pixel(x + 3, y)[0],
        image.get_pixel(x, y + 3)[0],
        image.get_pixel(x - 3, y)[0],
    ];

    let bright_count = cardinal.iter().filter(|&&p| p > bright).count();
    let dark_count = cardinal.iter().filter(|&&p| p < dark).count();

    bright_count >= 3 || dark_count >= 3
}

fn is_fast_corner(image: &GrayImage, x: u32, y: u32, center: u8, threshold: u8) -> bool {
    // 半径3の円周16画素（Bresenham円）
    const CIRCLE: [(i32, i32); 16] = [
        (0, -3), (1, -3), (2, -2), (3, -1), (3, 0), (3, 1),
        (2, 2), (1, 3), (0, 3), (-1, 3), (-2, 2), (-3, 1),
        (-3, 0), (-3, -1), (-2, -2), (-1, -3),
    ];

    let bright = center.saturating_add(threshold);
    let dark = center.saturating_sub(threshold);

    let mut max_bright_run = 0;
    let mut max_dark_run = 0;
    let mut bright_run = 0;
    let mut dark_run = 0;

    // 周回をまたぐ連続列を拾うため2周する
    for i in 0..(CIRCLE.len() * 2) {
        let (dx, dy) = CIRCLE[i % CIRCLE.len()];
        let px = (x as i32 + dx) as u32;
        let py = (y as i32 + dy) as u32;
        let pixel = image.get_pixel(px, py)[0];

        if pixel > bright {
            bright_run += 1;
            dark_run = 0;
            max_bright_run = max_bright_run.max(bright_run);
        } else if pixel < dark {
            dark_run += 1;
            bright_run = 0;
            max_dark_run = max_dark_run.max(dark_run);
        } else {
            bright_run = 0;
            dark_run = 0;
        }
    }

    max_bright_run >= FAST_ARC_LENGTH || max_dark_run >= FAST_ARC_LENGTH
}

/// 近傍5x5の輝度分散をコーナー応答とする
fn corner_response(image: &GrayImage, x: u32, y: u32) -> f32 {
    let mut sum = 0.0_f32;
    let mut sum_sq = 0.0_f32;
    let mut count = 0u32;

    for dy in -2i32..=2 {
        for dx in -2i32..=2 {
            let px = x as i32 + dx;
            let py = y as i32 + dy;
            if px >= 0 && py >= 0 && (px as u32) < image.width() && (py as u32) < image.height() {
                let v = image.get_pixel(px as u32, py as u32)[0] as f32;
                sum += v;
                sum_sq += v * v;
                count += 1;
            }
        }
    }

    let mean = sum / count as f32;
    let variance = (sum_sq / count as f32) - mean * mean;
    variance.max(0.0).sqrt()
}

/// 輝度重心（intensity centroid）による向き推定
fn compute_orientation(image: &GrayImage, x: u32, y: u32) -> f32 {
    const RADIUS: i32 = 15;
    let mut m01 = 0.0_f32;
    let mut m10 = 0.0_f32;

    for dy in -RADIUS..=RADIUS {
        for dx in -RADIUS..=RADIUS {
            let px = x as i32 + dx;
            let py = y as i32 + dy;

            if px < 0 || py < 0 || px as u32 >= image.width() || py as u32 >= image.height() {
                continue;
            }

            if dx * dx + dy * dy <= RADIUS * RADIUS {
                let v = image.get_pixel(px as u32, py as u32)[0] as f32;
                m01 += v * dy as f32;
                m10 += v * dx as f32;
            }
        }
    }

    m01.atan2(m10)
}

/// 向きに合わせて回転したBRIEF記述子を計算する
fn compute_descriptor(image: &GrayImage, keypoint: &Keypoint, angle: f32) -> [u8; 32] {
    let mut descriptor = [0u8; 32];
    let x = keypoint.x as i32;
    let y = keypoint.y as i32;
    let cos_a = angle.cos();
    let sin_a = angle.sin();

    let max_x = image.width() as i32 - 1;
    let max_y = image.height() as i32 - 1;

    for (byte_index, tests) in BRIEF_PATTERN.chunks(8).enumerate() {
        let mut byte_value = 0u8;

        for (bit_index, &(dx1, dy1, dx2, dy2)) in tests.iter().enumerate() {
            let rx1 = (dx1 as f32 * cos_a - dy1 as f32 * sin_a) as i32;
            let ry1 = (dx1 as f32 * sin_a + dy1 as f32 * cos_a) as i32;
            let rx2 = (dx2 as f32 * cos_a - dy2 as f32 * sin_a) as i32;
            let ry2 = (dx2 as f32 * sin_a + dy2 as f32 * cos_a) as i32;

            let p1_x = (x + rx1).clamp(0, max_x) as u32;
            let p1_y = (y + ry1).clamp(0, max_y) as u32;
            let p2_x = (x + rx2).clamp(0, max_x) as u32;
            let p2_y = (y + ry2).clamp(0, max_y) as u32;

            if image.get_pixel(p1_x, p1_y)[0] < image.get_pixel(p2_x, p2_y)[0] {
                byte_value |= 1 << bit_index;
            }
        }

        descriptor[byte_index] = byte_value;
    }

    descriptor
}

pub fn hamming_distance(a: &[u8; 32], b: &[u8; 32]) -> u32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// 連番画像列を隣接ペアごとにマッチングし、結果レコードを返す
///
/// 計測区間は特徴抽出とマッチングのみ。画像のデコードと
/// 可視化画像の書き出しは計測に含めない。
pub fn match_sequence(
    images: &[ImageInfo],
    pipeline: &FeaturePipeline,
    vis_dir: Option<&Path>,
    verbose: bool,
) -> Result<Vec<MatchRecord>> {
    if images.len() < 2 {
        return Err(PhotoMatchError::NotEnoughImages(images.len()));
    }

    if let Some(dir) = vis_dir {
        std::fs::create_dir_all(dir)?;
    }

    let num_pairs = images.len() - 1;
    let progress = ProgressBar::new(num_pairs as u64);
    let mut records = Vec::with_capacity(num_pairs);

    for pair_index in 0..num_pairs {
        let info_a = &images[pair_index];
        let info_b = &images[pair_index + 1];

        let image_a = load_image(&info_a.path)?;
        let image_b = load_image(&info_b.path)?;
        let gray_a = image_a.to_luma8();
        let gray_b = image_b.to_luma8();

        let start = Instant::now();
        let features_a = pipeline.extract(&gray_a);
        let features_b = pipeline.extract(&gray_b);
        let matches = pipeline.match_pair(&features_a, &features_b);
        let elapsed = start.elapsed().as_secs_f64();

        if verbose {
            progress.println(format!(
                "  ペア {}: {:.3}秒, マッチ数: {} — {} vs {}",
                pair_index,
                elapsed,
                matches.len(),
                info_a.file_name,
                info_b.file_name,
            ));
        }

        if let Some(dir) = vis_dir {
            let points: Vec<((f32, f32), (f32, f32))> = matches
                .iter()
                .map(|m| {
                    let a = features_a[m.index_a].keypoint;
                    let b = features_b[m.index_b].keypoint;
                    ((a.x, a.y), (b.x, b.y))
                })
                .collect();

            let composite = vis::render_pair(&image_a.to_rgb8(), &image_b.to_rgb8(), &points);
            let vis_path = dir.join(format!("match_{:04}.png", pair_index));
            composite
                .save(&vis_path)
                .map_err(|e| PhotoMatchError::ImageSave(format!("{}: {}", vis_path.display(), e)))?;
        }

        records.push(MatchRecord {
            pair_index,
            image1: info_a.file_name.clone(),
            image2: info_b.file_name.clone(),
            time_s: elapsed,
            matches: matches.len(),
        });

        progress.inc(1);
    }

    progress.finish_and_clear();
    Ok(records)
}

fn load_image(path: &Path) -> Result<image::DynamicImage> {
    image::open(path)
        .map_err(|e| PhotoMatchError::ImageLoad(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor_with_bits(bits: &[usize]) -> [u8; 32] {
        let mut d = [0u8; 32];
        for &bit in bits {
            d[bit / 8] |= 1 << (bit % 8);
        }
        d
    }

    fn feature_at(x: f32, y: f32, descriptor: [u8; 32]) -> Feature {
        Feature {
            keypoint: Keypoint { x, y, response: 1.0, angle: 0.0 },
            descriptor,
        }
    }

    #[test]
    fn test_hamming_distance() {
        let zero = [0u8; 32];
        let ones = [0xFFu8; 32];
        assert_eq!(hamming_distance(&zero, &zero), 0);
        assert_eq!(hamming_distance(&zero, &ones), 256);
        assert_eq!(hamming_distance(&zero, &descriptor_with_bits(&[0, 5, 100])), 3);
    }

    #[test]
    fn test_extract_blank_image_has_no_features() {
        let pipeline = FeaturePipeline::from_config(&Config::default());
        let image = GrayImage::from_pixel(64, 64, image::Luma([128]));
        assert!(pipeline.extract(&image).is_empty());
    }

    #[test]
    fn test_extract_finds_corner() {
        let pipeline = FeaturePipeline::from_config(&Config::default());

        // 黒背景に白矩形。四隅がFASTコーナーになる
        let mut image = GrayImage::from_pixel(64, 64, image::Luma([0]));
        for y in 20..44 {
            for x in 20..44 {
                image.put_pixel(x, y, image::Luma([255]));
            }
        }

        let features = pipeline.extract(&image);
        assert!(!features.is_empty());
        assert!(features.len() <= 256);
    }

    #[test]
    fn test_extract_respects_keypoint_budget() {
        let config = Config { max_keypoints: 2, ..Config::default() };
        let pipeline = FeaturePipeline::from_config(&config);

        let mut image = GrayImage::from_pixel(96, 96, image::Luma([0]));
        for &(ox, oy) in &[(10u32, 10u32), (60, 10), (10, 60), (60, 60)] {
            for y in oy..oy + 16 {
                for x in ox..ox + 16 {
                    image.put_pixel(x, y, image::Luma([255]));
                }
            }
        }

        let features = pipeline.extract(&image);
        assert!(features.len() <= 2);
    }

    #[test]
    fn test_match_pair_exact_match() {
        let pipeline = FeaturePipeline::from_config(&Config::default());

        let a = vec![
            feature_at(1.0, 1.0, descriptor_with_bits(&[0, 1, 2, 3])),
            feature_at(5.0, 5.0, descriptor_with_bits(&[100, 101, 102, 103])),
        ];
        let b = vec![
            feature_at(2.0, 1.0, descriptor_with_bits(&[100, 101, 102, 103])),
            feature_at(6.0, 5.0, descriptor_with_bits(&[0, 1, 2, 3])),
        ];

        let matches = pipeline.match_pair(&a, &b);
        assert_eq!(matches.len(), 2);

        for m in &matches {
            assert_eq!(m.distance, 0);
        }
        assert!(matches.iter().any(|m| m.index_a == 0 && m.index_b == 1));
        assert!(matches.iter().any(|m| m.index_a == 1 && m.index_b == 0));
    }

    #[test]
    fn test_match_pair_ratio_test_rejects_ambiguous() {
        let pipeline = FeaturePipeline::from_config(&Config::default());

        // B側に距離の近い候補が2つあると比率テストで落ちる
        let a = vec![feature_at(0.0, 0.0, descriptor_with_bits(&[0, 1, 2, 3]))];
        let b = vec![
            feature_at(0.0, 0.0, descriptor_with_bits(&[0, 1, 2, 4])),
            feature_at(1.0, 0.0, descriptor_with_bits(&[0, 1, 2, 5])),
        ];

        let matches = pipeline.match_pair(&a, &b);
        assert!(matches.is_empty());
    }

    #[test]
    fn test_match_pair_distance_cap() {
        let pipeline = FeaturePipeline::from_config(&Config::default());

        // 最近傍でも距離が上限を超えるものは破棄
        let a = vec![feature_at(0.0, 0.0, [0u8; 32])];
        let b = vec![
            feature_at(0.0, 0.0, descriptor_with_bits(&(0..100).collect::<Vec<_>>())),
            feature_at(1.0, 0.0, [0xFFu8; 32]),
        ];

        // 最近傍の距離が100（上限80超）なのでマッチなし
        let matches = pipeline.match_pair(&a, &b);
        assert!(matches.is_empty());
    }

    #[test]
    fn test_match_sequence_requires_two_images() {
        let pipeline = FeaturePipeline::from_config(&Config::default());
        let result = match_sequence(&[], &pipeline, None, false);
        assert!(matches!(result, Err(PhotoMatchError::NotEnoughImages(0))));
    }
}
