//! CSVログからの集計グラフ生成
//!
//! 処理時間（ms）とマッチ数をペアインデックス順の折れ線で描き、
//! それぞれ平均値の水平線を重ねる。

use crate::error::{PhotoMatchError, Result};
use crate::export::csv::MatchRecord;
use plotters::prelude::*;
use std::path::{Path, PathBuf};

pub const TIME_PLOT_FILE: &str = "time_performance_plot.png";
pub const MATCHES_PLOT_FILE: &str = "matches_performance_plot.png";

/// CSV全行の集計値。(値, ペアインデックス) の組で極値を持つ
#[derive(Debug, Clone)]
pub struct SummaryStats {
    pub total_pairs: usize,
    pub avg_time_ms: f64,
    pub max_time_ms: (f64, usize),
    pub min_time_ms: (f64, usize),
    pub avg_matches: f64,
    pub max_matches: (usize, usize),
    pub min_matches: (usize, usize),
}

impl SummaryStats {
    pub fn from_records(records: &[MatchRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }

        let times_ms: Vec<(f64, usize)> = records
            .iter()
            .map(|r| (r.time_s * 1000.0, r.pair_index))
            .collect();
        let matches: Vec<(usize, usize)> = records
            .iter()
            .map(|r| (r.matches, r.pair_index))
            .collect();

        let avg_time_ms =
            times_ms.iter().map(|(v, _)| v).sum::<f64>() / times_ms.len() as f64;
        let avg_matches =
            matches.iter().map(|(v, _)| *v as f64).sum::<f64>() / matches.len() as f64;

        let max_time_ms = times_ms
            .iter()
            .copied()
            .fold(times_ms[0], |acc, v| if v.0 > acc.0 { v } else { acc });
        let min_time_ms = times_ms
            .iter()
            .copied()
            .fold(times_ms[0], |acc, v| if v.0 < acc.0 { v } else { acc });

        let max_matches = matches
            .iter()
            .copied()
            .fold(matches[0], |acc, v| if v.0 > acc.0 { v } else { acc });
        let min_matches = matches
            .iter()
            .copied()
            .fold(matches[0], |acc, v| if v.0 < acc.0 { v } else { acc });

        Some(Self {
            total_pairs: records.len(),
            avg_time_ms,
            max_time_ms,
            min_time_ms,
            avg_matches,
            max_matches,
            min_matches,
        })
    }
}

/// 2枚の集計グラフを出力フォルダに描き、パスを返す
pub fn render_reports(records: &[MatchRecord], output_dir: &Path) -> Result<(PathBuf, PathBuf)> {
    let stats = SummaryStats::from_records(records)
        .ok_or_else(|| PhotoMatchError::CsvEmpty("レコードが0件".into()))?;

    std::fs::create_dir_all(output_dir)?;

    let time_path = output_dir.join(TIME_PLOT_FILE);
    let matches_path = output_dir.join(MATCHES_PLOT_FILE);

    draw_time_chart(records, stats.avg_time_ms, &time_path)
        .map_err(|e| PhotoMatchError::ChartRender(e.to_string()))?;
    draw_matches_chart(records, stats.avg_matches, &matches_path)
        .map_err(|e| PhotoMatchError::ChartRender(e.to_string()))?;

    Ok((time_path, matches_path))
}

fn x_axis_end(records: &[MatchRecord]) -> usize {
    records.iter().map(|r| r.pair_index).max().unwrap_or(0) + 1
}

fn draw_time_chart(
    records: &[MatchRecord],
    avg_ms: f64,
    path: &Path,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let y_max = records
        .iter()
        .map(|r| r.time_s * 1000.0)
        .fold(avg_ms, f64::max)
        .max(1e-5)
        * 1.1;
    let x_end = x_axis_end(records);

    let root = BitMapBackend::new(path, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 60)
        .caption("Processing Time per Image Pair", ("sans-serif", 40))
        .build_cartesian_2d(0..x_end, 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Image Pair Index")
        .y_desc("Processing Time (ms)")
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            records.iter().map(|r| (r.pair_index, r.time_s * 1000.0)),
            &RED,
        ))?
        .label("Processing Time")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

    chart
        .draw_series(LineSeries::new(
            (0..=x_end).map(|x| (x, avg_ms)),
            &BLUE,
        ))?
        .label(format!("Average: {:.1}ms", avg_ms))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

    chart.configure_series_labels().border_style(&BLACK).draw()?;
    root.present()?;

    Ok(())
}

fn draw_matches_chart(
    records: &[MatchRecord],
    avg_matches: f64,
    path: &Path,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let y_max = records
        .iter()
        .map(|r| r.matches as f64)
        .fold(avg_matches, f64::max)
        .max(1.0)
        * 1.1;
    let x_end = x_axis_end(records);

    let root = BitMapBackend::new(path, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 60)
        .caption("Feature Matches per Image Pair", ("sans-serif", 40))
        .build_cartesian_2d(0..x_end, 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Image Pair Index")
        .y_desc("Number of Feature Matches")
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            records.iter().map(|r| (r.pair_index, r.matches as f64)),
            &GREEN,
        ))?
        .label("Feature Matches")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &GREEN));

    chart
        .draw_series(LineSeries::new(
            (0..=x_end).map(|x| (x, avg_matches)),
            &BLUE,
        ))?
        .label(format!("Average: {:.1}", avg_matches))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

    chart.configure_series_labels().border_style(&BLACK).draw()?;
    root.present()?;

    Ok(())
}
