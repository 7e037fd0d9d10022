//! マッチング結果のCSVログ
//!
//! ヘッダは `PairIndex,Image1,Image2,Time(s),Matches` 固定。
//! 行順は処理順（= ペアインデックス順）と一致する。

use crate::error::{PhotoMatchError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    #[serde(rename = "PairIndex")]
    pub pair_index: usize,

    #[serde(rename = "Image1")]
    pub image1: String,

    #[serde(rename = "Image2")]
    pub image2: String,

    #[serde(rename = "Time(s)", serialize_with = "serialize_secs")]
    pub time_s: f64,

    #[serde(rename = "Matches")]
    pub matches: usize,
}

/// 秒を小数3桁で書き出す
fn serialize_secs<S>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&format!("{:.3}", value))
}

pub fn write_csv(records: &[MatchRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_csv(path: &Path) -> Result<Vec<MatchRecord>> {
    let mut reader = csv::Reader::from_path(path)?;

    let mut records = Vec::new();
    for result in reader.deserialize() {
        let record: MatchRecord = result?;
        records.push(record);
    }

    if records.is_empty() {
        return Err(PhotoMatchError::CsvEmpty(path.display().to_string()));
    }

    Ok(records)
}
