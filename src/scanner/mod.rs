use crate::error::{PhotoMatchError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub file_name: String,
    /// ファイル名中の数字を連結した連番キー（数字なしはNone）
    pub sequence: Option<u64>,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "JPG", "JPEG", "PNG"];

/// ファイル名中の数字をすべて連結して連番キーにする
/// 例: "IMG_0012.jpg" -> 12, "frame3_v2.png" -> 32
fn sequence_key(file_name: &str) -> Option<u64> {
    lazy_static::lazy_static! {
        static ref DIGITS_RE: Regex = Regex::new(r"\d").unwrap();
    }

    let digits: String = DIGITS_RE
        .find_iter(file_name)
        .map(|m| m.as_str())
        .collect();

    if digits.is_empty() {
        None
    } else {
        // 先頭ゼロ詰めでも桁あふれしないよう18桁に制限
        digits[..digits.len().min(18)].parse().ok()
    }
}

pub fn scan_folder(folder: &Path) -> Result<Vec<ImageInfo>> {
    if !folder.exists() {
        return Err(PhotoMatchError::FolderNotFound(folder.display().to_string()));
    }

    let mut images = Vec::new();

    for entry in WalkDir::new(folder)
        .max_depth(1)  // 直下のみ（再帰しない）
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        if let Some(ext) = path.extension() {
            let ext_str = ext.to_string_lossy();
            if IMAGE_EXTENSIONS.iter().any(|&e| e == ext_str) {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();

                let sequence = sequence_key(&file_name);

                images.push(ImageInfo {
                    path: path.to_path_buf(),
                    file_name,
                    sequence,
                });
            }
        }
    }

    // 連番キーでソート。数字なしのファイルは末尾にファイル名順で並ぶ
    images.sort_by(|a, b| match (a.sequence, b.sequence) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.file_name.cmp(&b.file_name)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.file_name.cmp(&b.file_name),
    });

    Ok(images)
}
