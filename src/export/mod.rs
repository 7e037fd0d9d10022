pub mod csv;
pub mod vis;

use std::path::{Path, PathBuf};

pub fn default_csv_path(folder: &Path) -> PathBuf {
    folder.join("matching_results.csv")
}

pub fn default_vis_dir(folder: &Path) -> PathBuf {
    folder.join("match_vis")
}
