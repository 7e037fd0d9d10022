use crate::error::{PhotoMatchError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 1枚あたりの最大特徴点数
    pub max_keypoints: usize,
    /// FASTコーナー検出の輝度差しきい値
    pub fast_threshold: u8,
    /// Loweの比率テストしきい値
    pub ratio_threshold: f32,
    /// 画像ピラミッドの段数
    pub pyramid_levels: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_keypoints: 256,
            fast_threshold: 20,
            ratio_threshold: 0.7,
            pyramid_levels: 4,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| PhotoMatchError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("photo-match").join("config.json"))
    }
}
