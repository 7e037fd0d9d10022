/// 検出された特徴点。座標は元画像スケール
#[derive(Debug, Clone, Copy)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// コーナー応答強度（選別用）
    pub response: f32,
    /// 輝度重心による向き（ラジアン）
    pub angle: f32,
}

/// 特徴点と256bit記述子のペア
#[derive(Debug, Clone)]
pub struct Feature {
    pub keypoint: Keypoint,
    pub descriptor: [u8; 32],
}

/// 画像Aの特徴点indexと画像Bの特徴点indexの対応
#[derive(Debug, Clone, Copy)]
pub struct FeatureMatch {
    pub index_a: usize,
    pub index_b: usize,
    /// ハミング距離
    pub distance: u32,
}
