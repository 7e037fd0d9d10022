use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhotoMatchError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("画像が見つかりません: {0}")]
    NoImagesFound(String),

    #[error("画像が{0}枚しかありません。ペア処理には2枚以上必要です")]
    NotEnoughImages(usize),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("画像書き込みエラー: {0}")]
    ImageSave(String),

    #[error("CSVにデータ行がありません: {0}")]
    CsvEmpty(String),

    #[error("CSV入出力エラー: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("グラフ描画エラー: {0}")]
    ChartRender(String),
}

pub type Result<T> = std::result::Result<T, PhotoMatchError>;
