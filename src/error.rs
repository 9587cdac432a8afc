use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("引数エラー: {0}")]
    Usage(String),

    #[error("HTTPエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSONパースエラー: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URLエラー: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("ファイル操作エラー: {0}")]
    FileIO(#[from] std::io::Error),

    #[error("ポータル応答エラー: {0}")]
    Protocol(String),
}
