//! flatex.at 書類取得ライブラリ
//!
//! - 書類アーカイブのPDFを日付範囲でまとめてダウンロード
//! - 取引一覧/口座明細のCSVエクスポートを取得
//!
//! ポータルには公開APIが無いため、ブラウザのAJAX呼び出しをそのまま再現する。
//!
//! # 使用例
//!
//! ```rust,ignore
//! use flatex_fetch::{DateQuery, FetchConfig, FetchRequest, FetchService};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = FetchService::new(FetchConfig::default());
//!
//!     let request = FetchRequest::documents("./pdfs")
//!         .with_credentials("user_id", "password")
//!         .with_dates(DateQuery::new().with_days(90))
//!         .with_reporter(|report| println!("{}", report));
//!
//!     let result = service.call(request).await.unwrap();
//!     println!("{:?}", result);
//! }
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod portal;
pub mod service;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

// 主要な型をリエクスポート
pub use config::FetchConfig;
pub use error::FetchError;
pub use http::HttpTransport;
pub use portal::{
    CsvKind, DateQuery, DateWindow, DownloadReport, DownloadStatus, DownloadSummary,
    PortalSession,
};
pub use service::{Credentials, FetchMode, FetchRequest, FetchResult, FetchService};
pub use traits::{PortalRequest, PortalTransport};
