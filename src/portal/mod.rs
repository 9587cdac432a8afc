//! flatex.at ポータルのセッション操作
//!
//! 書類アーカイブ (PDF) の一括取得と、取引/口座明細のCSVエクスポートを行う。

mod archive;
mod csv;
mod dates;
mod download;
mod extract;
pub mod protocol;
mod session;

pub use archive::{ArchiveWalker, DocumentCursor};
pub use dates::{format_portal_date, DateQuery, DateWindow, DateWindows};
pub use download::{file_name_for, DownloadReport, DownloadStatus, DownloadSummary};
pub use extract::{
    extract_download_path, extract_token, is_bot_challenge, AjaxCommand, AjaxResponse,
};
pub use protocol::{CsvKind, DocumentKind};
pub use session::PortalSession;
