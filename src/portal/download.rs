use std::fmt;
use std::path::Path;

use tracing::{info, warn};
use url::Url;

use crate::error::FetchError;
use crate::traits::PortalTransport;

use super::archive::DocumentCursor;
use super::dates::DateWindow;
use super::extract::is_bot_challenge;
use super::session::PortalSession;

/// 1ファイルごとの処理結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    Downloaded,
    /// 同名ファイルが既にある
    Skipped,
    /// ボットチェック画面が返ってきた
    Blocked,
    /// 取得か書き込みに失敗した
    Failed,
}

impl DownloadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DownloadStatus::Downloaded => "downloaded",
            DownloadStatus::Skipped => "skip",
            DownloadStatus::Blocked => "blocked",
            DownloadStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub status: DownloadStatus,
    pub filename: String,
    pub url: Url,
}

impl fmt::Display for DownloadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.filename)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub downloaded: usize,
    pub skipped: usize,
    pub blocked: usize,
    pub failed: usize,
}

impl DownloadSummary {
    fn record(&mut self, status: DownloadStatus) {
        match status {
            DownloadStatus::Downloaded => self.downloaded += 1,
            DownloadStatus::Skipped => self.skipped += 1,
            DownloadStatus::Blocked => self.blocked += 1,
            DownloadStatus::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.downloaded + self.skipped + self.blocked + self.failed
    }
}

/// URLのパス末尾をデコードしてファイル名にする
///
/// 空の名前、`.`/`..`、区切り文字を含む名前は保存先の外を指しうるので `None`。
pub fn file_name_for(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    let name = urlencoding::decode(segment).ok()?;
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return None;
    }
    Some(name.into_owned())
}

impl<T: PortalTransport> PortalSession<T> {
    /// 日付範囲の書類をすべて `target_dir` に保存する
    ///
    /// 同名ファイルがあれば取得しない (ファイル名のみで判定)。
    /// 1ファイルの取得・書き込みの失敗は `Failed` として続行し、一覧側のリクエストの失敗は中断する。
    pub async fn download_all<F>(
        &mut self,
        target_dir: &Path,
        range: DateWindow,
        mut on_report: F,
    ) -> Result<DownloadSummary, FetchError>
    where
        F: FnMut(&DownloadReport),
    {
        tokio::fs::create_dir_all(target_dir).await?;
        info!("Downloading documents {} into {}", range, target_dir.display());

        let mut summary = DownloadSummary::default();
        let mut cursor = DocumentCursor::new(range);

        while let Some(url) = cursor.next_url(self).await? {
            let report = match file_name_for(&url) {
                Some(filename) => {
                    let target = target_dir.join(&filename);
                    let status = self.download_one(&url, &target).await;
                    DownloadReport {
                        status,
                        filename,
                        url,
                    }
                }
                None => {
                    warn!("Download URL has no usable file name: {}", url);
                    DownloadReport {
                        status: DownloadStatus::Failed,
                        filename: url.path().to_string(),
                        url,
                    }
                }
            };
            summary.record(report.status);
            on_report(&report);
        }

        info!(
            "Done: {} downloaded, {} skipped, {} blocked, {} failed",
            summary.downloaded, summary.skipped, summary.blocked, summary.failed
        );
        Ok(summary)
    }

    async fn download_one(&self, url: &Url, target: &Path) -> DownloadStatus {
        if tokio::fs::try_exists(target).await.unwrap_or(false) {
            return DownloadStatus::Skipped;
        }

        let body = match self.fetch(url).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to fetch {}: {}", url, e);
                return DownloadStatus::Failed;
            }
        };

        if is_bot_challenge(&body) {
            warn!("Bot check page returned for {}", url);
            return DownloadStatus::Blocked;
        }

        match write_atomically(target, &body).await {
            Ok(()) => DownloadStatus::Downloaded,
            Err(e) => {
                warn!("Failed to write {}: {}", target.display(), e);
                DownloadStatus::Failed
            }
        }
    }
}

/// 書き込み中のファイルに付ける接尾辞
const PART_SUFFIX: &str = ".part";

/// `<name>.part` に書いてから改名する
///
/// 途中で失敗しても `target` には何も残らないので、次回の実行で取り直せる。
async fn write_atomically(target: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut part_name = target.as_os_str().to_owned();
    part_name.push(PART_SUFFIX);
    let part = std::path::PathBuf::from(part_name);

    let result = match tokio::fs::write(&part, body).await {
        Ok(()) => tokio::fs::rename(&part, target).await,
        Err(e) => Err(e),
    };
    if result.is_err() {
        let _ = tokio::fs::remove_file(&part).await;
    }
    result
}
