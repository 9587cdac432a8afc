//! 書類アーカイブ一覧の走査
//!
//! 一覧はページングパラメータを持たず、行選択 (`selectedrowidx`) の度に
//! ダウンロード用スクリプトが返ってくる。行番号を増やしながら選択し続け、
//! スクリプトが返らなくなったところを一覧の終端とみなす。
//!
//! 終端の判定はこの1点のみで、想定外の形のレスポンスでも走査はそこで止まる。

use tracing::{debug, info};
use url::Url;

use crate::error::FetchError;
use crate::traits::PortalTransport;

use super::dates::{DateWindow, DateWindows};
use super::protocol::{
    DocumentKind, ARCHIVE_DEFAULTS, ARCHIVE_FILTER_BUTTON_FIELD, ARCHIVE_LIST_ENDPOINT,
    ARCHIVE_ROW_FIELD, END_DATE_FIELD, START_DATE_FIELD,
};
use super::session::PortalSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkState {
    /// フィルタ未送信
    Pending,
    Walking,
    Finished,
}

/// 1つの検索窓の一覧を先頭行から順に辿るカーソル
///
/// 再開はできない。止めたければ `next_url` を呼ばなければよい。
#[derive(Debug)]
pub struct ArchiveWalker {
    window: DateWindow,
    next_row: usize,
    state: WalkState,
}

impl ArchiveWalker {
    pub fn new(window: DateWindow) -> Self {
        Self {
            window,
            next_row: 0,
            state: WalkState::Pending,
        }
    }

    pub fn window(&self) -> DateWindow {
        self.window
    }

    pub fn is_finished(&self) -> bool {
        self.state == WalkState::Finished
    }

    /// 次の行のPDFのURL。一覧の終端なら `None`
    pub async fn next_url<T: PortalTransport>(
        &mut self,
        session: &mut PortalSession<T>,
    ) -> Result<Option<Url>, FetchError> {
        match self.state {
            WalkState::Finished => return Ok(None),
            WalkState::Pending => {
                info!("Listing archive for {}", self.window);
                let form = self.form(ARCHIVE_FILTER_BUTTON_FIELD, "true".to_string());
                session.post(ARCHIVE_LIST_ENDPOINT, form).await?;
                self.state = WalkState::Walking;
            }
            WalkState::Walking => {}
        }

        let form = self.form(ARCHIVE_ROW_FIELD, self.next_row.to_string());
        let response = session.post(ARCHIVE_LIST_ENDPOINT, form).await?;

        match response.download_path(DocumentKind::Pdf) {
            Some(path) => {
                debug!("Row {} -> {}", self.next_row, path);
                self.next_row += 1;
                Ok(Some(session.resolve(&path)?))
            }
            None => {
                debug!(
                    "No download script for row {} (commands: {:?}), end of list",
                    self.next_row,
                    response.command_kinds()
                );
                self.state = WalkState::Finished;
                Ok(None)
            }
        }
    }

    fn form(&self, field: &str, value: String) -> Vec<(String, String)> {
        let mut form = vec![
            (START_DATE_FIELD.to_string(), self.window.portal_start()),
            (END_DATE_FIELD.to_string(), self.window.portal_end()),
        ];
        form.extend(
            ARCHIVE_DEFAULTS
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string())),
        );
        form.push((field.to_string(), value));
        form
    }
}

/// 日付範囲全体を検索窓ごとに辿るカーソル (新しい窓から)
#[derive(Debug)]
pub struct DocumentCursor {
    windows: DateWindows,
    current: Option<ArchiveWalker>,
}

impl DocumentCursor {
    pub fn new(range: DateWindow) -> Self {
        Self {
            windows: range.windows(),
            current: None,
        }
    }

    pub async fn next_url<T: PortalTransport>(
        &mut self,
        session: &mut PortalSession<T>,
    ) -> Result<Option<Url>, FetchError> {
        loop {
            if let Some(walker) = self.current.as_mut() {
                if let Some(url) = walker.next_url(session).await? {
                    return Ok(Some(url));
                }
            }

            match self.windows.next() {
                Some(window) => self.current = Some(ArchiveWalker::new(window)),
                None => {
                    self.current = None;
                    return Ok(None);
                }
            }
        }
    }
}
