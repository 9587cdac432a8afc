use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::Service;
use tracing::info;

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::http::HttpTransport;
use crate::portal::protocol::PROTOCOL_VERSION;
use crate::portal::{
    CsvKind, DateQuery, DateWindow, DownloadReport, DownloadSummary, PortalSession,
};
use crate::traits::PortalTransport;

/// ファイルごとの結果を受け取るコールバック
pub type ReportSink = Arc<dyn Fn(&DownloadReport) + Send + Sync>;

#[derive(Clone)]
pub struct Credentials {
    pub user_id: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// 書類アーカイブのPDFを保存
    Documents,
    /// CSVエクスポートを取得
    Csv(CsvKind),
}

/// 取得リクエスト
#[derive(Clone)]
pub struct FetchRequest {
    pub mode: FetchMode,
    pub output_dir: PathBuf,
    pub dates: DateQuery,
    pub credentials: Option<Credentials>,
    pub reporter: Option<ReportSink>,
}

impl FetchRequest {
    pub fn documents(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            mode: FetchMode::Documents,
            output_dir: output_dir.into(),
            dates: DateQuery::default(),
            credentials: None,
            reporter: None,
        }
    }

    pub fn csv(kind: CsvKind) -> Self {
        Self {
            mode: FetchMode::Csv(kind),
            output_dir: PathBuf::from("pdfs"),
            dates: DateQuery::default(),
            credentials: None,
            reporter: None,
        }
    }

    pub fn with_credentials(
        mut self,
        user_id: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials {
            user_id: user_id.into(),
            password: password.into(),
        });
        self
    }

    pub fn with_dates(mut self, dates: DateQuery) -> Self {
        self.dates = dates;
        self
    }

    pub fn with_reporter<F>(mut self, reporter: F) -> Self
    where
        F: Fn(&DownloadReport) + Send + Sync + 'static,
    {
        self.reporter = Some(Arc::new(reporter));
        self
    }
}

impl fmt::Debug for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchRequest")
            .field("mode", &self.mode)
            .field("output_dir", &self.output_dir)
            .field("dates", &self.dates)
            .field("credentials", &self.credentials)
            .field("reporter", &self.reporter.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// 取得結果
#[derive(Debug)]
pub enum FetchResult {
    Documents(DownloadSummary),
    /// エクスポートが作られなかった場合は `None`
    Csv(Option<Vec<u8>>),
}

/// tower::Serviceを実装した取得サービス
///
/// 呼び出しごとに新しいセッションを作る。
#[derive(Debug, Clone, Default)]
pub struct FetchService {
    config: FetchConfig,
}

impl FetchService {
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }
}

impl Service<FetchRequest> for FetchService {
    type Response = FetchResult;
    type Error = FetchError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: FetchRequest) -> Self::Future {
        info!(
            "Fetch request: {:?} (portal protocol v{})",
            req.mode, PROTOCOL_VERSION
        );
        let config = self.config.clone();

        Box::pin(async move {
            // 日付の指定ミスは通信前に返す
            let range = req.dates.resolve()?;
            let transport = HttpTransport::new(&config)?;
            let mut session = PortalSession::new(transport, &config);
            run(&mut session, req, range).await
        })
    }
}

/// ログインしてからモードごとの処理を行う
pub async fn run<T: PortalTransport>(
    session: &mut PortalSession<T>,
    req: FetchRequest,
    range: DateWindow,
) -> Result<FetchResult, FetchError> {
    if let Some(credentials) = &req.credentials {
        session
            .login(&credentials.user_id, &credentials.password)
            .await?;
    }

    match req.mode {
        FetchMode::Documents => {
            let reporter = req.reporter.clone();
            let summary = session
                .download_all(&req.output_dir, range, |report| {
                    if let Some(reporter) = &reporter {
                        reporter(report);
                    }
                })
                .await?;
            Ok(FetchResult::Documents(summary))
        }
        FetchMode::Csv(kind) => {
            let csv = session.download_csv(kind, range).await?;
            if let Some(bytes) = &csv {
                info!("CSV export: {} bytes", bytes.len());
            }
            Ok(FetchResult::Csv(csv))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{envelope, execute_download, MockTransport};
    use chrono::NaiveDate;
    use std::sync::Mutex;

    fn range() -> DateWindow {
        DateWindow::new(
            NaiveDate::from_ymd_opt(2021, 7, 1).unwrap(),
            NaiveDate::from_ymd_opt(2021, 7, 5).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_fetch_request_builder() {
        let dates = DateQuery::new().with_days(30);
        let req = FetchRequest::documents("/tmp/pdfs")
            .with_credentials("user", "pass")
            .with_dates(dates);

        assert_eq!(req.mode, FetchMode::Documents);
        assert_eq!(req.output_dir, PathBuf::from("/tmp/pdfs"));
        assert_eq!(req.dates, dates);
        let credentials = req.credentials.as_ref().unwrap();
        assert_eq!(credentials.user_id, "user");
        assert_eq!(credentials.password, "pass");
    }

    #[test]
    fn test_request_debug_hides_password() {
        let req = FetchRequest::csv(CsvKind::Transactions).with_credentials("user", "s3cret!");
        let debug = format!("{:?}", req);
        assert!(debug.contains("user"));
        assert!(!debug.contains("s3cret!"));
    }

    #[tokio::test]
    async fn test_service_rejects_missing_start_before_network() {
        let mut service = FetchService::default();
        let result = service.call(FetchRequest::csv(CsvKind::Account)).await;
        assert!(matches!(result, Err(FetchError::Usage(_))));
    }

    #[tokio::test]
    async fn test_run_logs_in_then_reports_each_file() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockTransport::new();
        mock.push_post("<html>sso</html>");
        mock.push_post(envelope(vec![]));
        mock.push_post(envelope(vec![execute_download("docs/x.pdf")]));
        mock.push_post(envelope(vec![]));
        mock.put_get(
            "https://konto.flatex.at/banking-flatex.at/docs/x.pdf",
            b"%PDF".to_vec(),
        );

        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let req = FetchRequest::documents(dir.path())
            .with_credentials("user", "pass")
            .with_reporter(move |report| sink.lock().unwrap().push(report.to_string()));

        let mut session = PortalSession::new(mock.clone(), &FetchConfig::default());
        let result = run(&mut session, req, range()).await.unwrap();

        match result {
            FetchResult::Documents(summary) => assert_eq!(summary.downloaded, 1),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(*lines.lock().unwrap(), vec!["downloaded x.pdf".to_string()]);
        assert!(mock.posts()[0].url.as_str().starts_with("https://www.flatex.at/sso"));
    }

    #[tokio::test]
    async fn test_run_without_credentials_skips_login() {
        let mock = MockTransport::new();
        mock.push_post(envelope(vec![]));
        mock.push_post(envelope(vec![]));

        let mut session = PortalSession::new(mock.clone(), &FetchConfig::default());
        let result = run(&mut session, FetchRequest::csv(CsvKind::Account), range())
            .await
            .unwrap();

        assert!(matches!(result, FetchResult::Csv(None)));
        assert!(mock.posts()[0]
            .url
            .as_str()
            .ends_with("accountPostingsFormAction.do"));
    }
}
