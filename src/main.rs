use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use tower::Service;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use flatex_fetch::{CsvKind, DateQuery, FetchConfig, FetchRequest, FetchResult, FetchService};

/// flatex.at から書類PDFをダウンロードする
///
/// 既定ではPDFを保存する。--csv を付けると取引一覧 (transactions) か
/// 口座明細 (account) のCSVを標準出力に書き出す。
#[derive(Debug, Parser)]
#[command(name = "flatex-fetch", version)]
struct Cli {
    /// 取得済みのセッションID (JSESSIONID)
    #[arg(long, env = "FLATEX_SESSION_ID", hide_env_values = true)]
    session_id: Option<String>,

    /// ログインに使うユーザーID
    #[arg(short = 'u', long, env = "FLATEX_USERID")]
    userid: Option<String>,

    /// パスワード (省略時は入力を求める)
    #[arg(short = 'p', long, env = "FLATEX_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// PDFの代わりにCSVを取得して標準出力へ
    #[arg(long, value_enum)]
    csv: Option<CsvArg>,

    /// PDFの保存先フォルダ
    #[arg(short = 'o', long, default_value = "pdfs")]
    output: PathBuf,

    /// 開始日が無いときに遡る日数
    #[arg(long, default_value_t = 90)]
    days: u32,

    /// 開始日 (例: 2021-01-15)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// 終了日 (例: 2021-06-24)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// ポータルのベースURL
    #[arg(long, env = "FLATEX_BASE_URL")]
    base_url: Option<String>,

    /// ログインフォームの送信先
    #[arg(long, env = "FLATEX_SSO_URL")]
    sso_url: Option<String>,

    /// User-Agent ヘッダー
    #[arg(long, env = "FLATEX_USER_AGENT")]
    user_agent: Option<String>,

    /// リクエストのタイムアウト (秒)
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// デバッグログを出す
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CsvArg {
    Transactions,
    Account,
}

impl From<CsvArg> for CsvKind {
    fn from(arg: CsvArg) -> Self {
        match arg {
            CsvArg::Transactions => CsvKind::Transactions,
            CsvArg::Account => CsvKind::Account,
        }
    }
}

impl Cli {
    fn date_query(&self) -> DateQuery {
        let mut query = DateQuery::new().with_days(self.days);
        if let Some(start) = self.start {
            query = query.with_start(start);
        }
        if let Some(end) = self.end {
            query = query.with_end(end);
        }
        query
    }

    fn fetch_config(&self) -> Result<FetchConfig> {
        let mut config = FetchConfig::default().with_timeout(Duration::from_secs(self.timeout));
        if let Some(base_url) = &self.base_url {
            config = config
                .with_base_url(base_url)
                .with_context(|| format!("invalid --base-url {}", base_url))?;
        }
        if let Some(sso_url) = &self.sso_url {
            config = config
                .with_sso_url(sso_url)
                .with_context(|| format!("invalid --sso-url {}", sso_url))?;
        }
        if let Some(user_agent) = &self.user_agent {
            config = config.with_user_agent(user_agent);
        }
        if let Some(session_id) = &self.session_id {
            config = config.with_session_id(session_id);
        }
        Ok(config)
    }
}

// 標準出力はステータス行とCSV本体に使うため、ログは標準エラーへ
fn init_logging(verbose: bool) {
    let fallback = if verbose { "info,flatex_fetch=debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn prompt_password() -> Result<String> {
    dialoguer::Password::new()
        .with_prompt("password")
        .interact()
        .context("failed to read password")
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = cli.fetch_config()?;

    let request = match cli.csv {
        Some(kind) => FetchRequest::csv(kind.into()),
        None => FetchRequest::documents(&cli.output).with_reporter(|report| println!("{}", report)),
    };
    let mut request = request.with_dates(cli.date_query());

    if let Some(user_id) = cli.userid {
        let password = match cli.password {
            Some(password) => password,
            None => prompt_password()?,
        };
        request = request.with_credentials(user_id, password);
    }

    let mut service = FetchService::new(config);
    match service.call(request).await? {
        FetchResult::Documents(summary) => {
            if summary.blocked > 0 {
                warn!(
                    "{} file(s) hit the bot check page; the session may not be signed in",
                    summary.blocked
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        FetchResult::Csv(Some(bytes)) => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes).context("failed to write CSV")?;
            stdout.flush()?;
            Ok(ExitCode::SUCCESS)
        }
        FetchResult::Csv(None) => {
            eprintln!("flatex-fetch: no CSV export was produced");
            Ok(ExitCode::FAILURE)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("flatex-fetch error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
