use flatex_fetch::{CsvKind, DateQuery, FetchConfig, FetchRequest, FetchResult, FetchService};
use tower::Service;

#[tokio::main]
async fn main() {
    // ログ設定
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(std::io::stderr)
        .init();

    // 環境変数から認証情報を取得
    let user_id = std::env::var("FLATEX_USERID").expect("FLATEX_USERID environment variable not set");
    let password =
        std::env::var("FLATEX_PASSWORD").expect("FLATEX_PASSWORD environment variable not set");

    let request = FetchRequest::csv(CsvKind::Account)
        .with_credentials(&user_id, &password)
        .with_dates(DateQuery::new().with_days(30));

    let mut service = FetchService::new(FetchConfig::default());

    eprintln!("=== flatex CSV export ===");

    match service.call(request).await {
        Ok(FetchResult::Csv(Some(bytes))) => {
            println!("{}", String::from_utf8_lossy(&bytes));
        }
        Ok(other) => {
            eprintln!("エクスポートなし: {:?}", other);
        }
        Err(e) => {
            eprintln!("エラー: {}", e);
        }
    }
}
