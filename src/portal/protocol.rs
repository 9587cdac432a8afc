//! ポータルのプロトコル定数 (protocol version 1)
//!
//! 画面のDOM構造やAJAXコマンドを観察して決めた値。ポータル側の変更はここの差分で吸収する。

use std::fmt;
use std::str::FromStr;

use crate::error::FetchError;

pub const PROTOCOL_VERSION: u32 = 1;

pub const PORTAL_BASE_URL: &str = "https://konto.flatex.at/banking-flatex.at/";
pub const SSO_URL: &str = "https://www.flatex.at/sso";

/// 初回レスポンス前に送るウィンドウID/トークンの仮値
pub const PLACEHOLDER_ID: &str = "x";

/// AJAXリクエストに付与する固定ヘッダ
pub const AJAX_HEADERS: [(&str, &str); 3] = [
    ("X-Requested-With", "XMLHttpRequest"),
    ("Accept", "*/*"),
    ("X-AJAX", "true"),
];
pub const WINDOW_ID_HEADER: &str = "X-windowId";
pub const TOKEN_ID_HEADER: &str = "X-tokenId";

/// AJAXレスポンスのコマンド種別
pub const COMMAND_FULL_PAGE_REPLACE: &str = "fullPageReplace";
pub const COMMAND_EXECUTE: &str = "execute";

/// SSOログインフォーム
pub const SSO_USER_FIELD: &str = "tx_flatexaccounts_singlesignonbanking[uname_app]";
pub const SSO_PASSWORD_FIELD: &str = "tx_flatexaccounts_singlesignonbanking[password_app]";
pub const SSO_SESSION_PASS_FIELD: &str = "tx_flatexaccounts_singlesignonbanking[sessionpass]";

/// 日付範囲コンポーネント
pub const START_DATE_FIELD: &str = "dateRangeComponent.startDate.text";
pub const END_DATE_FIELD: &str = "dateRangeComponent.endDate.text";
pub const RETRIEVAL_PERIOD_FIELD: &str =
    "dateRangeComponent.retrievalPeriodSelection.selecteditemindex";
/// 期間選択 "任意の期間"
pub const RETRIEVAL_PERIOD_CUSTOM: &str = "5";

/// 書類アーカイブ一覧
pub const ARCHIVE_LIST_ENDPOINT: &str = "documentArchiveListFormAction.do";
pub const ARCHIVE_FILTER_BUTTON_FIELD: &str = "applyFilterButton.clicked";
pub const ARCHIVE_ROW_FIELD: &str = "documentArchiveListTable.selectedrowidx";
/// 口座・カテゴリ・既読状態は先頭項目のみ対応
pub const ARCHIVE_DEFAULTS: [(&str, &str); 5] = [
    ("accountSelection.account.selecteditemindex", "0"),
    ("documentCategory.selecteditemindex", "0"),
    ("readState.selecteditemindex", "0"),
    (RETRIEVAL_PERIOD_FIELD, RETRIEVAL_PERIOD_CUSTOM),
    ("storeSettings.checked", "off"),
];

/// CSVエクスポート画面の共通フィールド
pub const CSV_RANGE_DEFAULTS: [(&str, &str); 3] = [
    ("depositSelection.deposit.selecteditemindex", "0"),
    ("searchType.selecteditemindex", "0"),
    (RETRIEVAL_PERIOD_FIELD, RETRIEVAL_PERIOD_CUSTOM),
];

/// テーブル操作コンボボックスのクリックを送る汎用エンドポイント
pub const AJAX_COMMAND_ENDPOINT: &str = "ajaxCommandServlet";
pub const TRIGGER_ACTION_COMMAND: &str = "triggerAction";
pub const TRIGGER_EVENT_TYPE: &str = "click";
/// エクスポート項目はコンボボックスの2番目
pub const EXPORT_WIDGET_NAME: &str = "tableActionCombobox.entries[1]";
pub const EXPORT_WIDGET_ID_SUFFIX: &str = "_tableActionCombobox_entriesI1I";

/// トークン更新マーカー (`webcore.setTokenId("...")`)
pub const TOKEN_PATTERN: &str = r#"\bwebcore\.setTokenId\s*\(\s*"(.*?)""#;
/// ダウンロード完了コールバック。拡張子は [`DocumentKind`] ごとに付け足す
pub const DOWNLOAD_CALLBACK: &str = r"\bDownloadDocumentBrowserBehaviorsClick\.finished\(";

/// ボットチェック画面の本文に含まれる文字列
pub const BOT_CHALLENGE_MARKER: &str =
    "Please wait while we are checking your browser for security issues";

/// 1回のアーカイブ検索で取りこぼしが出ない日数
pub const ARCHIVE_WINDOW_DAYS: i64 = 14;

/// ポータルの日付表記
pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// ダウンロードURLの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Csv,
}

impl DocumentKind {
    pub fn extension(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Csv => "csv",
        }
    }
}

/// CSVエクスポートの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvKind {
    /// 取引一覧
    Transactions,
    /// 口座明細
    Account,
}

impl CsvKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CsvKind::Transactions => "transactions",
            CsvKind::Account => "account",
        }
    }

    pub fn endpoint(self) -> &'static str {
        match self {
            CsvKind::Transactions => "depositTransactionsFormAction.do",
            CsvKind::Account => "accountPostingsFormAction.do",
        }
    }

    pub fn form_name(self) -> &'static str {
        match self {
            CsvKind::Transactions => "depositTransactionsForm",
            CsvKind::Account => "accountPostingsForm",
        }
    }

    pub fn export_widget_id(self) -> String {
        format!("{}{}", self.form_name(), EXPORT_WIDGET_ID_SUFFIX)
    }
}

impl fmt::Display for CsvKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CsvKind {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transactions" => Ok(CsvKind::Transactions),
            "account" => Ok(CsvKind::Account),
            other => Err(FetchError::Usage(format!("unknown csv kind: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_kind_mapping() {
        assert_eq!(
            CsvKind::Transactions.endpoint(),
            "depositTransactionsFormAction.do"
        );
        assert_eq!(
            CsvKind::Account.export_widget_id(),
            "accountPostingsForm_tableActionCombobox_entriesI1I"
        );
    }

    #[test]
    fn test_csv_kind_from_str() {
        assert_eq!("account".parse::<CsvKind>().unwrap(), CsvKind::Account);
        assert_eq!(
            "transactions".parse::<CsvKind>().unwrap().to_string(),
            "transactions"
        );
        assert!(matches!(
            "positions".parse::<CsvKind>(),
            Err(FetchError::Usage(_))
        ));
    }
}
