//! AJAXレスポンスの解析
//!
//! ポータルは正式なAPIを持たないため、埋め込みスクリプトをパターンで拾う。
//! パターンに依存する処理はこのモジュールに閉じ込める。

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::FetchError;

use super::protocol::{
    DocumentKind, BOT_CHALLENGE_MARKER, COMMAND_EXECUTE, COMMAND_FULL_PAGE_REPLACE,
    DOWNLOAD_CALLBACK, TOKEN_PATTERN,
};

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(TOKEN_PATTERN).expect("token pattern compiles"));

static PDF_DOWNLOAD_RE: LazyLock<Regex> =
    LazyLock::new(|| download_regex(DocumentKind::Pdf));

static CSV_DOWNLOAD_RE: LazyLock<Regex> =
    LazyLock::new(|| download_regex(DocumentKind::Csv));

fn download_regex(kind: DocumentKind) -> Regex {
    let pattern = format!(r#"{}(".*?\.{}")"#, DOWNLOAD_CALLBACK, kind.extension());
    Regex::new(&pattern).expect("download pattern compiles")
}

/// AJAXレスポンスの封筒 (`{"commands": [...]}`)
#[derive(Debug, Clone, Deserialize)]
pub struct AjaxResponse {
    pub commands: Vec<AjaxCommand>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AjaxCommand {
    pub command: String,
    /// fullPageReplace の差し替えHTML
    #[serde(default)]
    pub content: Option<String>,
    /// execute のインラインスクリプト
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default, rename = "windowId")]
    pub window_id: Option<serde_json::Value>,
}

impl AjaxCommand {
    pub fn is(&self, kind: &str) -> bool {
        self.command == kind
    }

    /// ウィンドウIDは文字列でも数値でもヘッダ用の文字列にする
    pub fn window_id(&self) -> Option<String> {
        match self.window_id.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(id) => Some(id.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl AjaxResponse {
    pub fn parse(body: &str) -> Result<Self, FetchError> {
        Ok(serde_json::from_str(body)?)
    }

    /// 更新されたトークン。複数あれば最後のもの
    pub fn token_id(&self) -> Option<String> {
        self.commands
            .iter()
            .filter(|c| c.is(COMMAND_FULL_PAGE_REPLACE))
            .filter_map(|c| c.content.as_deref().and_then(extract_token))
            .last()
    }

    /// 更新されたウィンドウID。複数あれば最後のもの
    pub fn window_id(&self) -> Option<String> {
        self.commands.iter().filter_map(AjaxCommand::window_id).last()
    }

    /// 最初に見つかったダウンロードパス
    pub fn download_path(&self, kind: DocumentKind) -> Option<String> {
        self.commands
            .iter()
            .filter(|c| c.is(COMMAND_EXECUTE))
            .find_map(|c| {
                c.script
                    .as_deref()
                    .and_then(|script| extract_download_path(script, kind))
            })
    }

    pub fn command_kinds(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.command.as_str()).collect()
    }
}

/// `webcore.setTokenId("...")` からトークンを取り出す
pub fn extract_token(content: &str) -> Option<String> {
    TOKEN_RE
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// ダウンロード完了コールバックの第1引数 (JSON文字列リテラル) を取り出す
pub fn extract_download_path(script: &str, kind: DocumentKind) -> Option<String> {
    let re = match kind {
        DocumentKind::Pdf => &*PDF_DOWNLOAD_RE,
        DocumentKind::Csv => &*CSV_DOWNLOAD_RE,
    };
    let literal = re.captures(script)?.get(1)?.as_str();
    serde_json::from_str::<String>(literal).ok()
}

pub fn is_bot_challenge(body: &[u8]) -> bool {
    let marker = BOT_CHALLENGE_MARKER.as_bytes();
    body.windows(marker.len()).any(|window| window == marker)
}
