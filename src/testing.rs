//! テスト用のモックトランスポートとレスポンス組み立て

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use url::Url;

use crate::error::FetchError;
use crate::traits::{PortalRequest, PortalTransport};

#[derive(Debug, Default)]
struct MockInner {
    post_responses: VecDeque<String>,
    get_responses: HashMap<String, Vec<u8>>,
    posts: Vec<PortalRequest>,
    gets: Vec<Url>,
}

/// 送信内容を記録し、キューに積んだ本文を順に返す
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockInner>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_post(&self, body: impl Into<String>) {
        self.inner
            .lock()
            .unwrap()
            .post_responses
            .push_back(body.into());
    }

    pub fn put_get(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.inner
            .lock()
            .unwrap()
            .get_responses
            .insert(url.to_string(), body.into());
    }

    pub fn posts(&self) -> Vec<PortalRequest> {
        self.inner.lock().unwrap().posts.clone()
    }

    pub fn gets(&self) -> Vec<Url> {
        self.inner.lock().unwrap().gets.clone()
    }

    pub fn pending_posts(&self) -> usize {
        self.inner.lock().unwrap().post_responses.len()
    }
}

#[async_trait]
impl PortalTransport for MockTransport {
    async fn post_form(&self, request: PortalRequest) -> Result<String, FetchError> {
        let mut inner = self.inner.lock().unwrap();
        let url = request.url.to_string();
        inner.posts.push(request);
        inner
            .post_responses
            .pop_front()
            .ok_or_else(|| FetchError::Protocol(format!("unexpected POST {}", url)))
    }

    async fn get_bytes(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let mut inner = self.inner.lock().unwrap();
        inner.gets.push(url.clone());
        inner
            .get_responses
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| FetchError::Protocol(format!("unexpected GET {}", url)))
    }
}

pub fn envelope(commands: Vec<Value>) -> String {
    json!({ "commands": commands }).to_string()
}

pub fn full_page_replace(token: &str, window_id: Option<&str>) -> Value {
    let mut command = json!({
        "command": "fullPageReplace",
        "content": format!("<html><script>webcore.setTokenId(\"{}\");</script></html>", token),
    });
    if let Some(window_id) = window_id {
        command["windowId"] = json!(window_id);
    }
    command
}

/// ダウンロード完了コールバックを含む execute コマンド
pub fn execute_download(path: &str) -> Value {
    let literal = serde_json::to_string(path).unwrap();
    execute_script(&format!(
        "webcore.busy(false);DownloadDocumentBrowserBehaviorsClick.finished({}, true);",
        literal
    ))
}

pub fn execute_script(script: &str) -> Value {
    json!({ "command": "execute", "script": script })
}
