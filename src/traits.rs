use async_trait::async_trait;
use url::Url;

use crate::error::FetchError;

/// フォーム送信1回分
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalRequest {
    pub url: Url,
    pub headers: Vec<(&'static str, String)>,
    pub form: Vec<(String, String)>,
}

impl PortalRequest {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            headers: Vec::new(),
            form: Vec::new(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// ポータルとのHTTP通信
///
/// Cookieの保持は実装側の責務。
#[async_trait]
pub trait PortalTransport: Send + Sync {
    /// フォームをPOSTしてレスポンス本文を返す
    async fn post_form(&self, request: PortalRequest) -> Result<String, FetchError>;

    /// GETしてレスポンス本文をバイト列で返す
    async fn get_bytes(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}
