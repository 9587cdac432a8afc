use tracing::{debug, info};
use url::Url;

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::traits::{PortalRequest, PortalTransport};

use super::extract::AjaxResponse;
use super::protocol::{
    AJAX_HEADERS, PLACEHOLDER_ID, SSO_PASSWORD_FIELD, SSO_SESSION_PASS_FIELD, SSO_USER_FIELD,
    TOKEN_ID_HEADER, WINDOW_ID_HEADER,
};

/// ログイン済みブラウザを模したポータルセッション
///
/// リクエストごとにレスポンスからトークンとウィンドウIDを拾い、次のリクエストのヘッダに載せる。
/// 状態が直前のレスポンスに依存するため、POSTは必ず順番に発行すること。
pub struct PortalSession<T> {
    transport: T,
    base_url: Url,
    sso_url: Url,
    token_id: Option<String>,
    window_id: Option<String>,
}

impl<T: PortalTransport> PortalSession<T> {
    pub fn new(transport: T, config: &FetchConfig) -> Self {
        Self {
            transport,
            base_url: config.base_url.clone(),
            sso_url: config.sso_url.clone(),
            token_id: None,
            window_id: None,
        }
    }

    pub fn token_id(&self) -> Option<&str> {
        self.token_id.as_deref()
    }

    pub fn window_id(&self) -> Option<&str> {
        self.window_id.as_deref()
    }

    /// SSOにログインする
    ///
    /// 成否は確認しない。失敗していれば後続のリクエストが使えない内容を返す。
    pub async fn login(&mut self, user_id: &str, password: &str) -> Result<(), FetchError> {
        info!("Signing in as {}", user_id);

        let mut request = PortalRequest::new(self.sso_url.clone());
        request.form = vec![
            (SSO_USER_FIELD.to_string(), user_id.to_string()),
            (SSO_PASSWORD_FIELD.to_string(), password.to_string()),
            (SSO_SESSION_PASS_FIELD.to_string(), String::new()),
        ];

        let body = self.transport.post_form(request).await?;
        debug!("SSO response: {} bytes", body.len());
        Ok(())
    }

    /// ポータル相対パスを絶対URLにする
    pub fn resolve(&self, path: &str) -> Result<Url, FetchError> {
        Ok(self.base_url.join(path)?)
    }

    /// AJAXリクエストを送り、レスポンスでセッション状態を更新する
    pub async fn post(
        &mut self,
        endpoint: &str,
        form: Vec<(String, String)>,
    ) -> Result<AjaxResponse, FetchError> {
        let mut request = PortalRequest::new(self.resolve(endpoint)?);
        request.headers = self.ajax_headers();
        request.form = form;

        let body = self.transport.post_form(request).await?;
        let response = AjaxResponse::parse(&body)?;
        self.absorb(&response);

        debug!(
            "{} -> {} command(s) {:?}",
            endpoint,
            response.commands.len(),
            response.command_kinds()
        );
        Ok(response)
    }

    /// ダウンロードURLの本文を取得する
    pub async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        self.transport.get_bytes(url).await
    }

    fn ajax_headers(&self) -> Vec<(&'static str, String)> {
        let mut headers: Vec<(&'static str, String)> = AJAX_HEADERS
            .iter()
            .map(|(name, value)| (*name, value.to_string()))
            .collect();
        headers.push((
            WINDOW_ID_HEADER,
            self.window_id.as_deref().unwrap_or(PLACEHOLDER_ID).to_string(),
        ));
        headers.push((
            TOKEN_ID_HEADER,
            self.token_id.as_deref().unwrap_or(PLACEHOLDER_ID).to_string(),
        ));
        headers
    }

    fn absorb(&mut self, response: &AjaxResponse) {
        if let Some(token) = response.token_id() {
            debug!("Token rotated");
            self.token_id = Some(token);
        }
        if let Some(window) = response.window_id() {
            if self.window_id.as_deref() != Some(window.as_str()) {
                debug!("Window id is now {}", window);
            }
            self.window_id = Some(window);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{envelope, full_page_replace, MockTransport};

    fn session(mock: &MockTransport) -> PortalSession<MockTransport> {
        PortalSession::new(mock.clone(), &FetchConfig::default())
    }

    #[tokio::test]
    async fn test_first_request_uses_placeholders() {
        let mock = MockTransport::new();
        mock.push_post(envelope(vec![]));
        let mut session = session(&mock);

        session
            .post("documentArchiveListFormAction.do", vec![])
            .await
            .unwrap();

        let sent = mock.posts();
        assert_eq!(
            sent[0].url.as_str(),
            "https://konto.flatex.at/banking-flatex.at/documentArchiveListFormAction.do"
        );
        assert_eq!(sent[0].header("X-tokenId"), Some("x"));
        assert_eq!(sent[0].header("X-windowId"), Some("x"));
        assert_eq!(sent[0].header("X-Requested-With"), Some("XMLHttpRequest"));
        assert_eq!(sent[0].header("X-AJAX"), Some("true"));
        assert_eq!(sent[0].header("Accept"), Some("*/*"));
    }

    #[tokio::test]
    async fn test_token_propagates_to_next_request() {
        let mock = MockTransport::new();
        mock.push_post(envelope(vec![full_page_replace("tok-1", Some("win-9"))]));
        mock.push_post(envelope(vec![]));
        mock.push_post(envelope(vec![full_page_replace("tok-2", None)]));
        mock.push_post(envelope(vec![]));
        let mut session = session(&mock);

        for _ in 0..4 {
            session.post("a.do", vec![]).await.unwrap();
        }

        let tokens: Vec<_> = mock
            .posts()
            .iter()
            .map(|r| r.header("X-tokenId").unwrap().to_string())
            .collect();
        assert_eq!(tokens, vec!["x", "tok-1", "tok-1", "tok-2"]);

        let windows: Vec<_> = mock
            .posts()
            .iter()
            .map(|r| r.header("X-windowId").unwrap().to_string())
            .collect();
        assert_eq!(windows, vec!["x", "win-9", "win-9", "win-9"]);
        assert_eq!(session.token_id(), Some("tok-2"));
    }

    #[tokio::test]
    async fn test_unusable_response_is_error() {
        let mock = MockTransport::new();
        mock.push_post("<html>checking your browser</html>");
        let mut session = session(&mock);

        let result = session.post("a.do", vec![]).await;
        assert!(matches!(result, Err(FetchError::Json(_))));
        assert_eq!(session.token_id(), None);
    }

    #[tokio::test]
    async fn test_login_posts_credentials_to_sso() {
        let mock = MockTransport::new();
        mock.push_post("<html>welcome</html>");
        let mut session = session(&mock);

        session.login("1234567", "hunter2").await.unwrap();

        let sent = mock.posts();
        assert_eq!(sent[0].url.as_str(), "https://www.flatex.at/sso");
        assert_eq!(sent[0].field(SSO_USER_FIELD), Some("1234567"));
        assert_eq!(sent[0].field(SSO_PASSWORD_FIELD), Some("hunter2"));
        assert_eq!(sent[0].field(SSO_SESSION_PASS_FIELD), Some(""));
        assert!(sent[0].headers.is_empty());
    }

    #[test]
    fn test_resolve_relative_and_absolute_paths() {
        let session = session(&MockTransport::new());
        assert_eq!(
            session.resolve("docs/a.pdf").unwrap().as_str(),
            "https://konto.flatex.at/banking-flatex.at/docs/a.pdf"
        );
        assert_eq!(
            session.resolve("/other/b.pdf").unwrap().as_str(),
            "https://konto.flatex.at/other/b.pdf"
        );
    }
}
