use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::FetchError;
use crate::portal::protocol::{PORTAL_BASE_URL, SSO_URL};

#[derive(Clone)]
pub struct FetchConfig {
    pub base_url: Url,
    pub sso_url: Url,
    /// 外部で取得済みのセッションID (JSESSIONID)
    pub session_id: Option<String>,
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(PORTAL_BASE_URL).expect("PORTAL_BASE_URL is a valid URL"),
            sso_url: Url::parse(SSO_URL).expect("SSO_URL is a valid URL"),
            session_id: None,
            timeout: Duration::from_secs(60),
            user_agent: None,
        }
    }
}

// セッションIDはログに出さない
impl fmt::Debug for FetchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchConfig")
            .field("base_url", &self.base_url.as_str())
            .field("sso_url", &self.sso_url.as_str())
            .field("session_id", &self.session_id.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl FetchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// ベースURLを変更する
    ///
    /// 相対パスの解決に使うため、末尾の `/` がなければ補う。
    pub fn with_base_url(mut self, url: &str) -> Result<Self, FetchError> {
        let normalized = if url.ends_with('/') {
            url.to_string()
        } else {
            format!("{}/", url)
        };
        self.base_url = Url::parse(&normalized)?;
        Ok(self)
    }

    pub fn with_sso_url(mut self, url: &str) -> Result<Self, FetchError> {
        self.sso_url = Url::parse(url)?;
        Ok(self)
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}
