use std::sync::Arc;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;
use url::Url;

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::traits::{PortalRequest, PortalTransport};

/// ポータルがセッションCookieと一緒に期待する値
const SESSION_LENGTH_SECS: &str = "1800";

/// reqwest による [`PortalTransport`] 実装
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder()
            .cookie_provider(session_jar(config))
            .timeout(config.timeout);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

/// 外部セッションIDを入れたCookieジャー
///
/// ポータル配下のどのパスにも送られるよう `Path=/` で登録する。
fn session_jar(config: &FetchConfig) -> Arc<Jar> {
    let jar = Arc::new(Jar::default());

    if let Some(session_id) = &config.session_id {
        jar.add_cookie_str(
            &format!("JSESSIONID={}; Path=/", session_id),
            &config.base_url,
        );
        jar.add_cookie_str(
            &format!("sessionLength={}; Path=/", SESSION_LENGTH_SECS),
            &config.base_url,
        );
        debug!("Seeded cookie jar with external session id");
    }

    jar
}

#[async_trait]
impl PortalTransport for HttpTransport {
    async fn post_form(&self, request: PortalRequest) -> Result<String, FetchError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let value = HeaderValue::from_str(value).map_err(|e| {
                FetchError::Protocol(format!("invalid header value for {}: {}", name, e))
            })?;
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                FetchError::Protocol(format!("invalid header name {}: {}", name, e))
            })?;
            headers.insert(name, value);
        }

        let response = self
            .client
            .post(request.url.clone())
            .headers(headers)
            .form(&request.form)
            .send()
            .await?;

        debug!(
            "POST {} -> {}",
            request.url.path(),
            response.status().as_u16()
        );
        Ok(response.text().await?)
    }

    async fn get_bytes(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url.clone()).send().await?;
        debug!("GET {} -> {}", url.path(), response.status().as_u16());
        Ok(response.bytes().await?.to_vec())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::cookie::CookieStore;

    fn cookies_for(jar: &Jar, url: &str) -> Option<String> {
        jar.cookies(&Url::parse(url).unwrap())
            .map(|value| value.to_str().unwrap().to_string())
    }

    #[test]
    fn test_session_cookie_sent_across_portal_paths() {
        let config = FetchConfig::default().with_session_id("abc123");
        let jar = session_jar(&config);

        for url in [
            "https://konto.flatex.at/banking-flatex.at/ajaxCommandServlet",
            "https://konto.flatex.at/banking-flatex.at/documentArchiveListFormAction.do",
            "https://konto.flatex.at/docs/Depotauszug.pdf",
        ] {
            let cookies = cookies_for(&jar, url).unwrap_or_default();
            assert!(cookies.contains("JSESSIONID=abc123"), "{}: {}", url, cookies);
            assert!(cookies.contains("sessionLength=1800"), "{}: {}", url, cookies);
        }
    }

    #[test]
    fn test_session_cookie_not_sent_to_other_hosts() {
        let config = FetchConfig::default().with_session_id("abc123");
        let jar = session_jar(&config);
        assert_eq!(cookies_for(&jar, "https://www.example.com/"), None);
    }

    #[test]
    fn test_no_session_id_leaves_jar_empty() {
        let jar = session_jar(&FetchConfig::default());
        assert_eq!(
            cookies_for(&jar, "https://konto.flatex.at/banking-flatex.at/"),
            None
        );
    }

    #[test]
    fn test_transport_builds_with_user_agent() {
        let config = FetchConfig::default()
            .with_session_id("abc123")
            .with_user_agent("Mozilla/5.0 (X11; Linux x86_64)");
        assert!(HttpTransport::new(&config).is_ok());
    }
}
