//! REST client for the Certwatch API

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use certwatch_session::TokenSource;
use certwatch_shared::config::ApiSettings;
use reqwest::{multipart, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::assets::AssetFetcher;
use crate::error::{ClientError, FetchError};
use crate::models::{
    Credentials, FlaggedDataDetail, MessageResponse, NewSearchSetting, SearchSettingDetail,
    SearchSettingSummary, TokenResponse,
};

/// Every request carries `Authorization: Bearer <token>` when the token source has one.
pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl ApiClient {
    pub fn new(settings: &ApiSettings, tokens: Arc<dyn TokenSource>) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /login/`. The returned token is not adopted here; see [`crate::AuthFlow`].
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, ClientError> {
        let request = self
            .request(Method::POST, "/login/")
            .json(&credentials(username, password));
        self.send_json(request).await
    }

    pub async fn signup(&self, username: &str, password: &str) -> Result<MessageResponse, ClientError> {
        let request = self
            .request(Method::POST, "/signup/")
            .json(&credentials(username, password));
        self.send_json(request).await
    }

    pub async fn list_search_settings(&self) -> Result<Vec<SearchSettingSummary>, ClientError> {
        self.send_json(self.request(Method::GET, "/search-settings/")).await
    }

    pub async fn get_search_setting(&self, id: i64) -> Result<SearchSettingDetail, ClientError> {
        let path = format!("/search-settings/{}/", id);
        self.send_json(self.request(Method::GET, &path)).await
    }

    /// `POST /search-settings/` as multipart form data, with the logo as a file part.
    pub async fn create_search_setting(&self, setting: NewSearchSetting) -> Result<MessageResponse, ClientError> {
        if setting.domain_base.trim().is_empty() || setting.tld.trim().is_empty() {
            return Err(ClientError::InvalidInput("domain base and TLD are required".into()));
        }

        let mut form = multipart::Form::new()
            .text("domain_base", setting.domain_base)
            .text("tld", setting.tld);
        if let Some(additional) = setting.additional_settings {
            form = form.text("additional_settings", additional.to_string());
        }
        if let Some(logo) = setting.logo {
            form = form.part("logo", multipart::Part::bytes(logo.bytes).file_name(logo.file_name));
        }

        let request = self.request(Method::POST, "/search-settings/").multipart(form);
        self.send_json(request).await
    }

    pub async fn delete_search_setting(&self, id: i64) -> Result<(), ClientError> {
        let path = format!("/search-settings/{}/", id);
        let response = self.request(Method::DELETE, &path).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    pub async fn get_flagged_data(&self, id: i64) -> Result<FlaggedDataDetail, ClientError> {
        let path = format!("/flagged-data/{}/", id);
        self.send_json(self.request(Method::GET, &path)).await
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!("{} {}", method, url);

        let builder = self.client.request(method, url);
        match self.tokens.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = ensure_success(request.send().await?).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl AssetFetcher for ApiClient {
    async fn fetch_asset(&self, locator: &str) -> Result<Bytes, FetchError> {
        let response = self
            .request(Method::GET, locator)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .bytes()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))
    }
}

fn credentials(username: &str, password: &str) -> Credentials {
    Credentials {
        username: username.to_string(),
        password: password.to_string(),
    }
}

async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    });
    warn!("API error ({}): {}", status, message);

    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

// The backend answers errors with either {"detail": ...} or {"msg": ...}.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let field = value.get("detail").or_else(|| value.get("msg"))?;
    match field {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LogoUpload;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    struct StaticToken(Option<&'static str>);

    impl TokenSource for StaticToken {
        fn bearer_token(&self) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    fn client(server: &MockServer, token: Option<&'static str>) -> ApiClient {
        let settings = ApiSettings {
            base_url: format!("{}/api/", server.uri()),
            timeout_seconds: 5,
        };
        ApiClient::new(&settings, Arc::new(StaticToken(token))).unwrap()
    }

    #[tokio::test]
    async fn test_login_posts_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/login/"))
            .and(body_json(json!({"username": "alice", "password": "s3cret"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "tok", "token_type": "bearer"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let token = client(&server, None).login("alice", "s3cret").await.unwrap();

        assert_eq!(token.access_token, "tok");
        assert_eq!(token.token_type.as_deref(), Some("bearer"));
    }

    #[tokio::test]
    async fn test_bearer_header_attached_when_token_present() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search-settings/"))
            .and(header("authorization", "Bearer abc.def.ghi"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "owner": "alice", "domain_base": "paypal", "tld": "com", "flagged_data_count": 3}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let settings = client(&server, Some("abc.def.ghi")).list_search_settings().await.unwrap();

        assert_eq!(settings.len(), 1);
        assert_eq!(settings[0].flagged_data_count, 3);
    }

    #[tokio::test]
    async fn test_no_authorization_header_without_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/search-settings/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let settings = client(&server, None).list_search_settings().await.unwrap();

        assert!(settings.is_empty());
    }

    #[tokio::test]
    async fn test_error_detail_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search-settings/5/"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(json!({"detail": "Not authorized to view this setting"})),
            )
            .mount(&server)
            .await;

        let err = client(&server, Some("t")).get_search_setting(5).await.unwrap_err();

        assert_eq!(err.status(), Some(403));
        assert_eq!(err.to_string(), "API error (403): Not authorized to view this setting");
    }

    #[tokio::test]
    async fn test_signup_duplicate_uses_msg() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/signup/"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"msg": "Username already registered"})),
            )
            .mount(&server)
            .await;

        let err = client(&server, None).signup("alice", "pw").await.unwrap_err();

        assert!(matches!(err, ClientError::Api { status: 400, ref message } if message == "Username already registered"));
    }

    #[tokio::test]
    async fn test_create_search_setting_sends_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/search-settings/"))
            .respond_with(|request: &Request| {
                let body = String::from_utf8_lossy(&request.body).to_string();
                let content_type = request
                    .headers
                    .get("content-type")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let ok = content_type.starts_with("multipart/form-data")
                    && body.contains("name=\"domain_base\"")
                    && body.contains("paypal")
                    && body.contains("{\"threshold\":2}")
                    && body.contains("filename=\"logo.png\"");
                if ok {
                    ResponseTemplate::new(200)
                        .set_body_json(json!({"message": "Search setting created successfully"}))
                } else {
                    ResponseTemplate::new(422)
                }
            })
            .expect(1)
            .mount(&server)
            .await;

        let created = client(&server, Some("t"))
            .create_search_setting(NewSearchSetting {
                domain_base: "paypal".into(),
                tld: "com".into(),
                additional_settings: Some(json!({"threshold": 2})),
                logo: Some(LogoUpload {
                    file_name: "logo.png".into(),
                    bytes: vec![0x89, b'P', b'N', b'G'],
                }),
            })
            .await
            .unwrap();

        assert_eq!(created.message, "Search setting created successfully");
    }

    #[tokio::test]
    async fn test_create_search_setting_requires_domain() {
        let server = MockServer::start().await;

        let err = client(&server, Some("t"))
            .create_search_setting(NewSearchSetting {
                domain_base: " ".into(),
                tld: "com".into(),
                additional_settings: None,
                logo: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_delete_search_setting() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/search-settings/8/"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server, Some("t")).delete_search_setting(8).await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_asset_maps_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/files/alice%2F9/logo.png"))
            .and(header("authorization", "Bearer t"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x89PNG".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/files/alice%2F9/gone.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let api = client(&server, Some("t"));

        let bytes = api.fetch_asset("/files/alice%2F9/logo.png").await.unwrap();
        assert_eq!(&bytes[..], b"\x89PNG");

        let err = api.fetch_asset("/files/alice%2F9/gone.png").await.unwrap_err();
        assert_eq!(err, FetchError::Status(404));
    }

    #[tokio::test]
    async fn test_fetch_asset_transport_error() {
        let settings = ApiSettings {
            base_url: "http://127.0.0.1:9/api/".into(),
            timeout_seconds: 1,
        };
        let api = ApiClient::new(&settings, Arc::new(StaticToken(None))).unwrap();

        let err = api.fetch_asset("/files/a/b.png").await.unwrap_err();

        assert!(matches!(err, FetchError::Transport(_)));
    }

    #[tokio::test]
    async fn test_configured_timeout_is_applied() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search-settings/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([]))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;
        let settings = ApiSettings {
            base_url: format!("{}/api/", server.uri()),
            timeout_seconds: 1,
        };
        let api = ApiClient::new(&settings, Arc::new(StaticToken(None))).unwrap();

        let err = api.list_search_settings().await.unwrap_err();

        assert!(matches!(err, ClientError::Http(ref e) if e.is_timeout()));
    }

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(error_message(r#"{"detail": "nope"}"#).as_deref(), Some("nope"));
        assert_eq!(error_message(r#"{"msg": "taken"}"#).as_deref(), Some("taken"));
        assert_eq!(
            error_message(r#"{"detail": [{"loc": ["body"], "msg": "field required"}]}"#).as_deref(),
            Some(r#"[{"loc":["body"],"msg":"field required"}]"#)
        );
        assert_eq!(error_message("<html>"), None);
    }
}
