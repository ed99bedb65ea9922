//! HTTP client for the config service.
//!
//! Every `GET` body is sealed with the pre-shared key: the client opens it
//! with [`PayloadCipher`] and then JSON-decodes the plaintext. Failures are
//! logged and degrade to an empty list or `None` at the [`ConfigSource`]
//! seam.

use std::time::Duration;

use async_trait::async_trait;
use cartpilot_contracts::{AutomationConfig, LogEvent, Merchant};
use cartpilot_storage::PayloadCipher;
use cartpilot_traits::{ConfigSource, TelemetrySink};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

use crate::error::TransportError;
use crate::settings::EngineSettings;

/// Default timeout for config service calls (seconds)
const API_TIMEOUT_SECS: u64 = 30;

pub struct HttpConfigClient {
    client: Client,
    base_url: Url,
    client_id: String,
    cipher: PayloadCipher,
}

impl HttpConfigClient {
    pub fn new(settings: &EngineSettings) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: Url::parse(&settings.server_url)?,
            client_id: settings.client_id.clone(),
            cipher: PayloadCipher::from_shared_key(&settings.shared_key),
        })
    }

    /// Replace the HTTP client, e.g. to share a connection pool.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut().append_pair("clientID", &self.client_id);
        Ok(url)
    }

    async fn fetch_sealed<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, TransportError> {
        let url = self.endpoint(segments)?;
        debug!(url = %url, "Fetching sealed payload");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(TransportError::Status(status));
        }

        let body = response.text().await?;
        let plaintext = self.cipher.open(&body)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }

    pub async fn merchants(&self) -> Result<Vec<Merchant>, TransportError> {
        self.fetch_sealed(&["shop", "urls"]).await
    }

    pub async fn default_configs(&self) -> Result<Vec<AutomationConfig>, TransportError> {
        self.fetch_sealed(&["shop", "defaultConfigs"]).await
    }

    pub async fn shop_config(&self, shop_id: &str) -> Result<AutomationConfig, TransportError> {
        self.fetch_sealed(&["shop", shop_id]).await
    }

    /// `POST /logs` with `{event, clientID}`.
    pub async fn send_log(&self, event: &LogEvent) -> Result<(), TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push("logs");

        let response = self
            .client
            .post(url)
            .json(&json!({ "event": event, "clientID": self.client_id }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(TransportError::Status(response.status()));
        }
        Ok(())
    }
}

#[async_trait]
impl ConfigSource for HttpConfigClient {
    async fn fetch_merchants(&self) -> Vec<Merchant> {
        self.merchants().await.unwrap_or_else(|err| {
            warn!(error = %err, "Failed to fetch merchant list");
            Vec::new()
        })
    }

    async fn fetch_default_configs(&self) -> Vec<AutomationConfig> {
        self.default_configs().await.unwrap_or_else(|err| {
            warn!(error = %err, "Failed to fetch default configs");
            Vec::new()
        })
    }

    async fn fetch_shop_config(&self, shop_id: &str) -> Option<AutomationConfig> {
        match self.shop_config(shop_id).await {
            Ok(config) => Some(config),
            Err(err) => {
                warn!(shop_id = %shop_id, error = %err, "Failed to fetch shop config");
                None
            }
        }
    }
}

#[async_trait]
impl TelemetrySink for HttpConfigClient {
    async fn log(&self, event: LogEvent) {
        if let Err(err) = self.send_log(&event).await {
            debug!(kind = %event.kind, error = %err, "Dropped telemetry record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{config_for, merchant};
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEY: &str = "shared-secret";

    fn client_for(server: &MockServer) -> HttpConfigClient {
        let settings = EngineSettings::new(server.uri(), "client-7", KEY);
        HttpConfigClient::new(&settings).unwrap()
    }

    fn sealed(value: &impl serde::Serialize) -> String {
        PayloadCipher::from_shared_key(KEY)
            .seal(&serde_json::to_vec(value).unwrap())
    }

    #[tokio::test]
    async fn test_fetch_merchants_decrypts_body() {
        let server = MockServer::start().await;
        let merchants = vec![merchant("A", "shop-a\\.com", "/checkout")];
        Mock::given(method("GET"))
            .and(path("/shop/urls"))
            .and(query_param("clientID", "client-7"))
            .respond_with(ResponseTemplate::new(200).set_body_string(sealed(&merchants)))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.fetch_merchants().await, merchants);
    }

    #[tokio::test]
    async fn test_fetch_shop_config() {
        let server = MockServer::start().await;
        let config = config_for("A", "shop-a\\.com", "/checkout");
        Mock::given(method("GET"))
            .and(path("/shop/A"))
            .respond_with(ResponseTemplate::new(200).set_body_string(sealed(&config)))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.fetch_shop_config("A").await, Some(config));
    }

    #[tokio::test]
    async fn test_non_200_degrades_to_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.fetch_default_configs().await.is_empty());
        assert!(matches!(
            client.merchants().await,
            Err(TransportError::Status(status)) if status.as_u16() == 503
        ));
    }

    #[tokio::test]
    async fn test_wrong_key_degrades_to_none() {
        let server = MockServer::start().await;
        let body = PayloadCipher::from_shared_key("other-key").seal(br#"{"shopId":"A"}"#);
        Mock::given(method("GET"))
            .and(path("/shop/A"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let client = client_for(&server);
        // A wrong passphrase almost always breaks the padding; when it does
        // not, the plaintext is garbage JSON.
        assert!(matches!(
            client.shop_config("A").await,
            Err(TransportError::Decrypt(_) | TransportError::Decode(_))
        ));
        assert_eq!(client.fetch_shop_config("A").await, None);
    }

    #[tokio::test]
    async fn test_undecodable_plaintext_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/shop/urls"))
            .respond_with(ResponseTemplate::new(200).set_body_string(sealed(&json!({"not": "a list"}))))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(matches!(client.merchants().await, Err(TransportError::Decode(_))));
    }

    #[tokio::test]
    async fn test_log_posts_event_with_client_id() {
        let server = MockServer::start().await;
        let event = LogEvent {
            kind: "apply".into(),
            shop: "A".into(),
            total: None,
            code: Some("SAVE".into()),
            valid: Some(true),
            message: None,
            discount: None,
            codes: None,
            layout_page: None,
        };
        Mock::given(method("POST"))
            .and(path("/logs"))
            .and(body_json(json!({"event": event, "clientID": "client-7"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).log(event).await;
    }

    #[test]
    fn test_endpoint_keeps_base_path_and_encodes_segments() {
        let settings = EngineSettings::new("https://config.example/api/", "c 1", KEY);
        let client = HttpConfigClient::new(&settings).unwrap();
        let url = client.endpoint(&["shop", "a/b"]).unwrap();
        assert_eq!(url.as_str(), "https://config.example/api/shop/a%2Fb?clientID=c+1");
    }
}
