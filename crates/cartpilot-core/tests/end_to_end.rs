//! Full start path against a mocked config service: sealed HTTP payloads,
//! a file-backed cache and a recording page.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use cartpilot_contracts::{AutomationConfig, Command, Merchant, Message, Selector, decode_str};
use cartpilot_core::bridge::dispatched_payload;
use cartpilot_core::{ConfigCache, Engine, EngineSettings, HttpConfigClient, StartOutcome};
use cartpilot_storage::{CacheFileStore, PayloadCipher};
use cartpilot_traits::ScriptEnvironment;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "integration-key";
const CLIENT: &str = "client-e2e";

#[derive(Default)]
struct RecordingPage {
    scripts: Mutex<Vec<String>>,
}

impl RecordingPage {
    fn messages(&self) -> Vec<Message> {
        self.scripts
            .lock()
            .unwrap()
            .iter()
            .filter_map(|script| dispatched_payload(script))
            .map(|payload| decode_str(payload).unwrap())
            .collect()
    }
}

#[async_trait]
impl ScriptEnvironment for RecordingPage {
    async fn evaluate(&self, script: &str) -> Result<()> {
        self.scripts.lock().unwrap().push(script.to_string());
        Ok(())
    }
}

fn sealed(value: &impl serde::Serialize) -> String {
    PayloadCipher::from_shared_key(KEY)
        .seal(&serde_json::to_vec(value).unwrap())
}

fn shop_a() -> AutomationConfig {
    AutomationConfig {
        version: 1.2,
        task_id: "task-a".into(),
        shop_id: "A".into(),
        shop_name: "Shop A".into(),
        shop_url: "shop-a\\.com".into(),
        checkout_url: "/checkout".into(),
        extended_logs: false,
        extended_reports: false,
        inspect: vec![Command::Wait {
            response: None,
            timeout: 250,
        }],
        detect: Vec::new(),
        apply: Vec::new(),
        apply_best: Vec::new(),
        selectors_to_check: vec![Selector::css("#promo")],
    }
}

async fn mock_service(server: &MockServer, shop_fetches: u64) {
    let merchants = vec![Merchant {
        shop_name: "Shop A".into(),
        shop_id: "A".into(),
        shop_url: "shop-a\\.com".into(),
        checkout_url: "/checkout".into(),
    }];
    Mock::given(method("GET"))
        .and(path("/shop/urls"))
        .and(query_param("clientID", CLIENT))
        .respond_with(ResponseTemplate::new(200).set_body_string(sealed(&merchants)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shop/defaultConfigs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sealed(&json!([]))))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shop/A"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sealed(&shop_a())))
        .expect(shop_fetches)
        .mount(server)
        .await;
}

fn engine_for(
    server: &MockServer,
    cache_path: &std::path::Path,
    page: Arc<RecordingPage>,
) -> Engine {
    let settings = EngineSettings::new(server.uri(), CLIENT, KEY);
    let client = Arc::new(HttpConfigClient::new(&settings).unwrap());
    let cache = Arc::new(ConfigCache::new(
        client.clone(),
        CacheFileStore::new(cache_path),
        &settings,
    ));
    Engine::new(settings, page, client, cache)
}

#[tokio::test]
async fn checkout_page_receives_init_with_fetched_config() {
    let server = MockServer::start().await;
    mock_service(&server, 1).await;
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("config-cache.json");
    let page = Arc::new(RecordingPage::default());

    let engine = engine_for(&server, &cache_path, page.clone());
    engine.install().await;
    let outcome = engine
        .start_engine(
            "https://shop-a.com/checkout/step1",
            vec!["SAVE5".into(), "SAVE10".into()],
        )
        .await
        .unwrap();

    assert_eq!(
        outcome,
        StartOutcome::Started {
            shop_id: "A".into(),
            checkout: true,
        }
    );

    let messages = page.messages();
    assert_eq!(messages.len(), 1);
    let Message::Init(init) = &messages[0] else {
        panic!("expected init, got {:?}", messages[0]);
    };
    assert!(init.checkout);
    assert_eq!(init.promocodes, vec!["SAVE5", "SAVE10"]);
    assert_eq!(init.persisted_state, None);
    assert_eq!(init.decoded_config().unwrap().unwrap(), shop_a());

    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&cache_path).unwrap()).unwrap();
    assert_eq!(on_disk["A"]["config"]["shopId"], "A");
}

#[tokio::test]
async fn second_engine_reuses_the_durable_cache() {
    let server = MockServer::start().await;
    mock_service(&server, 1).await;
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("config-cache.json");

    let first = engine_for(&server, &cache_path, Arc::new(RecordingPage::default()));
    first.install().await;
    first
        .start_engine("https://shop-a.com/cart", Vec::new())
        .await
        .unwrap();

    // The shop config mock expects a single hit; the second engine must
    // be served from the file written by the first.
    let page = Arc::new(RecordingPage::default());
    let second = engine_for(&server, &cache_path, page.clone());
    second.install().await;
    let outcome = second
        .start_engine("https://shop-a.com/cart", Vec::new())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        StartOutcome::Started {
            shop_id: "A".into(),
            checkout: false,
        }
    );
    assert!(matches!(page.messages()[0], Message::Init(_)));
}

#[tokio::test]
async fn unknown_storefront_gets_check() {
    let server = MockServer::start().await;
    mock_service(&server, 0).await;
    let dir = tempfile::tempdir().unwrap();
    let page = Arc::new(RecordingPage::default());

    let engine = engine_for(&server, &dir.path().join("cache.json"), page.clone());
    engine.install().await;
    let outcome = engine
        .start_engine("https://elsewhere.example/checkout", Vec::new())
        .await
        .unwrap();

    assert_eq!(outcome, StartOutcome::NoConfig);
    assert!(matches!(page.messages()[0], Message::Check(_)));
}
