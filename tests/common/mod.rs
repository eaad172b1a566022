//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;

use registration_intake::config::IntakeConfig;
use registration_intake::http::HttpServer;
use registration_intake::lifecycle::Shutdown;
use reqwest::{Client, Response};
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const CSRF_HEADER: &str = "x-csrf-token";

/// A gateway listening on an ephemeral local port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub client: Client,
    shutdown: Shutdown,
}

impl TestGateway {
    pub async fn start() -> Self {
        Self::start_with(IntakeConfig::default()).await
    }

    pub async fn start_with(mut config: IntakeConfig) -> Self {
        config.listener.bind_address = "127.0.0.1:0".to_string();
        config.sweeper.enabled = false;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::new();
        let server = HttpServer::new(config);
        let stop = shutdown.subscribe();
        tokio::spawn(async move {
            let _ = server.run(listener, stop).await;
        });

        let client = Client::builder()
            .pool_max_idle_per_host(0)
            .no_proxy()
            .build()
            .unwrap();

        Self {
            addr,
            client,
            shutdown,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Fetch a fresh anti-forgery token.
    pub async fn csrf_token(&self) -> String {
        let body: Value = self
            .client
            .get(self.url("/api/csrf-token"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        body["data"]["token"].as_str().unwrap().to_string()
    }

    /// Send a state-changing request carrying a freshly issued token.
    pub async fn send(&self, method: reqwest::Method, path: &str, body: Option<&Value>) -> Response {
        let token = self.csrf_token().await;
        let mut request = self
            .client
            .request(method, self.url(path))
            .header(CSRF_HEADER, token);
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await.unwrap()
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// A flat form that passes every stage against the default fixtures.
pub fn valid_form() -> Value {
    json!({
        "last_name": "山田",
        "first_name": "太郎",
        "last_name_kana": "ヤマダ",
        "first_name_kana": "タロウ",
        "email": "taro@example.jp",
        "email_confirmation": "taro@example.jp",
        "phone1": "090",
        "phone2": "1234",
        "phone3": "5678",
        "postal_code1": "100",
        "postal_code2": "0001",
        "prefecture": "東京都",
        "city": "千代田区",
        "town": "千代田",
        "district": "1丁目",
        "block": "1",
        "sub_block": "1",
        "building": "サンプルビル",
        "room": "101",
        "plan_code": "STANDARD",
        "option_codes[0]": "OPT_SUPPORT",
        "option_codes[1]": "OPT_STD_ROUTER",
    })
}

/// Read the response envelope.
pub async fn envelope(response: Response) -> Value {
    response.json().await.unwrap()
}
