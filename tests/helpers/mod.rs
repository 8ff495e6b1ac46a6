use deploy_relay::config::Settings;
use deploy_relay::{AppState, build_router};
use std::path::PathBuf;
use std::sync::Arc;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "123:abc";

/// Relay served on an ephemeral port, with a mock standing in for both the
/// Telegram API and the production URL.
pub struct TestRelay {
    pub url: String,
    pub mock: MockServer,
    pub client: reqwest::Client,
}

impl TestRelay {
    pub async fn start(pull_cmd: &str, restart_cmd: &str, health_status: u16) -> Self {
        Self::start_with_telegram_status(pull_cmd, restart_cmd, health_status, 200).await
    }

    pub async fn start_with_telegram_status(
        pull_cmd: &str,
        restart_cmd: &str,
        health_status: u16,
        telegram_status: u16,
    ) -> Self {
        let mock = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path_regex(r"^/bot.*/sendMessage$"))
            .respond_with(
                ResponseTemplate::new(telegram_status)
                    .set_body_json(serde_json::json!({"ok": telegram_status == 200})),
            )
            .mount(&mock)
            .await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(health_status))
            .mount(&mock)
            .await;

        let config = Settings {
            app_name: Some("shop".to_string()),
            pull_cmd: Some(pull_cmd.to_string()),
            restart_cmd: Some(restart_cmd.to_string()),
            prod_url: Some(format!("{}/health", mock.uri())),
            bot_token: Some(TOKEN.to_string()),
            chat_id: Some(42),
            shell: Some("sh".to_string()),
            command_timeout_secs: Some(30),
            http_timeout_secs: Some(5),
            telegram_api: Some(mock.uri()),
            ..Settings::default()
        }
        .into_config()
        .expect("valid test config");

        let state = Arc::new(AppState::new(config).expect("app state"));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.ok();
        });

        Self {
            url: format!("http://{addr}"),
            mock,
            client: reqwest::Client::new(),
        }
    }

    pub fn prod_url(&self) -> String {
        format!("{}/health", self.mock.uri())
    }

    pub async fn post_webhook(&self, body: impl Into<reqwest::Body>) -> reqwest::Response {
        self.client
            .post(format!("{}/webhook", self.url))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .expect("webhook request")
    }

    /// Bodies of every sendMessage call, in arrival order.
    pub async fn telegram_messages(&self) -> Vec<serde_json::Value> {
        self.mock
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path().ends_with("/sendMessage"))
            .map(|r| serde_json::from_slice(&r.body).expect("json body"))
            .collect()
    }

    pub async fn health_checks(&self) -> usize {
        self.mock
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == "/health")
            .count()
    }
}

pub fn push_payload() -> serde_json::Value {
    serde_json::json!({
        "repository": {"html_url": "https://x/shop"},
        "sender": {"html_url": "https://x/alice"},
        "commits": [{
            "message": "fix_bug",
            "author": {"name": "Alice", "Username": "alice"},
            "url": "https://x/commit/1",
            "timestamp": "2024-01-01T00:00:00Z"
        }]
    })
}

/// A path under the temp dir that no other test uses.
pub fn marker_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("deploy_relay_{}_{}", name, uuid::Uuid::now_v7()))
}

pub fn buttons(message: &serde_json::Value) -> Vec<(String, String)> {
    message["reply_markup"]["inline_keyboard"]
        .as_array()
        .map(|rows| {
            rows.iter()
                .flat_map(|row| row.as_array().cloned().unwrap_or_default())
                .map(|b| {
                    (
                        b["text"].as_str().unwrap_or_default().to_string(),
                        b["url"].as_str().unwrap_or_default().to_string(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}
