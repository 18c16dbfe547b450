#![allow(dead_code)]

use pricing_service::config::PricingConfig;
use pricing_service::services::{init_metrics, MemoryStore, StayDefaults};
use pricing_service::startup::Application;
use reqwest::{Client, Response};
use serde_json::Value;
use service_core::config::Config;
use std::sync::Arc;
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub campground_id: Uuid,
    client: Client,
}

impl TestApp {
    /// Spawn the service on a random port backed by a fresh in-memory store.
    pub async fn spawn() -> Self {
        init_metrics().expect("Failed to initialize metrics");

        let config = PricingConfig {
            common: Config {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            service_name: "pricing-service-test".to_string(),
            log_level: "warn".to_string(),
            otlp_endpoint: None,
            database: None,
            stay_defaults: StayDefaults::default(),
            max_quote_nights: 366,
        };

        let app = Application::with_store(config, Arc::new(MemoryStore::new()))
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server by polling the health endpoint
        let client = Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
        }

        TestApp {
            address,
            port,
            campground_id: Uuid::new_v4(),
            client,
        }
    }

    /// URL of a path under this app's campground.
    pub fn url(&self, path: &str) -> String {
        self.url_for(self.campground_id, path)
    }

    pub fn url_for(&self, campground_id: Uuid, path: &str) -> String {
        format!("{}/campgrounds/{}{}", self.address, campground_id, path)
    }

    pub async fn get(&self, url: &str) -> Response {
        self.client
            .get(url)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post(&self, url: &str, body: &Value) -> Response {
        self.client
            .post(url)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn patch(&self, url: &str, body: &Value) -> Response {
        self.client
            .patch(url)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, url: &str) -> Response {
        self.client
            .delete(url)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// POST under the campground and return the created resource, asserting 201.
    pub async fn create(&self, path: &str, body: Value) -> Value {
        let response = self.post(&self.url(path), &body).await;
        let status = response.status();
        let json: Value = response.json().await.expect("Failed to parse response");
        assert_eq!(status, 201, "create {} failed: {}", path, json);
        json
    }
}

/// `id` field of a created resource.
pub fn id_of(resource: &Value) -> String {
    resource["id"]
        .as_str()
        .expect("resource has no id")
        .to_string()
}
