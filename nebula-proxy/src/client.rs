//! Proxy control-plane client (C7). §4.7.
//!
//! Grounded on the teacher's `ProxyService`/`MakeProxyService`
//! (`gateway/src/proxy.rs`) for the routing concept, generalized here to
//! an admin-API client rather than the proxy itself: the design brief
//! treats the data-plane proxy as an external collaborator and specifies
//! only the control-plane operations this crate calls.

use async_trait::async_trait;
use nebula_core::Slot;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::warn;

use crate::error::{ProxyError, Result};
use crate::types::Route;

#[async_trait]
pub trait ProxyClient: Send + Sync {
    async fn add_route(&self, route: Route) -> Result<()>;
    async fn update_route(&self, route: Route) -> Result<()>;
    async fn remove_route(&self, domain: &str) -> Result<()>;
    async fn get_route(&self, domain: &str) -> Result<Option<Route>>;
    async fn list_routes(&self) -> Result<Vec<Route>>;
    async fn switch_traffic(&self, domain: &str, slot: Slot) -> Result<()>;
    async fn provision_ssl(&self, domain: &str) -> Result<()>;
    async fn health_check(&self) -> Result<()>;
    async fn reload_config(&self) -> Result<()>;
}

/// Talks the JSON admin-API over HTTP. §6.
pub struct HttpProxyClient {
    base_url: String,
    http: Client,
}

impl HttpProxyClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    async fn ok_or_status(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(ProxyError::Status(response.status()))
        }
    }
}

#[async_trait]
impl ProxyClient for HttpProxyClient {
    async fn add_route(&self, route: Route) -> Result<()> {
        // Idempotent by domain: clear any existing route before writing
        // the new one. §4.7.
        let _ = self.remove_route(&route.domain).await;
        let response = self
            .http
            .post(self.url("/routes"))
            .json(&route)
            .send()
            .await?;
        Self::ok_or_status(response).await?;
        Ok(())
    }

    async fn update_route(&self, route: Route) -> Result<()> {
        let response = self
            .http
            .put(self.url(&format!("/routes/{}", route.domain)))
            .json(&route)
            .send()
            .await?;
        Self::ok_or_status(response).await?;
        Ok(())
    }

    async fn remove_route(&self, domain: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.url(&format!("/routes/{domain}")))
            .send()
            .await?;
        // §4.7: tolerant of missing routes, must return success.
        if response.status().is_success() || response.status() == reqwest::StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(ProxyError::Status(response.status()))
        }
    }

    async fn get_route(&self, domain: &str) -> Result<Option<Route>> {
        let response = self
            .http
            .get(self.url(&format!("/routes/{domain}")))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::ok_or_status(response).await?;
        Ok(Some(response.json().await?))
    }

    async fn list_routes(&self) -> Result<Vec<Route>> {
        let response = self.http.get(self.url("/routes")).send().await?;
        let response = Self::ok_or_status(response).await?;
        Ok(response.json().await?)
    }

    async fn switch_traffic(&self, domain: &str, slot: Slot) -> Result<()> {
        let response = self
            .http
            .post(self.url(&format!("/routes/{domain}/switch")))
            .json(&serde_json::json!({ "slot": slot }))
            .send()
            .await?;
        Self::ok_or_status(response).await?;
        Ok(())
    }

    async fn provision_ssl(&self, domain: &str) -> Result<()> {
        let response = self
            .http
            .post(self.url(&format!("/routes/{domain}/ssl")))
            .send()
            .await?;
        // May be a no-op if the proxy handles cert lifecycle autonomously.
        if response.status() == reqwest::StatusCode::NOT_IMPLEMENTED {
            return Ok(());
        }
        Self::ok_or_status(response).await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        let response = self.http.get(self.url("/healthz")).send().await?;
        Self::ok_or_status(response).await?;
        Ok(())
    }

    async fn reload_config(&self) -> Result<()> {
        let response = self.http.post(self.url("/reload")).send().await?;
        Self::ok_or_status(response).await?;
        Ok(())
    }
}

/// In-memory test fake, standing in for a live proxy in orchestrator and
/// strategy tests. Matches the teacher's preference for hand-written fakes
/// over mocking crates.
#[derive(Default)]
pub struct InMemoryProxyClient {
    routes: Mutex<HashMap<String, Route>>,
}

impl InMemoryProxyClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProxyClient for InMemoryProxyClient {
    async fn add_route(&self, route: Route) -> Result<()> {
        self.routes.lock().unwrap().insert(route.domain.clone(), route);
        Ok(())
    }

    async fn update_route(&self, route: Route) -> Result<()> {
        self.routes.lock().unwrap().insert(route.domain.clone(), route);
        Ok(())
    }

    async fn remove_route(&self, domain: &str) -> Result<()> {
        self.routes.lock().unwrap().remove(domain);
        Ok(())
    }

    async fn get_route(&self, domain: &str) -> Result<Option<Route>> {
        Ok(self.routes.lock().unwrap().get(domain).cloned())
    }

    async fn list_routes(&self) -> Result<Vec<Route>> {
        Ok(self.routes.lock().unwrap().values().cloned().collect())
    }

    async fn switch_traffic(&self, domain: &str, slot: Slot) -> Result<()> {
        if let Some(route) = self.routes.lock().unwrap().get_mut(domain) {
            route.slot = slot;
        } else {
            warn!(domain, "switch_traffic on unknown domain");
        }
        Ok(())
    }

    async fn provision_ssl(&self, domain: &str) -> Result<()> {
        if let Some(route) = self.routes.lock().unwrap().get_mut(domain) {
            route.ssl = true;
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    async fn reload_config(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Upstream;

    fn route(domain: &str) -> Route {
        Route::new(
            domain,
            Upstream {
                host: "localhost".into(),
                port: 8080,
            },
            Slot::Blue,
        )
    }

    #[tokio::test]
    async fn add_route_is_idempotent_by_domain() {
        let client = InMemoryProxyClient::new();
        client.add_route(route("app.example.com")).await.unwrap();
        let mut r2 = route("app.example.com");
        r2.slot = Slot::Green;
        client.add_route(r2.clone()).await.unwrap();

        let stored = client.get_route("app.example.com").await.unwrap().unwrap();
        assert_eq!(stored, r2);
        assert_eq!(client.list_routes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remove_route_is_idempotent() {
        let client = InMemoryProxyClient::new();
        client.remove_route("missing.example.com").await.unwrap();
        client.add_route(route("a.example.com")).await.unwrap();
        client.remove_route("a.example.com").await.unwrap();
        client.remove_route("a.example.com").await.unwrap();
        assert!(client.get_route("a.example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn switch_traffic_updates_slot() {
        let client = InMemoryProxyClient::new();
        client.add_route(route("a.example.com")).await.unwrap();
        client.switch_traffic("a.example.com", Slot::Green).await.unwrap();
        let stored = client.get_route("a.example.com").await.unwrap().unwrap();
        assert_eq!(stored.slot, Slot::Green);
    }
}
