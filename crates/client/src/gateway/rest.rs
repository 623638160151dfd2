//! REST gateway for the remote realtime store.
//!
//! Speaks the store's row-oriented REST dialect: `GET /rest/v1/{table}` with
//! filter query parameters, `POST` for inserts (merge-duplicates for
//! upserts), `PATCH` for partial updates, and `POST /rest/v1/rpc/{fn}` for
//! the atomic stock decrement. Change feeds are polled: each subscription
//! owns a task that re-fetches its filtered rows on an interval and diffs
//! them against the rows it has already delivered, classifying unseen ids
//! as inserts and changed rows as updates.

use std::collections::HashMap;

use moka::future::Cache;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

use cardvault_core::{
    Broadcast, ChangeEvent, ChatMessage, MessageId, NewBroadcast, NewMessage, NewProduct, Product,
    ProductId, SessionId, StockLevel, Visitor, VisitorUpsert,
};

use crate::config::GatewayConfig;

use super::{Gateway, GatewayError, Subscription};

const T_PRODUCTS: &str = "products";
const T_VISITORS: &str = "visitors";
const T_MESSAGES: &str = "messages";
const T_NOTIFICATIONS: &str = "notifications";

const FEED_CAPACITY: usize = 64;

/// Gateway over the remote store's REST surface.
#[derive(Debug, Clone)]
pub struct RestGateway {
    client: reqwest::Client,
    rest_base: String,
    poll_interval: std::time::Duration,
    product_cache: Cache<(), Vec<Product>>,
}

impl RestGateway {
    /// Build a gateway from connection settings.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the API key is not a valid header value or
    /// the HTTP client fails to build.
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();

        let key = config.api_key.expose_secret();
        let key_value = HeaderValue::from_str(key)
            .map_err(|e| GatewayError::Unavailable(format!("invalid API key format: {e}")))?;
        headers.insert("apikey", key_value);

        let bearer = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|e| GatewayError::Unavailable(format!("invalid API key format: {e}")))?;
        headers.insert(AUTHORIZATION, bearer);

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        let rest_base = format!("{}/rest/v1", config.url.as_str().trim_end_matches('/'));

        let product_cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            client,
            rest_base,
            poll_interval: config.poll_interval,
            product_cache,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{table}", self.rest_base)
    }

    async fn fetch<T: DeserializeOwned>(&self, url: &str) -> Result<T, GatewayError> {
        let response = self.client.get(url).send().await?;
        read_json(response).await
    }

    /// Insert rows with `Prefer: return=representation`, returning the
    /// committed row.
    async fn insert_returning<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        let response = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        let mut rows: Vec<T> = read_json(response).await?;
        rows.pop().ok_or(GatewayError::NotFound {
            entity: "inserted row",
        })
    }

    async fn patch_returning<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<Vec<T>, GatewayError> {
        let response = self
            .client
            .patch(url)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        read_json(response).await
    }

    /// Spawn a poll-and-diff pump producing a change feed.
    ///
    /// `key` extracts a stable row identity; rows with an unseen key become
    /// inserts, known keys whose row content changed become updates.
    fn spawn_feed<T, K, F>(&self, url: String, key: F) -> Subscription<T>
    where
        T: DeserializeOwned + Clone + PartialEq + Send + 'static,
        K: std::hash::Hash + Eq + Send + 'static,
        F: Fn(&T) -> K + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        let client = self.client.clone();
        let interval = self.poll_interval;

        let pump = tokio::spawn(async move {
            let mut seen: Option<HashMap<K, T>> = None;
            loop {
                tokio::time::sleep(interval).await;
                let rows: Vec<T> = match poll_once(&client, &url).await {
                    Ok(rows) => rows,
                    Err(e) => {
                        warn!(url, error = %e, "change feed poll failed");
                        continue;
                    }
                };

                // The first successful poll establishes the baseline; only
                // changes after the feed opened are delivered.
                let Some(known) = seen.as_mut() else {
                    seen = Some(rows.into_iter().map(|row| (key(&row), row)).collect());
                    continue;
                };

                for row in rows {
                    let event = match known.get(&key(&row)) {
                        None => Some(ChangeEvent::Insert(row.clone())),
                        Some(old) if old != &row => Some(ChangeEvent::Update(row.clone())),
                        Some(_) => None,
                    };
                    if let Some(event) = event {
                        known.insert(key(&row), row);
                        if tx.send(event).await.is_err() {
                            return;
                        }
                    }
                }
            }
        });

        Subscription::new(rx, Some(pump))
    }
}

async fn poll_once<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
) -> Result<Vec<T>, GatewayError> {
    let response = client.get(url).send().await?;
    read_json(response).await
}

/// Check the status, then decode. Error bodies become [`GatewayError::Api`].
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GatewayError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(GatewayError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response.json().await?)
}

impl Gateway for RestGateway {
    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>, GatewayError> {
        if let Some(cached) = self.product_cache.get(&()).await {
            debug!("product list served from cache");
            return Ok(cached);
        }
        let url = format!("{}?order=id.asc", self.table_url(T_PRODUCTS));
        let products: Vec<Product> = self.fetch(&url).await?;
        self.product_cache.insert((), products.clone()).await;
        Ok(products)
    }

    #[instrument(skip(self, product), fields(name = %product.name))]
    async fn insert_product(&self, product: NewProduct) -> Result<Product, GatewayError> {
        let row = self.insert_returning(T_PRODUCTS, &product).await?;
        self.product_cache.invalidate(&()).await;
        Ok(row)
    }

    #[instrument(skip(self, product), fields(id = %product.id))]
    async fn update_product(&self, product: Product) -> Result<Product, GatewayError> {
        let url = format!("{}?id=eq.{}", self.table_url(T_PRODUCTS), product.id);
        let mut rows: Vec<Product> = self.patch_returning(&url, &product).await?;
        self.product_cache.invalidate(&()).await;
        rows.pop().ok_or(GatewayError::NotFound { entity: "product" })
    }

    #[instrument(skip(self))]
    async fn delete_product(&self, id: ProductId) -> Result<(), GatewayError> {
        let url = format!("{}?id=eq.{id}", self.table_url(T_PRODUCTS));
        let response = self.client.delete(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }
        self.product_cache.invalidate(&()).await;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn decrement_stock(
        &self,
        id: ProductId,
        quantity: u32,
    ) -> Result<StockLevel, GatewayError> {
        let url = format!("{}/rpc/decrement_stock", self.rest_base);
        let response = self
            .client
            .post(&url)
            .json(&json!({
                "p_product_id": id,
                "p_quantity": quantity,
            }))
            .send()
            .await?;
        let remaining: u32 = read_json(response).await?;
        self.product_cache.invalidate(&()).await;
        Ok(StockLevel {
            product_id: id,
            remaining,
        })
    }

    #[instrument(skip(self, visitor), fields(session = %visitor.session_id.short()))]
    async fn upsert_visitor(&self, visitor: VisitorUpsert) -> Result<(), GatewayError> {
        let url = format!(
            "{}?on_conflict=session_id",
            self.table_url(T_VISITORS)
        );
        let response = self
            .client
            .post(&url)
            .header("Prefer", "resolution=merge-duplicates")
            .json(&visitor)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_visitors(&self) -> Result<Vec<Visitor>, GatewayError> {
        let url = format!("{}?order=last_active.desc", self.table_url(T_VISITORS));
        self.fetch(&url).await
    }

    #[instrument(skip(self, nickname), fields(session = %session_id.short()))]
    async fn update_nickname(
        &self,
        session_id: &SessionId,
        nickname: Option<String>,
    ) -> Result<(), GatewayError> {
        let url = format!(
            "{}?session_id=eq.{}",
            self.table_url(T_VISITORS),
            session_id
        );
        let rows: Vec<Visitor> = self
            .patch_returning(&url, &json!({ "nickname": nickname }))
            .await?;
        if rows.is_empty() {
            return Err(GatewayError::NotFound { entity: "visitor" });
        }
        Ok(())
    }

    async fn subscribe_visitors(&self) -> Result<Subscription<Visitor>, GatewayError> {
        let url = format!("{}?order=session_id.asc", self.table_url(T_VISITORS));
        Ok(self.spawn_feed(url, |v: &Visitor| v.session_id.clone()))
    }

    #[instrument(skip(self), fields(session = %session_id.short()))]
    async fn list_messages(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<ChatMessage>, GatewayError> {
        let url = format!(
            "{}?session_id=eq.{}&order=id.asc",
            self.table_url(T_MESSAGES),
            session_id
        );
        self.fetch(&url).await
    }

    #[instrument(skip(self))]
    async fn list_unread_messages(&self) -> Result<Vec<ChatMessage>, GatewayError> {
        let url = format!(
            "{}?sender=eq.visitor&is_read=eq.false&order=id.asc",
            self.table_url(T_MESSAGES)
        );
        self.fetch(&url).await
    }

    #[instrument(skip(self))]
    async fn list_chat_sessions(&self) -> Result<Vec<SessionId>, GatewayError> {
        #[derive(serde::Deserialize)]
        struct Row {
            session_id: SessionId,
        }
        let url = format!(
            "{}?select=session_id&order=id.desc",
            self.table_url(T_MESSAGES)
        );
        let rows: Vec<Row> = self.fetch(&url).await?;
        let mut sessions = Vec::new();
        for row in rows {
            if !sessions.contains(&row.session_id) {
                sessions.push(row.session_id);
            }
        }
        Ok(sessions)
    }

    #[instrument(skip(self, message), fields(session = %message.session_id.short()))]
    async fn insert_message(&self, message: NewMessage) -> Result<ChatMessage, GatewayError> {
        self.insert_returning(T_MESSAGES, &message).await
    }

    #[instrument(skip(self))]
    async fn mark_delivered_read(&self, id: MessageId) -> Result<(), GatewayError> {
        let url = format!("{}?id=eq.{id}", self.table_url(T_MESSAGES));
        let rows: Vec<ChatMessage> = self
            .patch_returning(&url, &json!({ "delivered": true, "is_read": true }))
            .await?;
        if rows.is_empty() {
            return Err(GatewayError::NotFound { entity: "message" });
        }
        Ok(())
    }

    #[instrument(skip(self), fields(session = %session_id.short()))]
    async fn mark_session_read(&self, session_id: &SessionId) -> Result<u32, GatewayError> {
        let url = format!(
            "{}?session_id=eq.{}&sender=eq.visitor&is_read=eq.false",
            self.table_url(T_MESSAGES),
            session_id
        );
        let rows: Vec<ChatMessage> = self
            .patch_returning(&url, &json!({ "delivered": true, "is_read": true }))
            .await?;
        Ok(u32::try_from(rows.len()).unwrap_or(u32::MAX))
    }

    async fn subscribe_messages(
        &self,
        session_id: Option<SessionId>,
    ) -> Result<Subscription<ChatMessage>, GatewayError> {
        let url = session_id.map_or_else(
            || format!("{}?order=id.asc", self.table_url(T_MESSAGES)),
            |sid| {
                format!(
                    "{}?session_id=eq.{sid}&order=id.asc",
                    self.table_url(T_MESSAGES)
                )
            },
        );
        Ok(self.spawn_feed(url, |m: &ChatMessage| m.id))
    }

    #[instrument(skip(self, broadcast))]
    async fn publish_broadcast(&self, broadcast: NewBroadcast) -> Result<Broadcast, GatewayError> {
        self.insert_returning(T_NOTIFICATIONS, &broadcast).await
    }

    async fn subscribe_broadcasts(&self) -> Result<Subscription<Broadcast>, GatewayError> {
        let url = format!("{}?order=id.asc", self.table_url(T_NOTIFICATIONS));
        Ok(self.spawn_feed(url, |b: &Broadcast| b.id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use std::time::Duration;
    use url::Url;

    fn test_config() -> GatewayConfig {
        GatewayConfig {
            url: Url::parse("https://store.example.com/").unwrap(),
            api_key: SecretString::from("anon-k3y"),
            request_timeout: Duration::from_secs(8),
            poll_interval: Duration::from_millis(2000),
            cache_ttl: Duration::from_secs(30),
        }
    }

    #[test]
    fn test_table_url_strips_trailing_slash() {
        let gateway = RestGateway::new(&test_config()).unwrap();
        assert_eq!(
            gateway.table_url(T_PRODUCTS),
            "https://store.example.com/rest/v1/products"
        );
    }

    #[test]
    fn test_invalid_key_rejected() {
        let mut config = test_config();
        config.api_key = SecretString::from("bad\nkey");
        assert!(RestGateway::new(&config).is_err());
    }
}
