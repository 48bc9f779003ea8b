use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::{Document, DocumentStore, Filter, StoreError, WriteBatch};

/// Client for the hosted document backend.
///
/// Collections map to `/v1/{collection}` resources; equality filters use the
/// `field=eq.value` query convention; conditional batches POST to
/// `/v1/commit`, which answers 409 when a precondition no longer holds.
pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.store_url.clone(),
            api_key: config.store_api_key.clone(),
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(value) = HeaderValue::from_str(&self.api_key) {
            headers.insert("apikey", value);
        }
        headers
    }

    async fn request<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Store request: {} {}", method, url);

        let mut req = self.client.request(method, &url).headers(self.headers());
        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Store error ({}): {}", status, error_text);

            return Err(match status {
                StatusCode::NOT_FOUND => StoreError::NotFound,
                StatusCode::CONFLICT => StoreError::Contention,
                _ => StoreError::Backend(format!("{}: {}", status, error_text)),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn filter_path(collection: &str, filters: &[Filter]) -> String {
        let mut path = format!("/v1/{}", collection);
        if filters.is_empty() {
            return path;
        }

        let query = filters
            .iter()
            .map(|f| {
                let value = match &f.value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                format!("{}=eq.{}", f.field, urlencoding::encode(&value))
            })
            .collect::<Vec<_>>()
            .join("&");

        path.push('?');
        path.push_str(&query);
        path
    }
}

#[async_trait::async_trait]
impl DocumentStore for RestStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let path = format!("/v1/{}/{}", collection, id);
        match self.request::<Document>(Method::GET, &path, None).await {
            Ok(doc) => Ok(Some(doc)),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> Result<Vec<Document>, StoreError> {
        let path = Self::filter_path(collection, filters);
        self.request(Method::GET, &path, None).await
    }

    async fn insert(&self, collection: &str, body: Value) -> Result<Document, StoreError> {
        let path = format!("/v1/{}", collection);
        self.request(Method::POST, &path, Some(body)).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> Result<Document, StoreError> {
        let path = format!("/v1/{}/{}", collection, id);
        self.request(Method::PATCH, &path, Some(patch)).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let path = format!("/v1/{}/{}", collection, id);
        self.request::<Value>(Method::DELETE, &path, None)
            .await
            .map(|_| ())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<Vec<Document>, StoreError> {
        let body = serde_json::to_value(&batch)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.request(Method::POST, "/v1/commit", Some(body)).await
    }
}
