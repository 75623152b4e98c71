//! REST adapter for the hosted data service
//!
//! Speaks the PostgREST dialect exposed under `{base_url}/rest/v1/{table}`:
//! filters are query parameters (`id=eq.<uuid>`), ordering is
//! `order=created_at.desc`, and inserts/updates are JSON bodies.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use super::{RecordStore, StoreError, StoreResult};
use crate::models::{Channel, NewViewer, Stream};

const CHANNELS: &str = "channels";
const STREAMS: &str = "streams";
const VIEWERS: &str = "viewers";
const CHAT_MESSAGES: &str = "chat_messages";

const CHANNEL_COLUMNS: &str = "id,name,description,is_live";
const STREAM_COLUMNS: &str = "id,channel_id,is_live,viewer_count,created_at";

pub struct RestRecordStore {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl RestRecordStore {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Transport(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn transport_error(&self, error: reqwest::Error) -> StoreError {
        if error.is_timeout() {
            StoreError::Timeout(self.timeout)
        } else {
            StoreError::Transport(error.to_string())
        }
    }

    async fn send(&self, request: RequestBuilder) -> StoreResult<Response> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> StoreResult<Vec<T>> {
        debug!(table, ?query, "store select");
        let response = self.send(self.request(Method::GET, table).query(query)).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn insert<B: Serialize + ?Sized>(&self, table: &str, body: &B) -> StoreResult<()> {
        debug!(table, "store insert");
        self.send(
            self.request(Method::POST, table)
                .header("Prefer", "return=minimal")
                .json(body),
        )
        .await?;
        Ok(())
    }

    async fn insert_returning<B, T>(&self, table: &str, body: &B) -> StoreResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(table, "store insert returning");
        let response = self
            .send(
                self.request(Method::POST, table)
                    .header("Prefer", "return=representation")
                    .json(body),
            )
            .await?;
        let mut rows = response
            .json::<Vec<T>>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        if rows.is_empty() {
            return Err(StoreError::Decode(format!("{} insert returned no rows", table)));
        }
        Ok(rows.swap_remove(0))
    }

    async fn update<B: Serialize + ?Sized>(
        &self,
        table: &str,
        filter: &[(&str, String)],
        body: &B,
    ) -> StoreResult<()> {
        debug!(table, ?filter, "store update");
        self.send(
            self.request(Method::PATCH, table)
                .query(filter)
                .header("Prefer", "return=minimal")
                .json(body),
        )
        .await?;
        Ok(())
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{}", value)
}

#[async_trait]
impl RecordStore for RestRecordStore {
    async fn get_channel_by_id(&self, id: Uuid) -> StoreResult<Option<Channel>> {
        let rows: Vec<Channel> = self
            .select(
                CHANNELS,
                &[
                    ("select", CHANNEL_COLUMNS.to_string()),
                    ("id", eq(id)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn get_latest_active_stream(&self, channel_id: Uuid) -> StoreResult<Option<Stream>> {
        let rows: Vec<Stream> = self
            .select(
                STREAMS,
                &[
                    ("select", STREAM_COLUMNS.to_string()),
                    ("channel_id", eq(channel_id)),
                    ("is_live", eq(true)),
                    ("order", "created_at.desc".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_viewer(&self, viewer: NewViewer) -> StoreResult<()> {
        self.insert(VIEWERS, &viewer).await
    }

    async fn insert_chat_message(&self, stream_id: Uuid, text: &str) -> StoreResult<()> {
        self.insert(
            CHAT_MESSAGES,
            &json!({
                "stream_id": stream_id,
                "message": text,
            }),
        )
        .await
    }

    async fn start_stream(&self, channel_id: Uuid) -> StoreResult<Stream> {
        let stream: Stream = self
            .insert_returning(
                STREAMS,
                &json!({
                    "channel_id": channel_id,
                    "is_live": true,
                    "viewer_count": 0,
                }),
            )
            .await?;

        self.update(
            CHANNELS,
            &[("id", eq(channel_id))],
            &json!({ "is_live": true }),
        )
        .await?;

        Ok(stream)
    }

    async fn end_stream(&self, channel_id: Uuid, stream_id: Uuid) -> StoreResult<()> {
        self.update(
            STREAMS,
            &[("id", eq(stream_id))],
            &json!({ "is_live": false }),
        )
        .await?;

        self.update(
            CHANNELS,
            &[("id", eq(channel_id))],
            &json!({ "is_live": false }),
        )
        .await
    }
}
