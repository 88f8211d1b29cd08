//! Typed access to the HTTP API, plus the chat state the app screens drive.
//!
//! [`CbClient`] keeps the session cookie between calls, so log in once with
//! [`CbClient::login`] and every later request is authenticated.

mod chat;
mod list;

use std::collections::BTreeMap;

use reqwest::{multipart, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::db::Student;

pub use chat::{ChatContext, ChatSource, Conversation, ConversationStatus};
pub use list::{message_rows, ListArea, ListView, MessageRow};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("missing path parameter :{0}")]
    MissingParam(String),

    #[error("could not encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Path parameters (`:id` segments) and query pairs for one request.
#[derive(Debug, Clone, Default)]
pub struct Params {
    pub path: BTreeMap<String, String>,
    pub query: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, name: &str, value: impl ToString) -> Self {
        self.path.insert(name.to_owned(), value.to_string());
        self
    }

    pub fn query(mut self, name: &str, value: impl ToString) -> Self {
        self.query.push((name.to_owned(), value.to_string()));
        self
    }
}

/// An image picked on the device, ready to upload.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct CbClient {
    base_url: String,
    http: reqwest::Client,
}

impl CbClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            http,
        })
    }

    /// Substitutes `:name` segments of `path` from `params`.
    pub fn url(&self, path: &str, params: &Params) -> Result<String, ClientError> {
        let mut url = self.base_url.clone();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            url.push('/');
            match segment.strip_prefix(':') {
                Some(name) => url.push_str(
                    params
                        .path
                        .get(name)
                        .ok_or_else(|| ClientError::MissingParam(name.to_owned()))?,
                ),
                None => url.push_str(segment),
            }
        }
        Ok(url)
    }

    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        params: &Params,
        body: Option<&B>,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut builder = self
            .http
            .request(method, self.url(path, params)?)
            .query(&params.query);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        decode(builder.send().await?).await
    }

    pub async fn get_request<T: DeserializeOwned>(&self, path: &str, params: &Params) -> Result<T, ClientError> {
        self.request::<T, Value>(Method::GET, path, params, None).await
    }

    /// Sends `image` and the JSON-encoded `data` as one multipart body.
    pub async fn upload_image_request<T, D>(
        &self,
        method: Method,
        path: &str,
        image: ImageAsset,
        data: &D,
        params: &Params,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        D: Serialize + ?Sized,
    {
        let image = multipart::Part::bytes(image.bytes)
            .file_name(image.file_name)
            .mime_str(&image.mime_type)?;
        let form = multipart::Form::new()
            .part("image", image)
            .text("data", serde_json::to_string(data)?);

        let response = self
            .http
            .request(method, self.url(path, params)?)
            .query(&params.query)
            .multipart(form)
            .send()
            .await?;

        decode(response).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Student, ClientError> {
        self.request(
            Method::POST,
            "/auth/login",
            &Params::new(),
            Some(&json!({ "email": email, "password": password })),
        )
        .await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or(text);

    Err(ClientError::Status { status, message })
}
