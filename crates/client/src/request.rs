//! Authenticated request builder.
//!
//! Every backend call goes through [`AuthenticatedRequester::fetch_with_auth`]
//! so that no request leaves without a fresh bearer token, and through
//! [`AuthenticatedRequester::build_request_body`] so that tenant scoping
//! follows the active-tenant rules.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{ClientError, ClientResult};
use crate::response::{Fetched, degrade};
use crate::tenant::ActiveTenantSelector;

pub const TENANT_FIELD: &str = "company_id";

/// Source of fresh session tokens.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// A freshly minted token, or `None` when unauthenticated.
    async fn fresh_token(&self) -> Option<String>;
}

#[derive(Debug)]
pub enum RequestBody {
    Json(Value),
    Multipart(Form),
}

#[derive(Debug)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl RequestOptions {
    pub fn post_json(body: Value) -> Self {
        Self {
            method: Method::POST,
            headers: HeaderMap::new(),
            body: RequestBody::Json(body),
        }
    }

    pub fn post_multipart(form: Form) -> Self {
        Self {
            method: Method::POST,
            headers: HeaderMap::new(),
            body: RequestBody::Multipart(form),
        }
    }

    pub fn with_header(mut self, name: reqwest::header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// A file attached to a multipart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

impl UploadFile {
    pub fn new(field: impl Into<String>, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            bytes,
            mime: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    fn into_part(self) -> ClientResult<(String, Part)> {
        let mut part = Part::bytes(self.bytes).file_name(self.file_name);
        if let Some(mime) = &self.mime {
            part = part.mime_str(mime)?;
        }
        Ok((self.field, part))
    }
}

/// Send `options` to `url` with `token` as bearer.
///
/// Any caller-supplied `Authorization` header is replaced.
pub async fn send_authorized(
    http: &reqwest::Client,
    url: &str,
    token: &str,
    options: RequestOptions,
) -> ClientResult<Response> {
    let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| ClientError::Authentication("token is not a valid header value".into()))?;

    let mut headers = options.headers;
    headers.remove(AUTHORIZATION);
    headers.insert(AUTHORIZATION, bearer);

    let builder = http.request(options.method, url).headers(headers);
    let builder = match options.body {
        RequestBody::Json(body) => builder.json(&body),
        RequestBody::Multipart(form) => builder.multipart(form),
    };

    Ok(builder.send().await?)
}

#[derive(Clone)]
pub struct AuthenticatedRequester {
    tokens: Arc<dyn TokenSource>,
    selector: Arc<ActiveTenantSelector>,
    http: reqwest::Client,
}

impl AuthenticatedRequester {
    pub fn new(tokens: Arc<dyn TokenSource>, selector: Arc<ActiveTenantSelector>, http: reqwest::Client) -> Self {
        Self { tokens, selector, http }
    }

    /// Copy of `base` with `company_id` set iff the caller is an admin with
    /// an active tenant; otherwise the key is absent.
    pub fn build_request_body(&self, base: &Map<String, Value>) -> Map<String, Value> {
        let mut body = base.clone();
        body.remove(TENANT_FIELD);
        if let Some(tenant) = self.selector.request_scope() {
            body.insert(TENANT_FIELD.to_string(), Value::String(tenant.into()));
        }
        body
    }

    /// Refresh the token and perform the call. No retries, no caching.
    pub async fn fetch_with_auth(&self, url: &str, options: RequestOptions) -> ClientResult<Response> {
        let token = self
            .tokens
            .fresh_token()
            .await
            .ok_or_else(|| ClientError::Authentication("no session token available".into()))?;
        send_authorized(&self.http, url, &token, options).await
    }

    /// POST `build_request_body(base)` as JSON.
    pub async fn post_action(&self, url: &str, base: Map<String, Value>) -> ClientResult<Response> {
        let body = self.build_request_body(&base);
        self.fetch_with_auth(url, RequestOptions::post_json(Value::Object(body))).await
    }

    /// POST an explicit body, without tenant scoping.
    pub async fn post_unscoped(&self, url: &str, body: Value) -> ClientResult<Response> {
        self.fetch_with_auth(url, RequestOptions::post_json(body)).await
    }

    /// [`Self::post_action`] followed by the degradation contract.
    pub async fn load<T: DeserializeOwned>(&self, url: &str, base: Map<String, Value>) -> ClientResult<Fetched<T>> {
        degrade(self.post_action(url, base).await).await
    }

    /// Multipart form carrying `fields`, `files` and the same tenant scoping
    /// as [`Self::build_request_body`].
    pub fn scoped_form(&self, fields: &[(&str, String)], files: Vec<UploadFile>) -> ClientResult<Form> {
        let mut form = Form::new();
        for (name, value) in fields {
            if *name != TENANT_FIELD {
                form = form.text(name.to_string(), value.clone());
            }
        }
        if let Some(tenant) = self.selector.request_scope() {
            form = form.text(TENANT_FIELD, String::from(tenant));
        }
        for file in files {
            let (field, part) = file.into_part()?;
            form = form.part(field, part);
        }
        Ok(form)
    }

    pub fn is_admin(&self) -> bool {
        self.selector.is_admin()
    }
}

/// Request body seeded with `action`.
pub fn action(name: &str) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("action".to_string(), Value::String(name.to_string()));
    map
}
