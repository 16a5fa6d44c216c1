//! Azure Blob Storage client for the rename pipeline.
//!
//! Speaks the Blob service REST API directly: HEAD for existence and copy
//! status, PUT with `x-ms-copy-source` for server-side copies, DELETE for
//! cleanup. Every request this client makes is bodiless. Requests are
//! signed with the SharedKey scheme (HMAC-SHA256 over the canonical
//! string-to-sign).

use crate::errors::BlobStoreError;
use crate::models::copy::CopyStatus;
use crate::services::blob_store::BlobStore;
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Method, Response, StatusCode};
use sha2::Sha256;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

/// Blob service API version sent with every request.
const API_VERSION: &str = "2021-12-02";

/// Header carrying the copy state of a destination blob.
const COPY_STATUS_HEADER: &str = "x-ms-copy-status";

/// Storage account name + access key pair used to sign requests.
#[derive(Clone)]
pub struct SharedKeyCredential {
    account: String,
    key: Vec<u8>,
}

impl SharedKeyCredential {
    /// Build a credential from the account name and its base64-encoded key.
    pub fn new(account: impl Into<String>, key_base64: &str) -> Result<Self, BlobStoreError> {
        let key = general_purpose::STANDARD
            .decode(key_base64)
            .map_err(|err| BlobStoreError::InvalidAccessKey(err.to_string()))?;
        Ok(Self {
            account: account.into(),
            key,
        })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// `Authorization` header value for one bodiless request.
    ///
    /// `ms_headers` must hold every `x-ms-*` header on the request, with
    /// lowercase names.
    fn authorization(
        &self,
        method: &Method,
        url: &Url,
        ms_headers: &[(String, String)],
    ) -> Result<String, BlobStoreError> {
        let string_to_sign = self.string_to_sign(method, url, ms_headers);
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|err| BlobStoreError::InvalidAccessKey(err.to_string()))?;
        mac.update(string_to_sign.as_bytes());
        let signature = general_purpose::STANDARD.encode(mac.finalize().into_bytes());
        Ok(format!("SharedKey {}:{}", self.account, signature))
    }

    /// Canonical string-to-sign for a bodiless request.
    ///
    /// The standard headers block is twelve lines: the verb, then eleven
    /// empty standard-header slots (Content-Length stays empty for a zero
    /// length body; Date stays empty because `x-ms-date` is sent instead).
    fn string_to_sign(&self, method: &Method, url: &Url, ms_headers: &[(String, String)]) -> String {
        let headers_part = [
            method.as_str(), // VERB
            "",              // Content-Encoding
            "",              // Content-Language
            "",              // Content-Length
            "",              // Content-MD5
            "",              // Content-Type
            "",              // Date
            "",              // If-Modified-Since
            "",              // If-Match
            "",              // If-None-Match
            "",              // If-Unmodified-Since
            "",              // Range
        ]
        .join("\n");

        let mut sorted = ms_headers.to_vec();
        sorted.sort();
        let canonical_headers: String = sorted
            .iter()
            .map(|(name, value)| format!("{}:{}\n", name, value))
            .collect();

        let mut canonical_resource = format!("/{}{}", self.account, url.path());
        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.to_lowercase(), v.to_string()))
            .collect();
        params.sort();
        for (name, value) in params {
            canonical_resource.push_str(&format!("\n{}:{}", name, value));
        }

        format!("{}\n{}{}", headers_part, canonical_headers, canonical_resource)
    }
}

/// REST client scoped to a single container.
#[derive(Clone)]
pub struct AzureBlobClient {
    http: reqwest::Client,
    endpoint: Url,
    container: String,
    credential: SharedKeyCredential,
}

impl AzureBlobClient {
    /// Create a client for one container behind `endpoint`.
    ///
    /// `endpoint` is the service root, e.g. the value of
    /// [`AzureBlobClient::account_endpoint`] or an Azurite address.
    pub fn new(
        endpoint: &str,
        container: impl Into<String>,
        credential: SharedKeyCredential,
    ) -> Result<Self, BlobStoreError> {
        let endpoint =
            Url::parse(endpoint).map_err(|err| BlobStoreError::InvalidEndpoint(err.to_string()))?;
        if endpoint.cannot_be_a_base() {
            return Err(BlobStoreError::InvalidEndpoint(
                "endpoint cannot hold a path".to_string(),
            ));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
            container: container.into(),
            credential,
        })
    }

    /// Default public endpoint for a storage account.
    pub fn account_endpoint(account: &str) -> String {
        format!("https://{}.blob.core.windows.net", account)
    }

    fn blob_url(&self, name: &str) -> Result<Url, BlobStoreError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| BlobStoreError::InvalidEndpoint("endpoint cannot hold a path".to_string()))?
            .pop_if_empty()
            .push(&self.container)
            .push(name);
        Ok(url)
    }

    /// Sign and send one bodiless request with the given extra `x-ms-*` headers.
    async fn send(
        &self,
        method: Method,
        url: Url,
        extra_ms_headers: Vec<(String, String)>,
    ) -> Result<Response, BlobStoreError> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let mut ms_headers = vec![
            ("x-ms-date".to_string(), date),
            ("x-ms-version".to_string(), API_VERSION.to_string()),
        ];
        ms_headers.extend(extra_ms_headers);

        let auth = self.credential.authorization(&method, &url, &ms_headers)?;
        let mut request = self.http.request(method, url).header("authorization", auth);
        for (name, value) in &ms_headers {
            request = request.header(name.as_str(), value.as_str());
        }
        Ok(request.send().await?)
    }
}

#[async_trait]
impl BlobStore for AzureBlobClient {
    async fn exists(&self, name: &str) -> Result<bool, BlobStoreError> {
        let url = self.blob_url(name)?;
        let response = self.send(Method::HEAD, url, Vec::new()).await?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(BlobStoreError::UnexpectedStatus {
                op: "head",
                name: name.to_string(),
                status: status.as_u16(),
            }),
        }
    }

    async fn begin_copy(&self, source: &str, dest: &str) -> Result<(), BlobStoreError> {
        let source_url = self.blob_url(source)?;
        let dest_url = self.blob_url(dest)?;
        let response = self
            .send(
                Method::PUT,
                dest_url,
                vec![("x-ms-copy-source".to_string(), source_url.to_string())],
            )
            .await?;
        match response.status() {
            StatusCode::ACCEPTED | StatusCode::CREATED => Ok(()),
            status => Err(BlobStoreError::UnexpectedStatus {
                op: "copy",
                name: dest.to_string(),
                status: status.as_u16(),
            }),
        }
    }

    async fn copy_status(&self, dest: &str) -> Result<CopyStatus, BlobStoreError> {
        let url = self.blob_url(dest)?;
        let response = self.send(Method::HEAD, url, Vec::new()).await?;
        if response.status() != StatusCode::OK {
            return Err(BlobStoreError::UnexpectedStatus {
                op: "properties",
                name: dest.to_string(),
                status: response.status().as_u16(),
            });
        }
        let value = response
            .headers()
            .get(COPY_STATUS_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| BlobStoreError::MissingCopyStatus(dest.to_string()))?;
        CopyStatus::parse(value).ok_or_else(|| BlobStoreError::UnknownCopyStatus {
            name: dest.to_string(),
            value: value.to_string(),
        })
    }

    async fn delete_if_exists(&self, name: &str) -> Result<bool, BlobStoreError> {
        let url = self.blob_url(name)?;
        let response = self.send(Method::DELETE, url, Vec::new()).await?;
        match response.status() {
            StatusCode::ACCEPTED => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(BlobStoreError::UnexpectedStatus {
                op: "delete",
                name: name.to_string(),
                status: status.as_u16(),
            }),
        }
    }
}
