//! Typed Rust client for the OpenvCloud (OVC) cloud API.
//!
//! Covers the subset needed for managing a single virtual machine:
//! machines (get, create, update, resize, delete) and boot disk
//! sizing/IO limits.

mod types;

use std::time::Duration;

pub use reqwest::StatusCode;
pub use types::*;

const API_PREFIX: &str = "/restmachine/cloudapi";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("ovc api request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("ovc api {endpoint} returned {status}: {body}")]
    Api {
        endpoint: &'static str,
        status: StatusCode,
        body: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Whether the request failed in transit rather than being answered: connect
/// and timeout failures, or a response body that broke off mid-read.
///
/// A broken body read surfaces from `Response::json` as a decode error
/// wrapping the body error, so the source chain is searched too. A body that
/// arrived whole but does not parse is not an interruption.
pub fn is_interrupted(err: &reqwest::Error) -> bool {
    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        return true;
    }
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        if inner
            .downcast_ref::<reqwest::Error>()
            .is_some_and(|e| e.is_body() || e.is_timeout())
        {
            return true;
        }
        source = inner.source();
    }
    false
}

/// Client for the OVC cloud API.
///
/// Every call is a JSON `POST` to `{base_url}/restmachine/cloudapi/{group}/{method}`
/// authenticated with a bearer JWT.
#[derive(Clone)]
pub struct OvcClient {
    base_url: String,
    jwt: String,
    http: reqwest::Client,
}

impl OvcClient {
    pub fn new(base_url: impl Into<String>, jwt: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            jwt: jwt.into(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{API_PREFIX}{path}", self.base_url)
    }

    fn auth(&self) -> String {
        format!("bearer {}", self.jwt)
    }

    async fn check(resp: reqwest::Response, endpoint: &'static str) -> Result<reqwest::Response> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api { endpoint, status, body });
        }
        Ok(resp)
    }

    async fn post<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        endpoint: &'static str,
        body: &B,
    ) -> Result<reqwest::Response> {
        let resp = self
            .http
            .post(self.url(path))
            .header("Authorization", self.auth())
            .json(body)
            .send()
            .await?;

        Self::check(resp, endpoint).await
    }

    // ── Machines ─────────────────────────────────────────────────────

    pub async fn get_machine(&self, machine_id: i64) -> Result<MachineInfo> {
        self.post("/machines/get", "get machine", &GetMachineRequest { machine_id })
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    /// Returns the numeric id of the new machine.
    pub async fn create_machine(&self, req: &CreateMachineRequest) -> Result<i64> {
        self.post("/machines/create", "create machine", req)
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    pub async fn update_machine(&self, req: &UpdateMachineRequest) -> Result<()> {
        self.post("/machines/update", "update machine", req).await?;
        Ok(())
    }

    pub async fn resize_machine(&self, req: &ResizeMachineRequest) -> Result<()> {
        self.post("/machines/resize", "resize machine", req).await?;
        Ok(())
    }

    pub async fn delete_machine(&self, req: &DeleteMachineRequest) -> Result<()> {
        self.post("/machines/delete", "delete machine", req).await?;
        Ok(())
    }

    // ── Disks ────────────────────────────────────────────────────────

    pub async fn resize_disk(&self, req: &ResizeDiskRequest) -> Result<()> {
        self.post("/disks/resize", "resize disk", req).await?;
        Ok(())
    }

    pub async fn limit_disk_io(&self, req: &LimitDiskIoRequest) -> Result<()> {
        self.post("/disks/limitIO", "limit disk io", req).await?;
        Ok(())
    }
}
