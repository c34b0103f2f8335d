use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use ovc_api::{
    CreateMachineRequest, DeleteMachineRequest, LimitDiskIoRequest, OvcClient, ResizeDiskRequest,
    ResizeMachineRequest, StatusCode, UpdateMachineRequest,
};
use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::normalize;
use crate::types::{ActualState, DesiredConfig, DiskUpdate, MachineId, SizingMode};
use crate::{Error, MachineGateway, Result};

/// [`MachineGateway`] backed by the OVC cloud API.
///
/// Retry-safe calls (get, resize, disk updates) are retried on transient
/// failures with exponential backoff; create, metadata update and delete are
/// issued exactly once.
pub struct OvcGateway {
    client: OvcClient,
    retries: u32,
    retry_delay: Duration,
}

impl OvcGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = OvcClient::new(config.url.clone(), config.jwt.clone(), config.timeout).map_err(Error::Client)?;
        Ok(Self {
            client,
            retries: config.retries,
            retry_delay: config.retry_delay,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(&GatewayConfig::from_env()?)
    }

    fn parse_id(id: &MachineId) -> Result<i64> {
        id.0.parse::<i64>().map_err(|_| Error::InvalidId(id.0.clone()))
    }

    async fn with_retry<T, F, Fut>(&self, operation: &'static str, machine: &MachineId, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ovc_api::Result<T>>,
    {
        let mut attempt = 0;
        let mut delay = self.retry_delay;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    let err = translate(operation, &machine.0, e);
                    if !err.is_transient() || attempt >= self.retries {
                        return Err(err);
                    }
                    attempt += 1;
                    warn!(machine_id = %machine, operation, attempt, error = %err, "transient failure, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429 | 500 | 502 | 503 | 504)
}

/// Sort an API failure into not-found, transient or rejected.
pub(crate) fn translate(operation: &'static str, machine: &str, err: ovc_api::Error) -> Error {
    let machine = machine.to_string();
    match err {
        ovc_api::Error::Api { status, .. } if status == StatusCode::NOT_FOUND => Error::NotFound { machine },
        ovc_api::Error::Api { status, body, .. } if is_transient_status(status) => Error::TransientIo {
            operation,
            machine,
            message: format!("{status}: {body}"),
        },
        ovc_api::Error::Api { status, body, .. } => Error::RemoteRejected {
            operation,
            machine,
            message: format!("{status}: {body}"),
        },
        ovc_api::Error::Request(e) if ovc_api::is_interrupted(&e) => Error::TransientIo {
            operation,
            machine,
            message: e.to_string(),
        },
        ovc_api::Error::Request(e) => Error::RemoteRejected {
            operation,
            machine,
            message: e.to_string(),
        },
    }
}

/// Record on a remote failure that an earlier step of the same call did
/// take effect.
fn partially_applied(err: Error, note: String) -> Error {
    match err {
        Error::RemoteRejected {
            operation,
            machine,
            message,
        } => Error::RemoteRejected {
            operation,
            machine,
            message: format!("{message} ({note})"),
        },
        Error::TransientIo {
            operation,
            machine,
            message,
        } => Error::TransientIo {
            operation,
            machine,
            message: format!("{message} ({note})"),
        },
        other => other,
    }
}

fn sizing_fields(sizing: &SizingMode) -> (Option<i64>, Option<i64>, Option<i64>) {
    match *sizing {
        SizingMode::BySizeId(id) => (Some(id), None, None),
        SizingMode::ByResources { memory, vcpus } => (None, Some(memory), Some(vcpus)),
    }
}

#[async_trait]
impl MachineGateway for OvcGateway {
    async fn get_machine(&self, id: &MachineId) -> Result<ActualState> {
        let machine_id = Self::parse_id(id)?;
        let client = &self.client;
        let info = self
            .with_retry("get machine", id, move || client.get_machine(machine_id))
            .await?;
        Ok(normalize::actual_state(info))
    }

    async fn create_machine(&self, config: &DesiredConfig) -> Result<MachineId> {
        let (size_id, memory, vcpus) = sizing_fields(&config.sizing);
        let req = CreateMachineRequest {
            cloudspace_id: config.cloudspace_id,
            name: config.name.clone(),
            description: config.description.clone(),
            size_id,
            image_id: config.image_id,
            disksize: config.disksize,
            memory,
            vcpus,
            userdata: config.userdata.clone(),
        };

        let machine_id = self
            .client
            .create_machine(&req)
            .await
            .map_err(|e| translate("create machine", &config.name, e))?;

        info!(machine_id, name = %config.name, "ovc: machine created");
        Ok(MachineId(machine_id.to_string()))
    }

    async fn update_machine_metadata(&self, id: &MachineId, name: &str, description: &str) -> Result<()> {
        let req = UpdateMachineRequest {
            machine_id: Self::parse_id(id)?,
            name: name.to_string(),
            description: description.to_string(),
        };
        self.client
            .update_machine(&req)
            .await
            .map_err(|e| translate("update machine", &id.0, e))?;

        info!(machine_id = %id, "ovc: machine metadata updated");
        Ok(())
    }

    async fn resize_machine(&self, id: &MachineId, sizing: &SizingMode) -> Result<()> {
        let (size_id, memory, vcpus) = sizing_fields(sizing);
        let req = ResizeMachineRequest {
            machine_id: Self::parse_id(id)?,
            size_id,
            memory,
            vcpus,
        };
        let client = &self.client;
        let req = &req;
        self.with_retry("resize machine", id, move || client.resize_machine(req))
            .await?;

        info!(machine_id = %id, ?sizing, "ovc: machine resized");
        Ok(())
    }

    async fn update_disk(&self, id: &MachineId, disk_id: i64, update: &DiskUpdate) -> Result<()> {
        let client = &self.client;

        if let Some(size) = update.size {
            let req = &ResizeDiskRequest { disk_id, size };
            self.with_retry("resize disk", id, move || client.resize_disk(req))
                .await?;
            info!(machine_id = %id, disk_id, size, "ovc: disk resized");
        }

        if let Some(iops) = update.iops {
            let req = &LimitDiskIoRequest { disk_id, iops };
            self.with_retry("limit disk io", id, move || client.limit_disk_io(req))
                .await
                .map_err(|e| match update.size {
                    Some(size) => partially_applied(e, format!("disk {disk_id} was already resized to {size}")),
                    None => e,
                })?;
            info!(machine_id = %id, disk_id, iops, "ovc: disk io limited");
        }

        Ok(())
    }

    async fn delete_machine(&self, id: &MachineId, permanently: bool) -> Result<()> {
        let req = DeleteMachineRequest {
            machine_id: Self::parse_id(id)?,
            permanently,
        };
        self.client
            .delete_machine(&req)
            .await
            .map_err(|e| translate("delete machine", &id.0, e))?;

        info!(machine_id = %id, permanently, "ovc: machine deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: StatusCode) -> ovc_api::Error {
        ovc_api::Error::Api {
            endpoint: "get machine",
            status,
            body: "boom".into(),
        }
    }

    fn gateway() -> OvcGateway {
        OvcGateway::new(&GatewayConfig {
            url: "https://ovc.example.com".into(),
            jwt: "t".into(),
            timeout: Duration::from_secs(1),
            retries: 0,
            retry_delay: Duration::from_millis(1),
        })
        .unwrap()
    }

    #[test]
    fn not_found_status_maps_to_not_found() {
        let err = translate("get machine", "42", api(StatusCode::NOT_FOUND));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "machine 42 not found");
    }

    #[test]
    fn gateway_errors_are_transient() {
        for status in [
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::BAD_GATEWAY,
            StatusCode::GATEWAY_TIMEOUT,
            StatusCode::TOO_MANY_REQUESTS,
        ] {
            assert!(translate("get machine", "42", api(status)).is_transient(), "{status}");
        }
    }

    #[test]
    fn client_errors_are_rejections_with_body() {
        let err = translate("resize machine", "42", api(StatusCode::BAD_REQUEST));
        match err {
            Error::RemoteRejected {
                operation,
                machine,
                message,
            } => {
                assert_eq!(operation, "resize machine");
                assert_eq!(machine, "42");
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn partial_disk_update_is_noted_in_message() {
        let err = partially_applied(
            translate("limit disk io", "42", api(StatusCode::SERVICE_UNAVAILABLE)),
            "disk 10 was already resized to 40".into(),
        );
        match err {
            Error::TransientIo { operation, message, .. } => {
                assert_eq!(operation, "limit disk io");
                assert!(message.ends_with("(disk 10 was already resized to 40)"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = partially_applied(Error::NotFound { machine: "42".into() }, "ignored".into());
        assert_eq!(err.to_string(), "machine 42 not found");
    }

    #[tokio::test]
    async fn truncated_response_body_is_transient() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 200\r\n\r\n{\"id\": 42")
                .await;
            let _ = socket.shutdown().await;
        });

        let gateway = OvcGateway::new(&GatewayConfig {
            url: format!("http://{addr}"),
            jwt: "t".into(),
            timeout: Duration::from_secs(5),
            retries: 0,
            retry_delay: Duration::from_millis(1),
        })
        .unwrap();

        let err = gateway.get_machine(&MachineId("42".into())).await.unwrap_err();
        assert!(err.is_transient(), "{err}");
    }

    #[test]
    fn non_numeric_id_rejected_before_request() {
        let err = OvcGateway::parse_id(&MachineId("abc".into())).unwrap_err();
        assert!(matches!(err, Error::InvalidId(ref id) if id == "abc"));
    }

    #[tokio::test]
    async fn retry_stops_on_rejection() {
        let gateway = OvcGateway {
            retries: 5,
            ..gateway()
        };
        let mut calls = 0;
        let result: Result<()> = gateway
            .with_retry("resize machine", &MachineId("42".into()), || {
                calls += 1;
                async { Err(api(StatusCode::CONFLICT)) }
            })
            .await;
        assert!(matches!(result, Err(Error::RemoteRejected { .. })));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn retry_recovers_from_transient_failures() {
        let gateway = OvcGateway {
            retries: 3,
            ..gateway()
        };
        let mut calls = 0;
        let result = gateway
            .with_retry("get machine", &MachineId("42".into()), || {
                calls += 1;
                let attempt = calls;
                async move {
                    if attempt < 3 {
                        Err(api(StatusCode::SERVICE_UNAVAILABLE))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(result, 3);
    }

    #[tokio::test]
    async fn retry_gives_up_after_budget() {
        let gateway = OvcGateway {
            retries: 2,
            ..gateway()
        };
        let mut calls = 0;
        let result: Result<()> = gateway
            .with_retry("get machine", &MachineId("42".into()), || {
                calls += 1;
                async { Err(api(StatusCode::SERVICE_UNAVAILABLE)) }
            })
            .await;
        assert!(matches!(result, Err(Error::TransientIo { .. })));
        assert_eq!(calls, 3);
    }
}
