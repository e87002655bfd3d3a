//! lnd REST gateway client.
//!
//! Authenticates with the node's TLS certificate as the trust root and the
//! hex-encoded macaroon in the `Grpc-Metadata-macaroon` header.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Certificate, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use lnchat_shared::NodeId;

use crate::config::LndConfig;
use crate::error::RpcError;
use crate::models::{Graph, Invoice, KeyLocator, NodeInfo, PaymentStatus, SendPaymentRequest};
use crate::rpc::{Lightning, Router, RpcStream, Signer};
use crate::stream::json_frames;
use crate::wire::{
    GetInfoJson, GraphJson, InvoiceJson, PaymentJson, SendPaymentJson, SignMessageJson,
    SignMessageResponseJson, VerifyMessageJson, VerifyMessageResponseJson,
};

const MACAROON_HEADER: &str = "Grpc-Metadata-macaroon";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A connection to one lnd node.
#[derive(Clone)]
pub struct LndRestClient {
    http: Client,
    config: LndConfig,
}

impl LndRestClient {
    /// Read credentials from disk and build the HTTP client.
    ///
    /// No request is made; connection problems surface on the first call.
    pub fn connect(config: LndConfig) -> Result<Self, RpcError> {
        let cert_path = config.tls_cert_path();
        let pem = std::fs::read(&cert_path).map_err(|source| RpcError::Io {
            path: cert_path.display().to_string(),
            source,
        })?;
        let cert = Certificate::from_pem(&pem)?;

        let macaroon_path = config.macaroon_path();
        let macaroon = std::fs::read(&macaroon_path).map_err(|source| RpcError::Io {
            path: macaroon_path.display().to_string(),
            source,
        })?;

        let mut macaroon_value = HeaderValue::from_str(&hex::encode(macaroon))
            .map_err(|e| RpcError::Config(format!("invalid macaroon header: {e}")))?;
        macaroon_value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(MACAROON_HEADER, macaroon_value);

        let http = Client::builder()
            .add_root_certificate(cert)
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        info!(
            url = %config.rest_url,
            cert = %cert_path.display(),
            macaroon = %macaroon_path.display(),
            "lnd REST client ready"
        );

        Ok(Self { http, config })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RpcError> {
        let resp = self.http.get(self.config.endpoint(path)).send().await?;
        Ok(check_status(resp).await?.json().await?)
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, RpcError> {
        let resp = self
            .http
            .post(self.config.endpoint(path))
            .json(body)
            .send()
            .await?;
        Ok(check_status(resp).await?.json().await?)
    }

    async fn open_stream<T>(&self, request: RequestBuilder) -> Result<RpcStream<T>, RpcError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let resp = check_status(request.send().await?).await?;
        Ok(json_frames(resp.bytes_stream()))
    }
}

async fn check_status(resp: Response) -> Result<Response, RpcError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(RpcError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl Lightning for LndRestClient {
    async fn describe_graph(&self) -> Result<Graph, RpcError> {
        let graph: GraphJson = self.get_json("/v1/graph").await?;
        debug!(nodes = graph.nodes.len(), "Fetched graph snapshot");
        Ok(graph.into())
    }

    async fn get_info(&self) -> Result<NodeInfo, RpcError> {
        let info: GetInfoJson = self.get_json("/v1/getinfo").await?;
        Ok(info.into())
    }

    async fn subscribe_invoices(&self) -> Result<RpcStream<Invoice>, RpcError> {
        let request = self.http.get(self.config.endpoint("/v1/invoices/subscribe"));
        let frames = self.open_stream::<InvoiceJson>(request).await?;
        Ok(frames
            .map(|frame| frame.and_then(Invoice::try_from))
            .boxed())
    }
}

#[async_trait]
impl Router for LndRestClient {
    async fn send_payment(
        &self,
        request: SendPaymentRequest,
    ) -> Result<RpcStream<PaymentStatus>, RpcError> {
        let body = SendPaymentJson::from(&request);
        let http_request = self
            .http
            .post(self.config.endpoint("/v2/router/send"))
            .json(&body);
        let frames = self.open_stream::<PaymentJson>(http_request).await?;
        Ok(frames.map(|frame| frame.map(PaymentStatus::from)).boxed())
    }
}

#[async_trait]
impl Signer for LndRestClient {
    async fn sign_message(&self, msg: &[u8], key_loc: KeyLocator) -> Result<Vec<u8>, RpcError> {
        let body = SignMessageJson {
            msg: B64.encode(msg),
            key_loc: key_loc.into(),
        };
        let resp: SignMessageResponseJson = self.post_json("/v2/signer/signmessage", &body).await?;
        Ok(B64.decode(resp.signature)?)
    }

    async fn verify_message(
        &self,
        msg: &[u8],
        signature: &[u8],
        pubkey: &NodeId,
    ) -> Result<bool, RpcError> {
        let body = VerifyMessageJson {
            msg: B64.encode(msg),
            signature: B64.encode(signature),
            pubkey: B64.encode(pubkey.as_bytes()),
        };
        let resp: VerifyMessageResponseJson =
            self.post_json("/v2/signer/verifymessage", &body).await?;
        Ok(resp.valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_cert_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = LndConfig {
            lnd_dir: dir.path().to_path_buf(),
            ..LndConfig::default()
        };
        match LndRestClient::connect(config) {
            Err(RpcError::Io { path, .. }) => assert!(path.ends_with("tls.cert")),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("connect should fail without a certificate"),
        }
    }
}
