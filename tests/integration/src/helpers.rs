//! Test helpers for integration tests
//!
//! Provides a real gateway bound to an ephemeral port, an HTTP client for
//! the collaborator API, and a WebSocket client wrapper.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use deploy_common::AppConfig;
use futures_util::{SinkExt, StreamExt};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::fixtures::TEST_SECRET;

/// How long a client waits for a frame before failing the test
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    shutdown: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Start a new test server with default tuning
    pub async fn start() -> Result<Self> {
        Self::start_with(&[]).await
    }

    /// Start a test server with extra environment-style settings
    pub async fn start_with(overrides: &[(&str, &str)]) -> Result<Self> {
        let config = test_config(overrides)?;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn({
            let shutdown = shutdown.clone();
            async move {
                deploy_gateway::serve(listener, config, shutdown).await.ok();
            }
        });

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            addr,
            client,
            shutdown,
            handle: Some(handle),
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// WebSocket URL with an optional token
    pub fn ws_url(&self, token: Option<&str>) -> String {
        match token {
            Some(token) => format!("ws://{}/ws?token={token}", self.addr),
            None => format!("ws://{}/ws", self.addr),
        }
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Make a POST request with JSON body
    pub async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.post(&url).json(body).send().await?)
    }

    /// Open a WebSocket with a token in the query string
    pub async fn connect(&self, token: &str) -> Result<TestClient> {
        TestClient::connect(&self.ws_url(Some(token))).await
    }

    /// Open a WebSocket and wait for `connection_established`
    pub async fn connect_ready(&self, token: &str) -> Result<TestClient> {
        let mut client = self.connect(token).await?;
        client.expect_type("connection_established").await?;
        Ok(client)
    }

    /// Stop the server and wait for it to finish
    pub async fn shutdown(mut self) -> Result<()> {
        self.shutdown.cancel();
        if let Some(handle) = self.handle.take() {
            tokio::time::timeout(Duration::from_secs(10), handle)
                .await
                .context("server did not stop")??;
        }
        Ok(())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// What a client observed when reading
#[derive(Debug)]
pub enum Received {
    Json(Value),
    Closed(Option<u16>),
}

/// WebSocket test client
pub struct TestClient {
    stream: WsStream,
}

impl TestClient {
    /// Connect to a WebSocket URL
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, _response) = connect_async(url).await?;
        Ok(Self { stream })
    }

    /// Connect with the token in an `Authorization: Bearer` header
    pub async fn connect_with_header(url: &str, token: &str) -> Result<Self> {
        let mut request = url.into_client_request()?;
        request
            .headers_mut()
            .insert("Authorization", format!("Bearer {token}").parse()?);
        let (stream, _response) = connect_async(request).await?;
        Ok(Self { stream })
    }

    /// Send a JSON command
    pub async fn send_json(&mut self, value: &Value) -> Result<()> {
        self.send_text(&value.to_string()).await
    }

    /// Send a raw text frame
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.stream.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    /// Send a binary frame
    pub async fn send_binary(&mut self, bytes: Vec<u8>) -> Result<()> {
        self.stream.send(Message::Binary(bytes)).await?;
        Ok(())
    }

    /// Read the next JSON frame or close
    pub async fn recv(&mut self) -> Result<Received> {
        loop {
            let message = tokio::time::timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .context("timed out waiting for a frame")?;

            match message {
                Some(Ok(Message::Text(text))) => return Ok(Received::Json(serde_json::from_str(&text)?)),
                Some(Ok(Message::Close(frame))) => {
                    return Ok(Received::Closed(frame.map(|f| u16::from(f.code))));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => bail!("WebSocket error: {e}"),
                None => return Ok(Received::Closed(None)),
            }
        }
    }

    /// Read until a frame of the given type arrives, skipping others
    pub async fn expect_type(&mut self, kind: &str) -> Result<Value> {
        loop {
            match self.recv().await? {
                Received::Json(frame) if frame["type"] == kind => return Ok(frame),
                Received::Json(_) => {}
                Received::Closed(code) => bail!("closed with {code:?} while waiting for {kind}"),
            }
        }
    }

    /// Read until the server closes, returning the close code
    pub async fn expect_close(&mut self) -> Result<Option<u16>> {
        loop {
            if let Received::Closed(code) = self.recv().await? {
                return Ok(code);
            }
        }
    }

    /// Close from the client side
    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}

/// Build a configuration from test defaults plus overrides
pub fn test_config(overrides: &[(&str, &str)]) -> Result<AppConfig> {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("GATEWAY_HOST".to_string(), "127.0.0.1".to_string()),
        ("GATEWAY_PORT".to_string(), "0".to_string()),
        ("JWT_SECRET".to_string(), TEST_SECRET.to_string()),
    ]);
    for (key, value) in overrides {
        vars.insert((*key).to_string(), (*value).to_string());
    }

    AppConfig::from_lookup(|key| vars.get(key).cloned())
        .map_err(|e| anyhow::anyhow!("Config error: {e}"))
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(response: Response, expected_status: StatusCode) -> Result<T> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(response.json().await?)
}
