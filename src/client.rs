use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use crate::error::{ComfyError, Result};
use crate::monitor::wait_for_completion;
use crate::types::*;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// `localhost:8188` -> `http://localhost:8188`; trailing slashes dropped.
fn normalize(address: String) -> String {
    let address = address.trim_end_matches('/');
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}

/// Async client for a ComfyUI server instance.
///
/// Each call to [`generate_image`](Self::generate_image) opens its own
/// WebSocket under a fresh client ID, so calls made concurrently do not
/// see each other's events.
///
/// # Example
/// ```no_run
/// use comfy_image::ComfyClient;
/// use serde_json::json;
///
/// # async fn example() -> comfy_image::Result<()> {
/// let client = ComfyClient::new("localhost:8188");
/// let images = client.generate_image(&json!({"3": {"inputs": {}}})).await?;
/// for img in &images {
///     println!("node {} image {}: {} bytes", img.node_id, img.index, img.data.len());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ComfyClient {
    http: Client,
    endpoint: String,
    request_timeout: Duration,
}

impl ComfyClient {
    /// Create a client for `host:port` (or a full `http://` URL).
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint: normalize(address.into()),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Use a custom `reqwest::Client` (for connection pooling, TLS).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Timeout for each HTTP request. Does not bound the wait for completion.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Returns the configured endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn ws_url(&self, client_id: &str) -> String {
        format!(
            "{}/ws?clientId={}",
            self.endpoint
                .replacen("http://", "ws://", 1)
                .replacen("https://", "wss://", 1),
            client_id
        )
    }

    fn network_error(&self, e: reqwest::Error) -> ComfyError {
        ComfyError::Network {
            context: format!(
                "Cannot connect to ComfyUI at {} (is the service running?)",
                self.endpoint
            ),
            source: e,
        }
    }

    // ── Prompt ──────────────────────────────────────────────────────

    /// Queue a workflow for execution on behalf of `client_id`. Returns the `prompt_id`.
    pub async fn queue_prompt(&self, workflow: &Value, client_id: &str) -> Result<String> {
        let url = format!("{}/prompt", self.endpoint);
        let body = serde_json::json!({
            "prompt": workflow,
            "client_id": client_id,
        });

        let resp = self
            .http
            .post(&url)
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.network_error(e))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body_text = resp.text().await.unwrap_or_default();
            return Err(ComfyError::Http {
                status,
                body: body_text,
            });
        }

        let json: Value = resp.json().await.map_err(|e| ComfyError::Network {
            context: "Failed to parse ComfyUI /prompt response".into(),
            source: e,
        })?;

        if let Some(errors) = json.get("node_errors").and_then(|e| e.as_object()) {
            if !errors.is_empty() {
                return Err(ComfyError::InvalidResponse(format!(
                    "Workflow node errors: {}",
                    serde_json::to_string(errors)?
                )));
            }
        }

        let queued: QueuedPrompt = serde_json::from_value(json)
            .map_err(|_| ComfyError::InvalidResponse("Response missing prompt_id".into()))?;
        Ok(queued.prompt_id)
    }

    // ── History ─────────────────────────────────────────────────────

    /// Fetch the output manifest of a finished prompt.
    pub async fn history(&self, prompt_id: &str) -> Result<PromptHistory> {
        let url = format!("{}/history/{}", self.endpoint, prompt_id);
        let resp = self
            .http
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| ComfyError::Network {
                context: "Failed to fetch ComfyUI history".into(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body_text = resp.text().await.unwrap_or_default();
            return Err(ComfyError::Http {
                status,
                body: body_text,
            });
        }

        let json: Value = resp.json().await.map_err(|e| ComfyError::Network {
            context: "Failed to parse ComfyUI history response".into(),
            source: e,
        })?;

        parse_history(&json, prompt_id)
    }

    // ── Image download ──────────────────────────────────────────────

    /// Download an output image by its reference. Returns raw bytes.
    pub async fn image(&self, img: &ImageRef) -> Result<Vec<u8>> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/view", self.endpoint),
            &[
                ("filename", img.filename.as_str()),
                ("subfolder", img.subfolder.as_str()),
                ("type", img.img_type.as_str()),
            ],
        )
        .map_err(|e| ComfyError::InvalidResponse(format!("Bad image URL: {}", e)))?;

        let resp = self
            .http
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| ComfyError::Network {
                context: format!("Failed to fetch image {} from ComfyUI", img.filename),
                source: e,
            })?;

        if !resp.status().is_success() {
            return Err(ComfyError::Http {
                status: resp.status().as_u16(),
                body: format!("Failed to fetch image {}", img.filename),
            });
        }

        let bytes = resp.bytes().await.map_err(|e| ComfyError::Network {
            context: "Failed to read image bytes".into(),
            source: e,
        })?;
        Ok(bytes.to_vec())
    }

    /// Download every image recorded for a finished prompt, in manifest
    /// order: nodes as the server lists them, images by position within a node.
    pub async fn fetch_images(&self, prompt_id: &str) -> Result<Vec<ImageResult>> {
        let history = self.history(prompt_id).await?;
        let mut results = Vec::new();
        for node in &history.outputs {
            for (index, img) in node.images.iter().enumerate() {
                let data = self.image(img).await?;
                results.push(ImageResult {
                    node_id: node.node_id.clone(),
                    index,
                    data,
                });
            }
        }
        tracing::debug!(prompt_id, count = results.len(), "Fetched images");
        Ok(results)
    }

    // ── Generation ──────────────────────────────────────────────────

    /// Run a completed workflow and return the images it produced.
    ///
    /// Opens a WebSocket, queues the workflow, waits for the server to
    /// report the prompt finished, then downloads its images. The socket is
    /// closed whether or not this succeeds. Waiting has no timeout.
    pub async fn generate_image(&self, workflow: &Value) -> Result<Vec<ImageResult>> {
        let client_id = Uuid::new_v4().to_string();
        let result = self.generate_inner(workflow, &client_id).await;
        if let Err(e) = &result {
            tracing::error!("Error generating image: {}", e);
        }
        result
    }

    async fn generate_inner(&self, workflow: &Value, client_id: &str) -> Result<Vec<ImageResult>> {
        let mut ws = self.connect(client_id).await?;
        let result = self.run_prompt(&mut ws, workflow, client_id).await;
        if let Err(e) = ws.close(None).await {
            tracing::debug!("WebSocket close failed: {}", e);
        }
        result
    }

    async fn connect(&self, client_id: &str) -> Result<WsStream> {
        let ws_url = self.ws_url(client_id);
        tracing::debug!(url = %ws_url, "Connecting");
        let (ws, _) = tokio_tungstenite::connect_async(&ws_url)
            .await
            .map_err(|e| ComfyError::WebSocket {
                context: format!("Cannot open WebSocket to ComfyUI at {}", ws_url),
                source: e,
            })?;
        Ok(ws)
    }

    async fn run_prompt(
        &self,
        ws: &mut WsStream,
        workflow: &Value,
        client_id: &str,
    ) -> Result<Vec<ImageResult>> {
        let prompt_id = self.queue_prompt(workflow, client_id).await?;
        tracing::info!(%prompt_id, "Queued prompt");
        wait_for_completion(ws, &prompt_id).await?;
        self.fetch_images(&prompt_id).await
    }
}

/// Pull the per-node image lists for `prompt_id` out of a `/history` response.
fn parse_history(json: &Value, prompt_id: &str) -> Result<PromptHistory> {
    let entry = json
        .get(prompt_id)
        .ok_or_else(|| ComfyError::InvalidResponse(format!("History has no entry for prompt {}", prompt_id)))?;

    let outputs = entry
        .get("outputs")
        .and_then(|o| o.as_object())
        .ok_or_else(|| ComfyError::InvalidResponse("History entry missing outputs".into()))?;

    let mut nodes = Vec::new();
    for (node_id, node_output) in outputs {
        if let Some(imgs) = node_output.get("images") {
            let images: Vec<ImageRef> = serde_json::from_value(imgs.clone())?;
            nodes.push(NodeImages {
                node_id: node_id.clone(),
                images,
            });
        }
    }

    Ok(PromptHistory { outputs: nodes })
}
