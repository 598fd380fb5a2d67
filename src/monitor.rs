//! Waiting on ComfyUI's WebSocket for a prompt to finish.

use futures_util::{Stream, StreamExt};
use serde_json::Value;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::error::{ComfyError, Result};

/// One JSON text frame from `/ws`: `{"type": ..., "data": {...}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionEvent {
    /// Empty when the frame has no string `type`.
    pub kind: String,
    pub data: Value,
}

impl ExecutionEvent {
    /// Only text that is not JSON at all is an error; any other shape
    /// yields an event that matches nothing.
    pub fn parse(text: &str) -> Result<Self> {
        let json: Value = serde_json::from_str(text)?;
        let kind = json
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let data = json.get("data").cloned().unwrap_or(Value::Null);
        Ok(Self { kind, data })
    }

    /// `executing` with a `null` node marks the end of a prompt's execution.
    pub fn is_completion_of(&self, prompt_id: &str) -> bool {
        self.kind == "executing"
            && self.data.get("node").map(Value::is_null).unwrap_or(false)
            && self.data.get("prompt_id").and_then(Value::as_str) == Some(prompt_id)
    }
}

/// Read frames until the completion event for `prompt_id` arrives.
///
/// Binary frames (previews) and events for other prompts are skipped.
/// There is deliberately no timeout: if the server never reports
/// completion this waits forever. A text frame that is not valid JSON, a
/// receive error, or the socket closing ends the wait with an error.
pub async fn wait_for_completion<S>(ws: &mut S, prompt_id: &str) -> Result<()>
where
    S: Stream<Item = std::result::Result<Message, WsError>> + Unpin,
{
    while let Some(msg) = ws.next().await {
        let msg = msg.map_err(|e| ComfyError::WebSocket {
            context: "WebSocket receive failed".into(),
            source: e,
        })?;

        match msg {
            Message::Text(text) => {
                let event = ExecutionEvent::parse(&text)?;
                if event.is_completion_of(prompt_id) {
                    tracing::debug!(prompt_id, "Execution complete");
                    return Ok(());
                }
                tracing::trace!(kind = %event.kind, "Ignoring event");
            }
            Message::Binary(data) => {
                tracing::trace!(bytes = data.len(), "Skipping binary preview frame");
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    Err(ComfyError::ConnectionClosed(prompt_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn text(s: &str) -> std::result::Result<Message, WsError> {
        Ok(Message::Text(s.to_string()))
    }

    #[test]
    fn test_completion_event() {
        let event = ExecutionEvent::parse(
            r#"{"type": "executing", "data": {"node": null, "prompt_id": "abc"}}"#,
        )
        .unwrap();
        assert!(event.is_completion_of("abc"));
        assert!(!event.is_completion_of("xyz"));
    }

    #[test]
    fn test_node_still_running_is_not_completion() {
        let event = ExecutionEvent::parse(
            r#"{"type": "executing", "data": {"node": "6", "prompt_id": "abc"}}"#,
        )
        .unwrap();
        assert!(!event.is_completion_of("abc"));
    }

    #[test]
    fn test_missing_node_is_not_completion() {
        let event =
            ExecutionEvent::parse(r#"{"type": "executing", "data": {"prompt_id": "abc"}}"#).unwrap();
        assert!(!event.is_completion_of("abc"));
    }

    #[test]
    fn test_other_event_types_ignored() {
        let event = ExecutionEvent::parse(
            r#"{"type": "progress", "data": {"value": 3, "max": 20, "node": null, "prompt_id": "abc"}}"#,
        )
        .unwrap();
        assert!(!event.is_completion_of("abc"));

        let status = ExecutionEvent::parse(r#"{"type": "status"}"#).unwrap();
        assert!(!status.is_completion_of("abc"));
    }

    #[tokio::test]
    async fn test_wait_skips_binary_and_other_prompts() {
        let mut frames = stream::iter(vec![
            text(r#"{"type": "status", "data": {"status": {"exec_info": {"queue_remaining": 1}}}}"#),
            Ok(Message::Binary(vec![0, 1, 2, 3])),
            text(r#"{"type": "executing", "data": {"node": null, "prompt_id": "other"}}"#),
            text(r#"{"type": "executing", "data": {"node": "3", "prompt_id": "mine"}}"#),
            text(r#"{"type": "executing", "data": {"node": null, "prompt_id": "mine"}}"#),
            text("this frame is never read"),
        ]);
        wait_for_completion(&mut frames, "mine").await.unwrap();

        // The frame after the completion event is left unread.
        let rest: Vec<_> = frames.collect().await;
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn test_untyped_frames_parse_as_no_event() {
        for text in [r#"{"data": {"node": null}}"#, "[]", "42", r#"{"type": 5, "data": 1}"#] {
            let event = ExecutionEvent::parse(text).unwrap();
            assert_eq!(event.kind, "");
            assert!(!event.is_completion_of("mine"));
        }
    }

    #[tokio::test]
    async fn test_wait_skips_frames_without_type() {
        let mut frames = stream::iter(vec![
            text(r#"{"data": {"node": null}}"#),
            text("[]"),
            text(r#"{"type": 5}"#),
            text(r#"{"type": "executing", "data": {"node": null, "prompt_id": "mine"}}"#),
        ]);
        wait_for_completion(&mut frames, "mine").await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_fails_when_stream_ends() {
        let mut frames = stream::iter(vec![text(
            r#"{"type": "executing", "data": {"node": null, "prompt_id": "other"}}"#,
        )]);
        let err = wait_for_completion(&mut frames, "mine").await.unwrap_err();
        assert!(matches!(err, ComfyError::ConnectionClosed(ref id) if id == "mine"));
    }

    #[tokio::test]
    async fn test_wait_fails_on_close_frame() {
        let mut frames = stream::iter(vec![Ok::<_, WsError>(Message::Close(None))]);
        let err = wait_for_completion(&mut frames, "mine").await.unwrap_err();
        assert!(matches!(err, ComfyError::ConnectionClosed(_)));
    }

    #[tokio::test]
    async fn test_wait_fails_on_malformed_text() {
        let mut frames = stream::iter(vec![text("{oops")]);
        let err = wait_for_completion(&mut frames, "mine").await.unwrap_err();
        assert!(matches!(err, ComfyError::Json(_)));
    }

    #[tokio::test]
    async fn test_wait_propagates_receive_error() {
        let mut frames = stream::iter(vec![Err::<Message, _>(WsError::ConnectionClosed)]);
        let err = wait_for_completion(&mut frames, "mine").await.unwrap_err();
        assert!(matches!(err, ComfyError::WebSocket { .. }));
    }
}
