use serde::{Deserialize, Serialize};

/// Reference to an image stored in ComfyUI's output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub filename: String,
    #[serde(default)]
    pub subfolder: String,
    #[serde(rename = "type", default = "default_img_type")]
    pub img_type: String,
}

fn default_img_type() -> String {
    "output".to_string()
}

/// Images recorded for one node of a finished prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeImages {
    pub node_id: String,
    pub images: Vec<ImageRef>,
}

/// Output manifest of a finished prompt, in the server's node order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptHistory {
    pub outputs: Vec<NodeImages>,
}

/// Response to a prompt submission.
#[derive(Debug, Clone, Deserialize)]
pub struct QueuedPrompt {
    pub prompt_id: String,
    #[serde(default)]
    pub number: Option<u64>,
}

/// Raw bytes of one generated image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResult {
    pub node_id: String,
    /// Position within the node's `images` list.
    pub index: usize,
    pub data: Vec<u8>,
}

/// A generated image written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedImage {
    pub node_id: String,
    pub index: usize,
    pub filename: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_ref_wire_names() {
        let img: ImageRef = serde_json::from_str(
            r#"{"filename": "ComfyUI_00001_.png", "subfolder": "", "type": "output"}"#,
        )
        .unwrap();
        assert_eq!(img.filename, "ComfyUI_00001_.png");
        assert_eq!(img.img_type, "output");

        let json = serde_json::to_string(&img).unwrap();
        assert!(json.contains("\"type\":\"output\""));
    }

    #[test]
    fn test_saved_image_serialization() {
        let saved = SavedImage {
            node_id: "9".into(),
            index: 0,
            filename: "output_x_9_0.png".into(),
        };
        let json = serde_json::to_string(&saved).unwrap();
        assert_eq!(
            json,
            r#"{"node_id":"9","index":0,"filename":"output_x_9_0.png"}"#
        );
    }

    #[test]
    fn test_queued_prompt_ignores_extra_fields() {
        let queued: QueuedPrompt =
            serde_json::from_str(r#"{"prompt_id": "abc", "number": 3, "node_errors": {}}"#)
                .unwrap();
        assert_eq!(queued.prompt_id, "abc");
        assert_eq!(queued.number, Some(3));
    }
}
