use std::path::PathBuf;
use std::time::Duration;

use crate::template::PathsFile;

pub const DEFAULT_SERVER_ADDRESS: &str = "localhost:8000";
pub const DEFAULT_PROMPT_FILE: &str = "default.json";

/// Settings for a [`Generator`](crate::Generator).
///
/// Use [`ClientConfig::builder()`] for ergonomic construction, or
/// [`ClientConfig::default()`] for `localhost:8000` with `default.json`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// ComfyUI `host:port`, or a full `http(s)://` URL.
    pub server_address: String,

    /// Prompt template: a filesystem path or an `http(s)://` URL.
    pub prompt_file: String,

    /// Path-map file accompanying the prompt template.
    pub paths_file: PathsFile,

    /// Directory for saved images. `None` = current directory.
    pub output_dir: Option<PathBuf>,

    /// Timeout for each HTTP request to the server.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_address: DEFAULT_SERVER_ADDRESS.to_string(),
            prompt_file: DEFAULT_PROMPT_FILE.to_string(),
            paths_file: PathsFile::Derive,
            output_dir: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Start building a config with the builder pattern.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn with_server_address(mut self, address: impl Into<String>) -> Self {
        self.config.server_address = address.into();
        self
    }

    pub fn with_prompt_file(mut self, reference: impl Into<String>) -> Self {
        self.config.prompt_file = reference.into();
        self
    }

    pub fn with_paths_file(mut self, paths_file: PathsFile) -> Self {
        self.config.paths_file = paths_file;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.server_address, "localhost:8000");
        assert_eq!(config.prompt_file, "default.json");
        assert_eq!(config.paths_file, PathsFile::Derive);
        assert!(config.output_dir.is_none());
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::builder()
            .with_server_address("10.0.0.2:8188")
            .with_prompt_file("flows/sdxl.json")
            .with_paths_file(PathsFile::None)
            .with_output_dir("out")
            .with_request_timeout(Duration::from_secs(5))
            .build();
        assert_eq!(config.server_address, "10.0.0.2:8188");
        assert_eq!(config.prompt_file, "flows/sdxl.json");
        assert_eq!(config.paths_file, PathsFile::None);
        assert_eq!(config.output_dir, Some(PathBuf::from("out")));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }
}
