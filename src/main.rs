use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::Rng;
use tracing_subscriber::EnvFilter;

use comfy_image::config::{DEFAULT_PROMPT_FILE, DEFAULT_SERVER_ADDRESS};
use comfy_image::{ClientConfig, Generator, Inputs, PathsFile};

/// Generate images with ComfyUI from a saved workflow template.
///
/// Saved files are printed to stdout, one JSON object per line.
#[derive(Debug, Parser)]
#[command(name = "comfy-image", version)]
struct Cli {
    /// Prompt text, written to the template's `text` input.
    prompt: Option<String>,

    /// ComfyUI server as host:port.
    #[arg(long, env = "COMFY_SERVER", default_value = DEFAULT_SERVER_ADDRESS)]
    server: String,

    /// Workflow template (path or http(s) URL).
    #[arg(long, default_value = DEFAULT_PROMPT_FILE)]
    prompt_file: String,

    /// Path-map file; defaults to the template name with `.paths.json`.
    #[arg(long, conflicts_with = "no_paths")]
    paths_file: Option<String>,

    /// Ignore any path-map file and locate every input by key search.
    #[arg(long)]
    no_paths: bool,

    /// Directory for the saved images.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Seed; random when omitted.
    #[arg(long)]
    seed: Option<u32>,
}

impl Cli {
    fn config(&self) -> ClientConfig {
        let paths_file = match (&self.paths_file, self.no_paths) {
            (_, true) => PathsFile::None,
            (Some(reference), false) => PathsFile::Explicit(reference.clone()),
            (None, false) => PathsFile::Derive,
        };
        let builder = ClientConfig::builder()
            .with_server_address(self.server.clone())
            .with_prompt_file(self.prompt_file.clone())
            .with_paths_file(paths_file);
        match &self.output_dir {
            Some(dir) => builder.with_output_dir(dir.clone()).build(),
            None => builder.build(),
        }
    }

    fn inputs(&self) -> Inputs {
        let seed = self.seed.unwrap_or_else(|| rand::rng().random());
        let mut inputs = Inputs::new();
        if let Some(text) = &self.prompt {
            inputs.insert("text", text.clone());
        }
        inputs.insert("seed", seed);
        inputs
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::info!("PROMPT: {:?}", cli.prompt);

    let config = cli.config();
    let generator = Generator::from_config(&config)
        .await
        .with_context(|| format!("failed to load prompt template '{}'", config.prompt_file))?;

    let saved = generator
        .generate_and_save(&cli.inputs())
        .await
        .context("image generation failed")?;
    tracing::info!("IMAGES: {:?}", saved);

    for record in &saved {
        println!("{}", serde_json::to_string(record)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["comfy-image"]).unwrap();
        assert!(cli.prompt.is_none());
        assert_eq!(cli.prompt_file, "default.json");

        let config = cli.config();
        assert_eq!(config.paths_file, PathsFile::Derive);
        assert!(config.output_dir.is_none());

        let inputs = cli.inputs();
        assert!(inputs.get("text").is_none());
        assert!(inputs.get("seed").unwrap().is_u64());
    }

    #[test]
    fn test_cli_prompt_and_seed() {
        let cli = Cli::try_parse_from(["comfy-image", "a cat", "--seed", "42"]).unwrap();
        let inputs = cli.inputs();
        assert_eq!(inputs.get("text"), Some(&serde_json::json!("a cat")));
        assert_eq!(inputs.get("seed"), Some(&serde_json::json!(42)));
    }

    #[test]
    fn test_cli_paths_options() {
        let cli = Cli::try_parse_from(["comfy-image", "--paths-file", "map.json"]).unwrap();
        assert_eq!(cli.config().paths_file, PathsFile::Explicit("map.json".into()));

        let cli = Cli::try_parse_from(["comfy-image", "--no-paths"]).unwrap();
        assert_eq!(cli.config().paths_file, PathsFile::None);

        assert!(Cli::try_parse_from(["comfy-image", "--no-paths", "--paths-file", "m.json"]).is_err());
    }
}
