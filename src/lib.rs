//! # comfy-image
//!
//! Async Rust client that drives [ComfyUI](https://github.com/comfyanonymous/ComfyUI)
//! from a saved API-format workflow.
//!
//! A workflow exported from ComfyUI becomes a reusable template: named
//! inputs (prompt text, seed, ...) are written into it either at a dotted
//! path declared in a sidecar `*.paths.json` file, or at the first key of
//! the same name found in the workflow. The completed workflow is queued,
//! completion is awaited over ComfyUI's WebSocket, and the output images
//! are downloaded and saved under collision-resistant names.
//!
//! ## Quick Start
//!
//! ```no_run
//! use comfy_image::{ClientConfig, Generator, Inputs};
//!
//! # async fn example() -> comfy_image::Result<()> {
//! let config = ClientConfig::builder()
//!     .with_server_address("localhost:8188")
//!     .with_prompt_file("default.json")
//!     .build();
//! let generator = Generator::from_config(&config).await?;
//!
//! let inputs = Inputs::from("a sunset over mountains").with("seed", 42);
//! for saved in generator.generate_and_save(&inputs).await? {
//!     println!("{} ({} #{})", saved.filename, saved.node_id, saved.index);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Waiting for completion has no timeout: a server that never reports the
//! prompt as finished keeps the call pending.

pub mod client;
pub mod config;
pub mod error;
pub mod generator;
pub mod monitor;
pub mod persist;
pub mod resolve;
pub mod source;
pub mod template;
pub mod types;

pub use client::ComfyClient;
pub use config::ClientConfig;
pub use error::{ComfyError, Result};
pub use generator::Generator;
pub use persist::ImageSaver;
pub use resolve::{complete_prompt, query_prompt, Inputs, PathMap};
pub use source::{FileSource, HttpSource, Source, TemplateSource};
pub use template::{fetch_prompt_files, PathsFile, PromptFiles, PromptTemplate};
pub use types::{ImageRef, ImageResult, NodeImages, PromptHistory, SavedImage};
