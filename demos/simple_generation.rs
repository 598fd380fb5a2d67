//! Generate images from `default.json` and save them to the current directory.
//!
//! Requires a running ComfyUI instance at localhost:8188 and an API-format
//! workflow saved as `default.json` (with an optional `default.paths.json`).
//!
//! ```sh
//! cargo run --example simple_generation -- "a beautiful sunset over mountains"
//! ```

use comfy_image::{ClientConfig, Generator, Inputs};

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let text = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "a beautiful sunset over mountains".to_string());

    let config = ClientConfig::builder()
        .with_server_address("localhost:8188")
        .build();
    let generator = Generator::from_config(&config).await?;

    let inputs = Inputs::from(text).with("seed", rand::random::<u32>());
    let saved = generator.generate_and_save(&inputs).await?;

    println!("Generated {} image(s)", saved.len());
    for image in &saved {
        println!("  node {} #{} -> {}", image.node_id, image.index, image.filename);
    }

    Ok(())
}
