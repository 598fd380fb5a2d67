//! Show what a workflow template currently holds for a few inputs, and
//! what it would be submitted as after substitution.
//!
//! Needs no server: only the template files are read.
//!
//! ```sh
//! cargo run --example query_template -- workflows/sdxl.json
//! ```

use comfy_image::{FileSource, Inputs, PathsFile, PromptTemplate};
use serde_json::Value;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let prompt_file = std::env::args().nth(1).unwrap_or_else(|| "default.json".to_string());
    let template = PromptTemplate::load(&FileSource, &prompt_file, &PathsFile::Derive).await?;

    match template.paths() {
        Some(paths) => println!("{} declared path(s)", paths.len()),
        None => println!("No path map; inputs are located by key search"),
    }

    let mut current = Inputs::new().with("text", Value::Null).with("seed", Value::Null);
    template.query(&mut current)?;
    for (key, value) in current.iter() {
        println!("  {} = {}", key, value);
    }

    let workflow = template.complete(&Inputs::from("a lighthouse at dusk").with("seed", 1234))?;
    println!("\nWorkflow JSON:");
    println!("{}", serde_json::to_string_pretty(&workflow)?);

    Ok(())
}
