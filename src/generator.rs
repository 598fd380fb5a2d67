use crate::client::ComfyClient;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::persist::ImageSaver;
use crate::resolve::Inputs;
use crate::source::{Source, TemplateSource};
use crate::template::PromptTemplate;
use crate::types::{ImageResult, SavedImage};

/// A ComfyUI client bound to one prompt template.
///
/// The template is loaded once and copied for every call, so a single
/// `Generator` can serve any number of (possibly concurrent) generations.
#[derive(Debug, Clone)]
pub struct Generator {
    client: ComfyClient,
    template: PromptTemplate,
    saver: ImageSaver,
}

impl Generator {
    pub fn new(client: ComfyClient, template: PromptTemplate) -> Self {
        Self {
            client,
            template,
            saver: ImageSaver::new(),
        }
    }

    pub fn with_saver(mut self, saver: ImageSaver) -> Self {
        self.saver = saver;
        self
    }

    /// Build from config, reading the template with a source chosen from
    /// the prompt file reference. HTTP reads use `config.request_timeout`.
    pub async fn from_config(config: &ClientConfig) -> Result<Self> {
        let source = Source::for_reference(&config.prompt_file).with_request_timeout(config.request_timeout);
        Self::from_config_with_source(config, &source).await
    }

    /// Build from config, reading the template from `source`.
    pub async fn from_config_with_source<S: TemplateSource>(config: &ClientConfig, source: &S) -> Result<Self> {
        let template = PromptTemplate::load(source, &config.prompt_file, &config.paths_file).await?;
        let client = ComfyClient::new(config.server_address.clone())
            .with_request_timeout(config.request_timeout);
        let saver = match &config.output_dir {
            Some(dir) => ImageSaver::new().with_output_dir(dir.clone()),
            None => ImageSaver::new(),
        };
        Ok(Self::new(client, template).with_saver(saver))
    }

    pub fn client(&self) -> &ComfyClient {
        &self.client
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Substitute `inputs`, run the prompt, and return the images in memory.
    pub async fn generate(&self, inputs: &Inputs) -> Result<Vec<ImageResult>> {
        let workflow = self.template.complete(inputs)?;
        self.client.generate_image(&workflow).await
    }

    /// Substitute `inputs`, run the prompt, and write the images to disk.
    pub async fn generate_and_save(&self, inputs: &Inputs) -> Result<Vec<SavedImage>> {
        let images = self.generate(inputs).await?;
        self.saver.save(&images).await
    }
}
