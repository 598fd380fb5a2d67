use serde_json::Value;

use crate::error::{ComfyError, Result};
use crate::resolve::{complete_prompt, query_prompt, Inputs, PathMap};
use crate::source::TemplateSource;

/// Suffix of the path-map file that sits next to a prompt file.
pub const PATHS_SUFFIX: &str = ".paths.json";

/// Which path-map file accompanies a prompt file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PathsFile {
    /// Derive it from the prompt file name, see [`derive_paths_file`].
    #[default]
    Derive,
    /// Read it from this reference.
    Explicit(String),
    /// No path map; every input is found by key search.
    None,
}

/// Parsed contents of a prompt file and its path-map file.
#[derive(Debug, Clone, Default)]
pub struct PromptFiles {
    pub prompt: Option<Value>,
    pub paths: Option<PathMap>,
}

impl PromptFiles {
    /// Pair the loaded files into a template. `reference` names the prompt
    /// file in the error when it could not be read.
    pub fn into_template(self, reference: &str) -> Result<PromptTemplate> {
        let prompt = self
            .prompt
            .ok_or_else(|| ComfyError::MissingTemplate(reference.to_string()))?;
        Ok(PromptTemplate::new(prompt, self.paths))
    }
}

/// `workflows/sdxl.json` -> `workflows/sdxl.paths.json`.
///
/// Exactly one trailing extension of the final path component is removed;
/// a name without one simply gets the suffix appended.
pub fn derive_paths_file(prompt_file: &str) -> String {
    let name_start = prompt_file.rfind('/').map(|i| i + 1).unwrap_or(0);
    let stem = match prompt_file[name_start..].rfind('.') {
        Some(dot) if dot + 1 < prompt_file.len() - name_start => &prompt_file[..name_start + dot],
        _ => prompt_file,
    };
    format!("{}{}", stem, PATHS_SUFFIX)
}

/// Load a prompt file and its path map from `source`.
///
/// Either file may be missing (its field is then `None`), but text that is
/// present must be valid JSON.
pub async fn fetch_prompt_files<S: TemplateSource>(
    source: &S,
    prompt_file: &str,
    paths_file: &PathsFile,
) -> Result<PromptFiles> {
    let paths_ref = match paths_file {
        PathsFile::Derive => Some(derive_paths_file(prompt_file)),
        PathsFile::Explicit(r) => Some(r.clone()),
        PathsFile::None => None,
    };

    let raw_prompt = source.fetch_text(prompt_file).await;
    let raw_paths = match &paths_ref {
        Some(r) => source.fetch_text(r).await,
        None => None,
    };

    let prompt: Option<Value> = raw_prompt.map(|t| serde_json::from_str(&t)).transpose()?;
    let paths: Option<PathMap> = raw_paths.map(|t| serde_json::from_str(&t)).transpose()?;
    tracing::debug!(
        prompt_file,
        paths_file = paths_ref.as_deref().unwrap_or(""),
        has_prompt = prompt.is_some(),
        has_paths = paths.is_some(),
        "Loaded prompt files"
    );

    Ok(PromptFiles { prompt, paths })
}

/// A prompt template and its declared input paths, fixed at construction.
///
/// Every call works on a fresh copy, so one template serves any number of
/// generations.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    data: Value,
    paths: Option<PathMap>,
}

impl PromptTemplate {
    pub fn new(data: Value, paths: Option<PathMap>) -> Self {
        Self { data, paths }
    }

    /// Load from `source` and fail if the prompt file itself is unavailable.
    pub async fn load<S: TemplateSource>(source: &S, prompt_file: &str, paths_file: &PathsFile) -> Result<Self> {
        fetch_prompt_files(source, prompt_file, paths_file)
            .await?
            .into_template(prompt_file)
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn paths(&self) -> Option<&PathMap> {
        self.paths.as_ref()
    }

    /// A copy of the template with `inputs` substituted in.
    pub fn complete(&self, inputs: &Inputs) -> Result<Value> {
        complete_prompt(&self.data, inputs, self.paths.as_ref())
    }

    /// Fill `inputs` with the template's current values.
    pub fn query(&self, inputs: &mut Inputs) -> Result<()> {
        query_prompt(&self.data, inputs, self.paths.as_ref()).map(|_| ())
    }
}
