//! Substitution of named inputs into a prompt template.
//!
//! Each input lands either at the dotted path declared for it in a
//! [`PathMap`], or, when no path is declared, at the first key with the
//! same name found by a depth-first, pre-order walk of the template in
//! document order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::{ComfyError, Result};

/// Declared locations of inputs inside a template, e.g. `"seed" -> "3.inputs.seed"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathMap(HashMap<String, String>);

impl PathMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare (or replace) the dotted path for an input.
    pub fn with(mut self, key: impl Into<String>, path: impl Into<String>) -> Self {
        self.0.insert(key.into(), path.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, P: Into<String>> FromIterator<(K, P)> for PathMap {
    fn from_iter<I: IntoIterator<Item = (K, P)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, p)| (k.into(), p.into())).collect())
    }
}

/// Named values to write into (or read back from) a template.
///
/// A bare string converts to a single input named `"text"`:
///
/// ```
/// use comfy_image::Inputs;
///
/// let inputs = Inputs::from("a cat");
/// assert_eq!(inputs.get("text"), Some(&serde_json::json!("a cat")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inputs(Map<String, Value>);

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an input, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Inputs {
    fn from(text: &str) -> Self {
        Inputs::new().with("text", text)
    }
}

impl From<String> for Inputs {
    fn from(text: String) -> Self {
        Inputs::new().with("text", text)
    }
}

impl From<Map<String, Value>> for Inputs {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Return a copy of `template` with every input written into its slot.
///
/// The template itself is never modified. Fails with
/// [`ComfyError::PathNotFound`] when a declared path does not reach an
/// object, and with [`ComfyError::KeyNotFound`] when an undeclared key
/// appears nowhere in the template.
pub fn complete_prompt(template: &Value, inputs: &Inputs, paths: Option<&PathMap>) -> Result<Value> {
    let mut data = template.clone();
    for (key, value) in inputs.iter() {
        let (container, slot) = locate(&mut data, key, paths)?;
        container.insert(slot, value.clone());
    }
    Ok(data)
}

/// Read the template's current value at each input's slot into `inputs`.
///
/// Resolution is identical to [`complete_prompt`]. A declared path whose
/// final key is absent reads back as `null`. Returns an untouched copy of
/// the template.
pub fn query_prompt(template: &Value, inputs: &mut Inputs, paths: Option<&PathMap>) -> Result<Value> {
    let mut data = template.clone();
    let keys: Vec<String> = inputs.keys().cloned().collect();
    for key in keys {
        let (container, slot) = locate(&mut data, &key, paths)?;
        let current = container.get(&slot).cloned().unwrap_or(Value::Null);
        inputs.insert(key, current);
    }
    Ok(data)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Key(String),
    Index(usize),
}

/// Find the object that holds the slot for `key`, and the slot's name.
fn locate<'a>(
    data: &'a mut Value,
    key: &str,
    paths: Option<&PathMap>,
) -> Result<(&'a mut Map<String, Value>, String)> {
    if let Some(path) = paths.and_then(|p| p.get(key)) {
        let mut segments: Vec<&str> = path.split('.').collect();
        let last = segments.pop().unwrap_or_default().to_string();
        let trail: Vec<Step> = segments
            .into_iter()
            .map(|s| Step::Key(s.to_string()))
            .collect();
        return descend(data, &trail)
            .map(|container| (container, last))
            .ok_or_else(|| ComfyError::PathNotFound {
                key: key.to_string(),
                path: path.to_string(),
            });
    }

    let mut trail = Vec::new();
    if !search(data, key, &mut trail) {
        return Err(ComfyError::KeyNotFound {
            key: key.to_string(),
        });
    }
    let container = descend(data, &trail).ok_or_else(|| ComfyError::KeyNotFound {
        key: key.to_string(),
    })?;
    Ok((container, key.to_string()))
}

/// Depth-first, pre-order search for the first object entry named `key`.
///
/// On a match `trail` holds the steps from the root to the object that
/// contains the entry. Array elements are walked, but array positions are
/// never matched as keys.
fn search(value: &Value, key: &str, trail: &mut Vec<Step>) -> bool {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                if k == key {
                    return true;
                }
                trail.push(Step::Key(k.clone()));
                if search(v, key, trail) {
                    return true;
                }
                trail.pop();
            }
            false
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                trail.push(Step::Index(i));
                if search(v, key, trail) {
                    return true;
                }
                trail.pop();
            }
            false
        }
        _ => false,
    }
}

fn descend<'a>(mut value: &'a mut Value, trail: &[Step]) -> Option<&'a mut Map<String, Value>> {
    for step in trail {
        value = match step {
            Step::Key(k) => value.get_mut(k.as_str())?,
            Step::Index(i) => value.get_mut(*i)?,
        };
    }
    value.as_object_mut()
}
