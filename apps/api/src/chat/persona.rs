//! Persona registry: maps a model id to the system prompt used with it.
//!
//! Lookup is a table hit with a default fallback. Adding a persona means adding an
//! entry (in `builtin()` or the JSON file named by `PERSONAS_FILE`), never a branch.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chat::prompts::{RESUME_ASSISTANT_SYSTEM_PROMPT, ROAST_MODE_SYSTEM_PROMPT};
use crate::llm_client::models::ROAST_MODEL;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    pub system_prompt: String,
}

impl Persona {
    pub fn new(name: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
        }
    }
}

/// Built once at startup, then shared read-only.
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    default: Persona,
    by_model: HashMap<String, Persona>,
}

impl PersonaRegistry {
    pub fn new(default: Persona) -> Self {
        Self {
            default,
            by_model: HashMap::new(),
        }
    }

    /// Career-coach default plus the roast-mode persona.
    pub fn builtin() -> Self {
        Self::new(Persona::new("resume-assistant", RESUME_ASSISTANT_SYSTEM_PROMPT))
            .with(ROAST_MODEL, Persona::new("roast-mode", ROAST_MODE_SYSTEM_PROMPT))
    }

    pub fn with(mut self, model_id: impl Into<String>, persona: Persona) -> Self {
        self.by_model.insert(model_id.into(), persona);
        self
    }

    /// Adds (or overrides) personas from a JSON object of
    /// `{"<model id>": {"name": ..., "system_prompt": ...}}`.
    pub fn extend_from_file(mut self, path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read personas file {}", path.display()))?;
        let entries: BTreeMap<String, Persona> = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid personas file {}", path.display()))?;
        info!("Loaded {} personas from {}", entries.len(), path.display());
        self.by_model.extend(entries);
        Ok(self)
    }

    /// Persona for `model_id`, or the default when the id is unknown.
    pub fn resolve(&self, model_id: &str) -> &Persona {
        self.by_model.get(model_id).unwrap_or(&self.default)
    }

    pub fn default_persona(&self) -> &Persona {
        &self.default
    }

    /// Model ids with a dedicated persona.
    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.by_model.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_unknown_model_uses_default() {
        let registry = PersonaRegistry::builtin();
        assert_eq!(registry.resolve("some/unknown-model").name, "resume-assistant");
        assert_eq!(registry.resolve("").name, "resume-assistant");
    }

    #[test]
    fn test_roast_model_selects_roast_persona() {
        let registry = PersonaRegistry::builtin();
        let persona = registry.resolve(ROAST_MODEL);
        assert_eq!(persona.name, "roast-mode");
        assert_eq!(persona.system_prompt, ROAST_MODE_SYSTEM_PROMPT);
    }

    #[test]
    fn test_new_persona_is_a_registry_entry() {
        let registry =
            PersonaRegistry::builtin().with("acme/interviewer", Persona::new("interviewer", "Ask questions."));
        assert_eq!(registry.resolve("acme/interviewer").system_prompt, "Ask questions.");
        let mut models: Vec<&str> = registry.models().collect();
        models.sort_unstable();
        assert_eq!(models, vec!["acme/interviewer", ROAST_MODEL]);
    }

    #[test]
    fn test_extend_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"acme/coach": {{"name": "coach", "system_prompt": "Be kind."}}}}"#
        )
        .unwrap();
        let registry = PersonaRegistry::builtin()
            .extend_from_file(file.path())
            .unwrap();
        assert_eq!(registry.resolve("acme/coach").name, "coach");
        assert_eq!(registry.resolve(ROAST_MODEL).name, "roast-mode");
    }

    #[test]
    fn test_extend_from_invalid_file_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(PersonaRegistry::builtin()
            .extend_from_file(file.path())
            .is_err());
    }
}
