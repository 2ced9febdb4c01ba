//! Script Registry - Store and reuse column scripts
//!
//! Each script is saved as one JSON file named after its id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::logs::log_warning;
use crate::error::{RegistryError, RegistryResult};
use crate::transform::dsl::{DslScript, ScriptDefinition};

/// A stored script with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredScript {
    pub id: String,
    /// Human-readable name
    pub name: String,
    pub script: ScriptDefinition,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
    #[serde(default)]
    pub use_count: u32,
}

/// Registry for managing column scripts
#[derive(Debug)]
pub struct ScriptRegistry {
    registry_dir: PathBuf,
    scripts: HashMap<String, StoredScript>,
}

impl ScriptRegistry {
    /// Open a registry, loading the scripts already stored in `dir`.
    ///
    /// A missing directory is an empty registry; it is created on first save.
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        let mut registry = Self {
            registry_dir: dir.as_ref().to_path_buf(),
            scripts: HashMap::new(),
        };
        registry.load_all();
        registry
    }

    fn load_all(&mut self) {
        let entries = match fs::read_dir(&self.registry_dir) {
            Ok(e) => e,
            Err(_) => return,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.extension().is_some_and(|e| e == "json") {
                continue;
            }
            let stored = fs::read_to_string(&path)
                .map_err(RegistryError::from)
                .and_then(|content| Ok(serde_json::from_str::<StoredScript>(&content)?));
            match stored {
                Ok(script) => {
                    self.scripts.insert(script.id.clone(), script);
                }
                Err(e) => log_warning(format!("Skipping {}: {}", path.display(), e)),
            }
        }
    }

    pub fn dir(&self) -> &Path {
        &self.registry_dir
    }

    /// All stored scripts, sorted by name
    pub fn list(&self) -> Vec<&StoredScript> {
        let mut scripts: Vec<_> = self.scripts.values().collect();
        scripts.sort_by(|a, b| a.name.cmp(&b.name).then(a.created_at.cmp(&b.created_at)));
        scripts
    }

    pub fn get(&self, id: &str) -> RegistryResult<&StoredScript> {
        self.scripts
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Compile a stored script so it can be run.
    pub fn load_script(&self, id: &str) -> RegistryResult<DslScript> {
        Ok(DslScript::new(self.get(id)?.script.clone())?)
    }

    /// Validate and store a script. Returns the new id.
    pub fn save(&mut self, script: ScriptDefinition, name: &str) -> RegistryResult<String> {
        script.validate()?;
        fs::create_dir_all(&self.registry_dir)?;

        let id = generate_id(name);
        let stored = StoredScript {
            id: id.clone(),
            name: name.to_string(),
            script,
            created_at: Utc::now(),
            last_used: None,
            use_count: 0,
        };

        self.write(&stored)?;
        self.scripts.insert(id.clone(), stored);
        Ok(id)
    }

    /// Import a script from a JSON file, named after the file unless given.
    pub fn import(&mut self, path: &Path, name: Option<&str>) -> RegistryResult<String> {
        let content = fs::read_to_string(path)?;
        let script = ScriptDefinition::from_json(&content)?;

        let script_name = name.unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("imported")
        });

        self.save(script, script_name)
    }

    /// Update usage statistics after a run
    pub fn record_use(&mut self, id: &str) -> RegistryResult<()> {
        let stored = self
            .scripts
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        stored.last_used = Some(Utc::now());
        stored.use_count += 1;

        let stored = stored.clone();
        self.write(&stored)
    }

    pub fn delete(&mut self, id: &str) -> RegistryResult<()> {
        if self.scripts.remove(id).is_none() {
            return Err(RegistryError::NotFound(id.to_string()));
        }
        fs::remove_file(self.path_for(id))?;
        Ok(())
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.registry_dir.join(format!("{}.json", id))
    }

    fn write(&self, stored: &StoredScript) -> RegistryResult<()> {
        let content = serde_json::to_string_pretty(stored)?;
        fs::write(self.path_for(&stored.id), content)?;
        Ok(())
    }
}

/// Generate a unique ID from a name
fn generate_id(name: &str) -> String {
    let slug = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    let slug = if slug.is_empty() { "script".to_string() } else { slug };

    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", slug, &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScriptError;
    use crate::transform::dsl::{example_script, ColumnSpec, HeaderSpec};
    use tempfile::tempdir;

    #[test]
    fn test_generate_id() {
        let id = generate_id("Split Names (v2)");
        assert!(id.starts_with("split-names-v2-"));
        assert_eq!(id.len(), "split-names-v2-".len() + 8);
        assert!(generate_id("!!!").starts_with("script-"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let mut registry = ScriptRegistry::with_dir(dir.path());
        let id = registry.save(example_script(), "names").unwrap();

        let reopened = ScriptRegistry::with_dir(dir.path());
        let stored = reopened.get(&id).unwrap();
        assert_eq!(stored.name, "names");
        assert_eq!(stored.script, example_script());
        assert!(reopened.load_script(&id).is_ok());
    }

    #[test]
    fn test_invalid_script_not_saved() {
        let dir = tempdir().unwrap();
        let mut registry = ScriptRegistry::with_dir(dir.path());
        let script = ScriptDefinition::new(vec![HeaderSpec::literal("a")], Vec::new());

        let err = registry.save(script, "broken").unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Script(ScriptError::InvalidScript(_))
        ));
        assert!(registry.list().is_empty());
    }

    #[test]
    fn test_import_uses_file_stem() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("merge-names.json");
        let script = ScriptDefinition::new(
            vec![HeaderSpec::literal("Full Name")],
            vec![ColumnSpec::from_sources(vec![0, 1], " ")],
        );
        fs::write(&file, script.to_json().unwrap()).unwrap();

        let mut registry = ScriptRegistry::with_dir(dir.path().join("registry"));
        let id = registry.import(&file, None).unwrap();
        assert_eq!(registry.get(&id).unwrap().name, "merge-names");

        let id = registry.import(&file, Some("Custom")).unwrap();
        assert!(id.starts_with("custom-"));
        assert_eq!(registry.list().len(), 2);
    }

    #[test]
    fn test_record_use_persists() {
        let dir = tempdir().unwrap();
        let mut registry = ScriptRegistry::with_dir(dir.path());
        let id = registry.save(example_script(), "names").unwrap();

        registry.record_use(&id).unwrap();
        registry.record_use(&id).unwrap();

        let reopened = ScriptRegistry::with_dir(dir.path());
        let stored = reopened.get(&id).unwrap();
        assert_eq!(stored.use_count, 2);
        assert!(stored.last_used.is_some());
        assert!(matches!(
            registry.record_use("nope"),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete() {
        let dir = tempdir().unwrap();
        let mut registry = ScriptRegistry::with_dir(dir.path());
        let id = registry.save(example_script(), "names").unwrap();

        registry.delete(&id).unwrap();
        assert!(registry.get(&id).is_err());
        assert!(!dir.path().join(format!("{}.json", id)).exists());
        assert!(matches!(registry.delete(&id), Err(RegistryError::NotFound(_))));
    }

    #[test]
    fn test_corrupt_file_skipped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let registry = ScriptRegistry::with_dir(dir.path());
        assert!(registry.list().is_empty());
    }
}
