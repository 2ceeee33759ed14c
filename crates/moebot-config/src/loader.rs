//! YAML loading with `!secret`, `!env_var` and `!include` resolution

use crate::error::{ConfigError, ConfigResult};
use crate::secrets::Secrets;
use serde_yaml::value::TaggedValue;
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Loads YAML files and resolves custom tags in place
pub struct YamlLoader {
    config_dir: PathBuf,
    secrets: Secrets,
    /// Files currently being loaded, outermost first
    include_stack: Vec<PathBuf>,
}

impl YamlLoader {
    /// Create a loader for `config_dir`, reading its `secrets.yaml`
    pub fn new(config_dir: impl Into<PathBuf>) -> ConfigResult<Self> {
        let config_dir = config_dir.into();
        let secrets = Secrets::load(&config_dir)?;
        Ok(Self::with_secrets(config_dir, secrets))
    }

    pub fn with_secrets(config_dir: impl Into<PathBuf>, secrets: Secrets) -> Self {
        Self {
            config_dir: config_dir.into(),
            secrets,
            include_stack: Vec::new(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Load a file, relative paths being resolved against the config dir
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> ConfigResult<Value> {
        let path = match path.as_ref() {
            p if p.is_absolute() => p.to_path_buf(),
            p => self.config_dir.join(p),
        };
        if self.include_stack.contains(&path) {
            return Err(ConfigError::CircularInclude { path });
        }
        debug!(path = %path.display(), "Loading YAML file");

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::ReadFile {
            path: path.clone(),
            source,
        })?;

        self.include_stack.push(path.clone());
        let result = self.load_str(&content, &path);
        self.include_stack.pop();
        result
    }

    /// Parse YAML text; `source` is used for errors and relative includes
    pub fn load_str(&mut self, content: &str, source: &Path) -> ConfigResult<Value> {
        let value: Value =
            serde_yaml::from_str(content).map_err(|e| ConfigError::ParseYaml {
                path: source.to_path_buf(),
                source: e,
            })?;
        self.resolve(value, source)
    }

    fn resolve(&mut self, value: Value, source: &Path) -> ConfigResult<Value> {
        match value {
            Value::Tagged(tagged) => self.resolve_tag(*tagged, source),
            Value::Mapping(map) => {
                let mut resolved = serde_yaml::Mapping::with_capacity(map.len());
                for (key, value) in map {
                    resolved.insert(key, self.resolve(value, source)?);
                }
                Ok(Value::Mapping(resolved))
            }
            Value::Sequence(seq) => seq
                .into_iter()
                .map(|v| self.resolve(v, source))
                .collect::<ConfigResult<Vec<_>>>()
                .map(Value::Sequence),
            scalar => Ok(scalar),
        }
    }

    fn resolve_tag(&mut self, tagged: TaggedValue, source: &Path) -> ConfigResult<Value> {
        trace!(tag = %tagged.tag, "Resolving tag");

        if tagged.tag == "secret" {
            let key = tag_argument("!secret", &tagged.value)?;
            let secret = self.secrets.get(key)?;
            debug!(key, "Substituted secret");
            Ok(Value::String(secret.to_string()))
        } else if tagged.tag == "env_var" {
            let argument = tag_argument("!env_var", &tagged.value)?;
            resolve_env_var(argument).map(Value::String)
        } else if tagged.tag == "include" {
            let argument = tag_argument("!include", &tagged.value)?;
            let base = source.parent().unwrap_or(&self.config_dir);
            let path = base.join(argument);
            self.load_file(path)
        } else {
            // Unknown tags are kept for the consumer to interpret
            let value = self.resolve(tagged.value, source)?;
            Ok(Value::Tagged(Box::new(TaggedValue {
                tag: tagged.tag,
                value,
            })))
        }
    }
}

fn tag_argument<'a>(tag: &'static str, value: &'a Value) -> ConfigResult<&'a str> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim()),
        other => Err(ConfigError::InvalidTag {
            tag,
            reason: format!("expected a non-empty string, got {other:?}"),
        }),
    }
}

/// `NAME` or `NAME default`
fn resolve_env_var(argument: &str) -> ConfigResult<String> {
    let (name, default) = match argument.split_once(char::is_whitespace) {
        Some((name, default)) => (name, Some(default.trim())),
        None => (argument, None),
    };

    match (std::env::var(name), default) {
        (Ok(value), _) => {
            debug!(var = name, "Substituted environment variable");
            Ok(value)
        }
        (Err(_), Some(default)) => Ok(default.to_string()),
        (Err(_), None) => Err(ConfigError::EnvVarNotFound {
            var: name.to_string(),
        }),
    }
}

/// Load `file` from `config_dir` with tags resolved
pub fn load_yaml(config_dir: impl Into<PathBuf>, file: impl AsRef<Path>) -> ConfigResult<Value> {
    YamlLoader::new(config_dir)?.load_file(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn get<'a>(value: &'a Value, key: &str) -> &'a Value {
        value.get(key).unwrap()
    }

    #[test]
    fn test_secret_substitution() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("secrets.yaml"), "key: abc123\n").unwrap();
        fs::write(dir.path().join("c.yaml"), "local_key: !secret key\n").unwrap();

        let value = load_yaml(dir.path(), "c.yaml").unwrap();
        assert_eq!(get(&value, "local_key").as_str(), Some("abc123"));
    }

    #[test]
    fn test_missing_secret() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("c.yaml"), "local_key: !secret key\n").unwrap();

        let result = load_yaml(dir.path(), "c.yaml");
        assert!(matches!(result, Err(ConfigError::SecretNotFound { .. })));
    }

    #[test]
    fn test_env_var_with_default() {
        let dir = TempDir::new().unwrap();
        std::env::set_var("MOEBOT_TEST_IP", "10.1.1.1");
        fs::write(
            dir.path().join("c.yaml"),
            "a: !env_var MOEBOT_TEST_IP\nb: !env_var MOEBOT_TEST_UNSET_VAR 192.168.0.9\n",
        )
        .unwrap();

        let value = load_yaml(dir.path(), "c.yaml").unwrap();
        assert_eq!(get(&value, "a").as_str(), Some("10.1.1.1"));
        assert_eq!(get(&value, "b").as_str(), Some("192.168.0.9"));

        std::env::remove_var("MOEBOT_TEST_IP");
    }

    #[test]
    fn test_env_var_missing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("c.yaml"), "a: !env_var MOEBOT_TEST_NEVER_SET\n").unwrap();

        let result = load_yaml(dir.path(), "c.yaml");
        assert!(matches!(result, Err(ConfigError::EnvVarNotFound { .. })));
    }

    #[test]
    fn test_include_is_relative_to_including_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("devices")).unwrap();
        fs::write(
            dir.path().join("devices/garden.yaml"),
            "- device_id: garden\n  ip_address: 10.0.0.5\n  local_key: k\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("c.yaml"),
            "moebot: !include devices/garden.yaml\n",
        )
        .unwrap();

        let value = load_yaml(dir.path(), "c.yaml").unwrap();
        let devices = get(&value, "moebot").as_sequence().unwrap();
        assert_eq!(devices.len(), 1);
    }

    #[test]
    fn test_circular_include() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.yaml"), "b: !include b.yaml\n").unwrap();
        fs::write(dir.path().join("b.yaml"), "a: !include a.yaml\n").unwrap();

        let result = load_yaml(dir.path(), "a.yaml");
        assert!(matches!(result, Err(ConfigError::CircularInclude { .. })));
    }

    #[test]
    fn test_invalid_tag_argument() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("c.yaml"), "a: !secret [1, 2]\n").unwrap();

        let result = load_yaml(dir.path(), "c.yaml");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidTag { tag: "!secret", .. })
        ));
    }
}
