//! YAML document loading
//!
//! Documents are parsed into a [`serde_yaml::Value`] tree and custom tags
//! are resolved in the same pass:
//!
//! - `!from_yaml FILE KEY` is replaced by the value found at `KEY` in
//!   `FILE` (relative to the referencing document). Nested keys are
//!   separated by `.`; a literal dot is written `\.`.
//! - `!override VALUE` is kept as a tagged value so the schema layer can
//!   tell "replace" apart from "merge". A string under `!override` is
//!   re-parsed as YAML, which lets it wrap another tag.
//!
//! Referenced files are cached per absolute path for the lifetime of the
//! loader, so a file referenced many times is read and parsed once.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::Value;
use tracing::debug;

use crate::error::{Result, ScubaError};

pub const TAG_FROM_YAML: &str = "from_yaml";
pub const TAG_OVERRIDE: &str = "override";

/// Loads YAML documents and resolves cross-file references.
///
/// One loader is meant to live for a single CLI invocation.
#[derive(Debug, Default)]
pub struct YamlLoader {
    /// Fully resolved documents, keyed by absolute path
    cache: HashMap<PathBuf, Value>,
    /// Documents currently being resolved (cycle detection)
    loading: HashSet<PathBuf>,
    /// Number of files read from disk
    files_read: usize,
}

impl YamlLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files this loader has read from disk.
    pub fn files_read(&self) -> usize {
        self.files_read
    }

    /// Load and fully resolve the document at `path`.
    pub fn load(&mut self, path: &Path) -> Result<Value> {
        let path = absolute(path)?;
        self.load_cached(&path).cloned()
    }

    /// Parse and resolve a document from text, as if it lived in `dir`.
    pub fn load_str(&mut self, text: &str, dir: &Path, origin: &Path) -> Result<Value> {
        let value = parse(text, origin)?;
        self.resolve(value, dir)
    }

    fn load_cached(&mut self, path: &Path) -> Result<&Value> {
        if !self.cache.contains_key(path) {
            if !self.loading.insert(path.to_path_buf()) {
                return Err(ScubaError::Reference(format!(
                    "Circular reference to {}",
                    path.display()
                )));
            }

            let result = self.read_and_resolve(path);
            self.loading.remove(path);
            let value = result?;
            self.cache.insert(path.to_path_buf(), value);
        }

        self.cache
            .get(path)
            .ok_or_else(|| ScubaError::Reference(format!("{} not loaded", path.display())))
    }

    fn read_and_resolve(&mut self, path: &Path) -> Result<Value> {
        debug!("Loading YAML document {}", path.display());
        let text = fs::read_to_string(path).map_err(|e| ScubaError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        self.files_read += 1;

        let dir = path.parent().unwrap_or_else(|| Path::new("/"));
        self.load_str(&text, dir, path)
    }

    fn resolve(&mut self, value: Value, dir: &Path) -> Result<Value> {
        match value {
            Value::Tagged(tagged) => self.resolve_tagged(*tagged, dir),
            Value::Sequence(seq) => seq
                .into_iter()
                .map(|v| self.resolve(v, dir))
                .collect::<Result<Vec<_>>>()
                .map(Value::Sequence),
            Value::Mapping(map) => {
                let mut resolved = serde_yaml::Mapping::with_capacity(map.len());
                for (k, v) in map {
                    let v = self.resolve(v, dir)?;
                    resolved.insert(k, v);
                }
                Ok(Value::Mapping(resolved))
            }
            other => Ok(other),
        }
    }

    fn resolve_tagged(&mut self, tagged: TaggedValue, dir: &Path) -> Result<Value> {
        let TaggedValue { tag, value } = tagged;

        if tag == TAG_FROM_YAML {
            let Value::String(args) = value else {
                return Err(ScubaError::Reference(
                    "!from_yaml expects a string argument".to_string(),
                ));
            };
            return self.resolve_from_yaml(&args, dir);
        }

        if tag == TAG_OVERRIDE {
            let inner = match value {
                Value::String(text) if text.trim().is_empty() => Value::Null,
                Value::String(text) => {
                    let origin = dir.join("<!override>");
                    self.load_str(&text, dir, &origin)?
                }
                other => self.resolve(other, dir)?,
            };
            return Ok(override_value(inner));
        }

        // Foreign tags (e.g. from embedded CI files) are left alone.
        let value = self.resolve(value, dir)?;
        Ok(Value::Tagged(Box::new(TaggedValue { tag, value })))
    }

    fn resolve_from_yaml(&mut self, args: &str, dir: &Path) -> Result<Value> {
        let parts = shell_words::split(args)
            .map_err(|e| ScubaError::Reference(format!("{:?}: {}", args, e)))?;
        let [filename, key] = parts.as_slice() else {
            return Err(ScubaError::Reference(format!(
                "Two arguments expected to !from_yaml, got {:?}",
                args
            )));
        };

        let path = dir.join(filename);
        let doc = match self.load_cached(&path) {
            Ok(doc) => doc,
            Err(ScubaError::Parse { message, .. }) if !path.exists() => {
                return Err(ScubaError::Reference(format!("{}: {}", filename, message)));
            }
            Err(e) => return Err(e),
        };

        let mut cur = doc;
        for segment in split_key_path(key) {
            let next = match cur {
                Value::Mapping(map) => map.get(segment.as_str()),
                _ => None,
            };
            cur = next.ok_or_else(|| {
                ScubaError::Reference(format!("Key {:?} not found in {}", key, filename))
            })?;
        }
        Ok(cur.clone())
    }
}

/// Wrap a value in the `!override` tag.
pub fn override_value(value: Value) -> Value {
    Value::Tagged(Box::new(TaggedValue {
        tag: Tag::new(TAG_OVERRIDE),
        value,
    }))
}

/// Split a key path on unescaped `.` characters.
///
/// `\.` yields a literal dot inside the current segment.
pub fn split_key_path(key: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = key.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'.') => {
                chars.next();
                current.push('.');
            }
            '.' => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
}

fn parse(text: &str, origin: &Path) -> Result<Value> {
    serde_yaml::from_str(text).map_err(|e| ScubaError::Parse {
        path: origin.to_path_buf(),
        message: e.to_string(),
    })
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, text).unwrap();
        path
    }

    fn get<'a>(value: &'a Value, key: &str) -> &'a Value {
        value.get(key).unwrap_or_else(|| panic!("missing key {}", key))
    }

    #[test]
    fn test_split_key_path() {
        assert_eq!(split_key_path("image"), vec!["image"]);
        assert_eq!(split_key_path("foo.bar.pop"), vec!["foo", "bar", "pop"]);
        assert_eq!(split_key_path("foo\\.bar"), vec!["foo.bar"]);
        assert_eq!(
            split_key_path("\\.its.somewhere\\.down.here"),
            vec![".its", "somewhere.down", "here"]
        );
    }

    #[test]
    fn test_load_plain() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, ".scuba.yml", "image: alpine\n");
        let mut loader = YamlLoader::new();
        let doc = loader.load(&path).unwrap();
        assert_eq!(get(&doc, "image").as_str(), Some("alpine"));
    }

    #[test]
    fn test_load_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, ".scuba.yml", "image: [unclosed\n");
        let mut loader = YamlLoader::new();
        let err = loader.load(&path).unwrap_err();
        assert!(matches!(err, ScubaError::Parse { .. }));
    }

    #[test]
    fn test_from_yaml_nested_and_escaped_keys() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "gitlab.yml",
            "image: debian:8.2\n\
             somewhere:\n  down:\n    here: dummian:8.2\n\
             .its:\n  somewhere.down:\n    here: escaped:1\n",
        );
        let path = write(
            &dir,
            ".scuba.yml",
            "a: !from_yaml gitlab.yml image\n\
             b: !from_yaml gitlab.yml somewhere.down.here\n\
             c: !from_yaml gitlab.yml \"\\\\.its.somewhere\\\\.down.here\"\n",
        );

        let mut loader = YamlLoader::new();
        let doc = loader.load(&path).unwrap();
        assert_eq!(get(&doc, "a").as_str(), Some("debian:8.2"));
        assert_eq!(get(&doc, "b").as_str(), Some("dummian:8.2"));
        assert_eq!(get(&doc, "c").as_str(), Some("escaped:1"));
    }

    #[test]
    fn test_from_yaml_is_cached() {
        let dir = TempDir::new().unwrap();
        write(&dir, "ext.yml", "one: 1\ntwo: 2\nthree: 3\n");
        let path = write(
            &dir,
            ".scuba.yml",
            "a: !from_yaml ext.yml one\n\
             b: !from_yaml ext.yml two\n\
             c: !from_yaml ext.yml three\n",
        );

        let mut loader = YamlLoader::new();
        let doc = loader.load(&path).unwrap();
        assert_eq!(get(&doc, "c").as_u64(), Some(3));
        // .scuba.yml plus exactly one read of ext.yml
        assert_eq!(loader.files_read(), 2);
    }

    #[test]
    fn test_from_yaml_missing_key() {
        let dir = TempDir::new().unwrap();
        write(&dir, "ext.yml", "somewhere:\n  here: 1\n");
        let path = write(&dir, ".scuba.yml", "a: !from_yaml ext.yml somewhere.NONEXISTENT\n");
        let err = YamlLoader::new().load(&path).unwrap_err();
        assert!(matches!(err, ScubaError::Reference(_)));
    }

    #[test]
    fn test_from_yaml_non_mapping_intermediate() {
        let dir = TempDir::new().unwrap();
        write(&dir, "ext.yml", "image: alpine\n");
        let path = write(&dir, ".scuba.yml", "a: !from_yaml ext.yml image.tag\n");
        let err = YamlLoader::new().load(&path).unwrap_err();
        assert!(matches!(err, ScubaError::Reference(_)));
    }

    #[test]
    fn test_from_yaml_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, ".scuba.yml", "a: !from_yaml .NONEXISTENT.yml image\n");
        let err = YamlLoader::new().load(&path).unwrap_err();
        assert!(matches!(err, ScubaError::Reference(_)));
    }

    #[test]
    fn test_from_yaml_wrong_arg_count() {
        let dir = TempDir::new().unwrap();
        write(&dir, "ext.yml", "image: alpine\n");
        let path = write(&dir, ".scuba.yml", "a: !from_yaml ext.yml\n");
        let err = YamlLoader::new().load(&path).unwrap_err();
        assert!(matches!(err, ScubaError::Reference(_)));
    }

    #[test]
    fn test_from_yaml_recursive() {
        let dir = TempDir::new().unwrap();
        write(&dir, "inner.yml", "value: deep\n");
        write(&dir, "outer.yml", "ref: !from_yaml inner.yml value\n");
        let path = write(&dir, ".scuba.yml", "a: !from_yaml outer.yml ref\n");
        let doc = YamlLoader::new().load(&path).unwrap();
        assert_eq!(get(&doc, "a").as_str(), Some("deep"));
    }

    #[test]
    fn test_from_yaml_cycle() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.yml", "x: !from_yaml b.yml y\n");
        write(&dir, "b.yml", "y: !from_yaml a.yml x\n");
        let path = write(&dir, ".scuba.yml", "a: !from_yaml a.yml x\n");
        let err = YamlLoader::new().load(&path).unwrap_err();
        assert!(matches!(err, ScubaError::Reference(_)));
    }

    #[test]
    fn test_override_is_preserved() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, ".scuba.yml", "a: !override -v /tmp/:/tmp/\nb: !override\n");
        let doc = YamlLoader::new().load(&path).unwrap();

        let Value::Tagged(a) = get(&doc, "a") else {
            panic!("expected tagged value");
        };
        assert!(a.tag == TAG_OVERRIDE);
        assert_eq!(a.value.as_str(), Some("-v /tmp/:/tmp/"));

        let Value::Tagged(b) = get(&doc, "b") else {
            panic!("expected tagged value");
        };
        assert!(b.value.is_null());
    }

    #[test]
    fn test_override_wrapping_from_yaml() {
        let dir = TempDir::new().unwrap();
        write(&dir, "args.yml", "args: -v /tmp/:/tmp/\n");
        let path = write(&dir, ".scuba.yml", "a: !override '!from_yaml args.yml args'\n");
        let doc = YamlLoader::new().load(&path).unwrap();

        let Value::Tagged(a) = get(&doc, "a") else {
            panic!("expected tagged value");
        };
        assert_eq!(a.value.as_str(), Some("-v /tmp/:/tmp/"));
    }
}
