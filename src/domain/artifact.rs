//! Run-scoped artifact store
//!
//! Artifacts are named file bundles handed from one stage to the next. The
//! store lives in a temporary directory that is removed when the run ends, so
//! nothing leaks between runs. Producers declare an artifact, fill it, and
//! publish it exactly once; consumers can only open published artifacts. That
//! gate is what guarantees a failed stage never leaks a half-filled artifact
//! downstream.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::error::ArtifactError;

/// Conventional name of the source-tree artifact
pub const SOURCE_ARTIFACT: &str = "sourceOutput";

/// Conventional name of the manifest artifact
pub const IMAGE_DETAIL_ARTIFACT: &str = "imageDetail";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArtifactState {
    Declared,
    Published,
}

/// Handle to one artifact's directory
#[derive(Debug, Clone)]
pub struct Artifact {
    name: String,
    dir: PathBuf,
}

impl Artifact {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Absolute path of a file inside the artifact
    pub fn file(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.dir.join(relative)
    }

    /// Write a file into the artifact, creating parent directories
    pub fn write_file(
        &self,
        relative: impl AsRef<Path>,
        contents: &str,
    ) -> Result<(), ArtifactError> {
        let path = self.file(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        fs::write(&path, contents).map_err(|e| self.io_error(e))
    }

    /// Read a UTF-8 file from the artifact
    pub fn read_file(&self, relative: impl AsRef<Path>) -> Result<String, ArtifactError> {
        fs::read_to_string(self.file(relative)).map_err(|e| self.io_error(e))
    }

    /// Relative paths of all files in the artifact, sorted
    pub fn files(&self) -> Result<Vec<PathBuf>, ArtifactError> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.dir).sort_by_file_name() {
            let entry = entry.map_err(|e| ArtifactError::Io {
                name: self.name.clone(),
                message: e.to_string(),
            })?;
            if entry.file_type().is_file() {
                let relative = entry
                    .path()
                    .strip_prefix(&self.dir)
                    .map_err(|e| ArtifactError::Io {
                        name: self.name.clone(),
                        message: e.to_string(),
                    })?;
                files.push(relative.to_path_buf());
            }
        }
        files.sort();
        Ok(files)
    }

    fn io_error(&self, e: std::io::Error) -> ArtifactError {
        ArtifactError::Io {
            name: self.name.clone(),
            message: e.to_string(),
        }
    }
}

/// Store of all artifacts belonging to a single pipeline run
#[derive(Debug)]
pub struct ArtifactStore {
    root: TempDir,
    states: HashMap<String, ArtifactState>,
}

impl ArtifactStore {
    pub fn new() -> Result<Self, ArtifactError> {
        let root = tempfile::tempdir().map_err(|e| ArtifactError::Io {
            name: "<store>".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            root,
            states: HashMap::new(),
        })
    }

    /// Declare a new, empty artifact. Names are unique within a run.
    pub fn declare(&mut self, name: &str) -> Result<Artifact, ArtifactError> {
        if name.is_empty() || name.chars().any(std::path::is_separator) || name.contains("..") {
            return Err(ArtifactError::InvalidName {
                name: name.to_string(),
            });
        }
        if self.states.contains_key(name) {
            return Err(ArtifactError::DuplicateName {
                name: name.to_string(),
            });
        }
        let dir = self.root.path().join(name);
        fs::create_dir_all(&dir).map_err(|e| ArtifactError::Io {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        self.states.insert(name.to_string(), ArtifactState::Declared);
        Ok(Artifact {
            name: name.to_string(),
            dir,
        })
    }

    /// Seal an artifact after its producing stage filled it.
    ///
    /// Publishing is one-shot; a second publish of the same name is an error.
    pub fn publish(&mut self, artifact: &Artifact) -> Result<(), ArtifactError> {
        match self.states.get_mut(artifact.name()) {
            None => Err(ArtifactError::Unknown {
                name: artifact.name().to_string(),
            }),
            Some(state @ ArtifactState::Declared) => {
                *state = ArtifactState::Published;
                Ok(())
            }
            Some(ArtifactState::Published) => Err(ArtifactError::AlreadyPublished {
                name: artifact.name().to_string(),
            }),
        }
    }

    /// Open a published artifact for reading. Unpublished artifacts are
    /// invisible to consumers.
    pub fn open(&self, name: &str) -> Result<Artifact, ArtifactError> {
        match self.states.get(name) {
            None => Err(ArtifactError::Unknown {
                name: name.to_string(),
            }),
            Some(ArtifactState::Declared) => Err(ArtifactError::NotPublished {
                name: name.to_string(),
            }),
            Some(ArtifactState::Published) => Ok(Artifact {
                name: name.to_string(),
                dir: self.root.path().join(name),
            }),
        }
    }

    /// Whether the named artifact has been published
    pub fn is_published(&self, name: &str) -> bool {
        matches!(self.states.get(name), Some(ArtifactState::Published))
    }

    /// Hex SHA-256 over the published artifact's file names and contents
    pub fn digest(&self, name: &str) -> Result<String, ArtifactError> {
        let artifact = self.open(name)?;
        let mut hasher = Sha256::new();
        for relative in artifact.files()? {
            hasher.update(relative.to_string_lossy().as_bytes());
            hasher.update([0u8]);
            let contents = fs::read(artifact.file(&relative)).map_err(|e| ArtifactError::Io {
                name: name.to_string(),
                message: e.to_string(),
            })?;
            hasher.update(&contents);
        }
        Ok(format!("{:x}", hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_publish_open_lifecycle() {
        let mut store = ArtifactStore::new().unwrap();
        let artifact = store.declare("sourceOutput").unwrap();
        artifact.write_file("app/main.c", "int main(void) { return 0; }").unwrap();

        store.publish(&artifact).unwrap();
        let reopened = store.open("sourceOutput").unwrap();
        assert_eq!(
            reopened.read_file("app/main.c").unwrap(),
            "int main(void) { return 0; }"
        );
        assert_eq!(reopened.files().unwrap(), vec![PathBuf::from("app/main.c")]);
    }

    #[test]
    fn test_open_unpublished_fails() {
        let mut store = ArtifactStore::new().unwrap();
        store.declare("imageDetail").unwrap();
        let result = store.open("imageDetail");
        assert!(matches!(result, Err(ArtifactError::NotPublished { .. })));
        assert!(!store.is_published("imageDetail"));
    }

    #[test]
    fn test_publish_twice_fails() {
        let mut store = ArtifactStore::new().unwrap();
        let artifact = store.declare("imageDetail").unwrap();
        store.publish(&artifact).unwrap();
        let result = store.publish(&artifact);
        assert!(matches!(result, Err(ArtifactError::AlreadyPublished { .. })));
    }

    #[test]
    fn test_duplicate_declare_fails() {
        let mut store = ArtifactStore::new().unwrap();
        store.declare("sourceOutput").unwrap();
        let result = store.declare("sourceOutput");
        assert!(matches!(result, Err(ArtifactError::DuplicateName { .. })));
    }

    #[test]
    fn test_open_unknown_fails() {
        let store = ArtifactStore::new().unwrap();
        let result = store.open("nothing");
        assert!(matches!(result, Err(ArtifactError::Unknown { .. })));
    }

    #[test]
    fn test_invalid_names_rejected() {
        let mut store = ArtifactStore::new().unwrap();
        assert!(matches!(
            store.declare(""),
            Err(ArtifactError::InvalidName { .. })
        ));
        assert!(matches!(
            store.declare("a/b"),
            Err(ArtifactError::InvalidName { .. })
        ));
        assert!(matches!(
            store.declare(".."),
            Err(ArtifactError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_digest_stable_for_same_content() {
        let digest_of = |content: &str| {
            let mut store = ArtifactStore::new().unwrap();
            let artifact = store.declare("imageDetail").unwrap();
            artifact.write_file("imagedefinitions.json", content).unwrap();
            store.publish(&artifact).unwrap();
            store.digest("imageDetail").unwrap()
        };

        let first = digest_of("[{\"name\":\"application\",\"imageUri\":\"r:a1b2c3d\"}]");
        let second = digest_of("[{\"name\":\"application\",\"imageUri\":\"r:a1b2c3d\"}]");
        let changed = digest_of("[{\"name\":\"application\",\"imageUri\":\"r:latest\"}]");

        assert_eq!(first, second);
        assert_ne!(first, changed);
    }
}
