//! Mapping of request-supplied names onto filesystem paths.

use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

use crate::error::{ErrorCode, StorageError, StorageResult};

/// Sub-directory of a container that holds staged blocks.
pub const STAGING_DIR: &str = "uncommitted";

/// File name prefix of in-flight writes inside the staging directory.
pub const TEMP_PREFIX: &str = ".tmp-";

/// Resolves container, blob and block names to paths under a root.
///
/// Every name is checked to be a single plain path segment, and every
/// resulting path is checked to canonicalize to itself and to stay under
/// the root. No method touches the filesystem.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: normalize(&root.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<container>`
    pub fn container_path(&self, container: &str) -> StorageResult<PathBuf> {
        validate_segment("container", container)?;
        self.checked(self.root.join(container))
    }

    /// `<root>/<container>/uncommitted`
    pub fn staging_dir(&self, container: &str) -> StorageResult<PathBuf> {
        Ok(self.container_path(container)?.join(STAGING_DIR))
    }

    /// `<root>/<container>/<blob>`
    pub fn blob_path(&self, container: &str, blob: &str) -> StorageResult<PathBuf> {
        validate_blob_name(blob)?;
        self.checked(self.container_path(container)?.join(blob))
    }

    /// `<root>/<container>/uncommitted/<blob>_<block_id>`
    pub fn block_path(
        &self,
        container: &str,
        blob: &str,
        block_id: &str,
    ) -> StorageResult<PathBuf> {
        validate_blob_name(blob)?;
        validate_segment("block id", block_id)?;
        let file_name = format!("{}_{}", blob, block_id);
        validate_segment("block id", &file_name)?;
        self.checked(self.staging_dir(container)?.join(file_name))
    }

    /// A fresh temp file path in the container's staging directory.
    pub fn temp_path(&self, container: &str) -> StorageResult<PathBuf> {
        let file_name = format!("{}{}", TEMP_PREFIX, Uuid::new_v4());
        self.checked(self.staging_dir(container)?.join(file_name))
    }

    fn checked(&self, path: PathBuf) -> StorageResult<PathBuf> {
        if normalize(&path) != path || !path.starts_with(&self.root) {
            return Err(unsafe_name("path", &path.to_string_lossy()));
        }
        Ok(path)
    }
}

fn validate_blob_name(blob: &str) -> StorageResult<()> {
    validate_segment("blob", blob)?;
    if blob == STAGING_DIR {
        return Err(unsafe_name("blob", blob));
    }
    Ok(())
}

/// Accepts only names that form exactly one normal path component.
fn validate_segment(kind: &str, segment: &str) -> StorageResult<()> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0'])
    {
        return Err(unsafe_name(kind, segment));
    }

    let mut components = Path::new(segment).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(c)), None) if c == segment => Ok(()),
        _ => Err(unsafe_name(kind, segment)),
    }
}

/// Lexically resolves `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn unsafe_name(kind: &str, value: &str) -> StorageError {
    tracing::warn!("Rejected unsafe {} name {:?}", kind, value);
    StorageError::with_message(
        ErrorCode::InvalidResourceName,
        format!("The specified {} name is not a valid path segment.", kind),
    )
}
