//! AssetRoot - 配信してよい唯一のディレクトリ
//!
//! 起動時に canonicalize して固定します。以後は差し替えません（reload なし）。

use std::path::{Path, PathBuf};

use crate::error::GatewayError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRoot {
    canonical: PathBuf,
}

impl AssetRoot {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GatewayError> {
        let path = path.as_ref();
        let canonical = std::fs::canonicalize(path).map_err(|source| GatewayError::AssetRoot {
            path: path.to_path_buf(),
            source,
        })?;
        if !canonical.is_dir() {
            return Err(GatewayError::NotADirectory(path.to_path_buf()));
        }
        Ok(Self { canonical })
    }

    pub fn path(&self) -> &Path {
        &self.canonical
    }

    /// ディレクトリ名（reserved segment の既定値）
    pub fn dir_name(&self) -> Option<String> {
        self.canonical
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }

    /// canonical なパスが root の内側か
    pub fn contains(&self, canonical: &Path) -> bool {
        canonical.starts_with(&self.canonical)
    }
}

/// 拡張子から Content-Type を推定（不明なら application/octet-stream）
pub fn content_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
