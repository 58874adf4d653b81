//! On-disk session layout.
//!
//! A session is one working directory holding a dataset (images, audio, the
//! mapper), its precomputed feature stores, and the query inputs:
//!
//! ```text
//! <root>/<session-id>/
//!     images/                 dataset images
//!     audio/                  dataset MIDI (and WAV to transcribe)
//!     features.json           image feature store
//!     audio_features.json     audio feature store
//!     mapper.json             audio ↔ image cross-reference
//!     copy_mapper.json        pristine mapper backed up before a query
//!     query/image/input.png   image query
//!     query/audio/input.mid   melody query
//!     time.txt                elapsed-time report of the last query
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Identifier selecting a session directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// A fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SessionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty()
            || trimmed == "."
            || trimmed.contains("..")
            || trimmed.contains('/')
            || trimmed.contains('\\')
        {
            return Err(Error::InvalidSessionId(s.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolved paths of one session directory.
#[derive(Debug, Clone)]
pub struct SessionLayout {
    id: SessionId,
    dir: PathBuf,
}

impl SessionLayout {
    /// Resolve an existing session. Fails with [`Error::MissingSession`] when
    /// the directory does not exist.
    pub fn open(root: impl AsRef<Path>, id: SessionId) -> Result<Self> {
        let dir = root.as_ref().join(id.as_str());
        if !dir.is_dir() {
            return Err(Error::MissingSession(dir));
        }
        Ok(Self { id, dir })
    }

    /// Create the session directory tree (idempotent).
    pub fn create(root: impl AsRef<Path>, id: SessionId) -> Result<Self> {
        let layout = Self {
            dir: root.as_ref().join(id.as_str()),
            id,
        };
        for dir in [
            layout.images_dir(),
            layout.audio_dir(),
            layout.query_image_dir(),
            layout.query_audio_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(layout)
    }

    #[must_use]
    pub const fn id(&self) -> &SessionId {
        &self.id
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn images_dir(&self) -> PathBuf {
        self.dir.join("images")
    }

    #[must_use]
    pub fn audio_dir(&self) -> PathBuf {
        self.dir.join("audio")
    }

    #[must_use]
    pub fn image_features_path(&self) -> PathBuf {
        self.dir.join("features.json")
    }

    #[must_use]
    pub fn audio_features_path(&self) -> PathBuf {
        self.dir.join("audio_features.json")
    }

    #[must_use]
    pub fn mapper_path(&self) -> PathBuf {
        self.dir.join("mapper.json")
    }

    #[must_use]
    pub fn mapper_backup_path(&self) -> PathBuf {
        self.dir.join("copy_mapper.json")
    }

    #[must_use]
    pub fn query_image_dir(&self) -> PathBuf {
        self.dir.join("query").join("image")
    }

    #[must_use]
    pub fn query_audio_dir(&self) -> PathBuf {
        self.dir.join("query").join("audio")
    }

    #[must_use]
    pub fn query_image_path(&self) -> PathBuf {
        self.query_image_dir().join("input.png")
    }

    #[must_use]
    pub fn query_audio_path(&self) -> PathBuf {
        self.query_audio_dir().join("input.mid")
    }

    #[must_use]
    pub fn time_report_path(&self) -> PathBuf {
        self.dir.join("time.txt")
    }

    /// Remove every file and directory inside the query input directories.
    pub fn clear_query_inputs(&self) -> Result<()> {
        for dir in [self.query_image_dir(), self.query_audio_dir()] {
            if !dir.is_dir() {
                continue;
            }
            for entry in std::fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.is_dir() {
                    std::fs::remove_dir_all(&path)?;
                } else {
                    std::fs::remove_file(&path)?;
                }
            }
        }
        Ok(())
    }
}
