//! Persisted feature stores and the mapper file.
//!
//! Stores are JSON documents loaded in full per session. The mapper is
//! written with four-space indentation so it stays diffable by hand.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{DatasetEntry, FeatureMatrix, Fingerprint, MapperEntry};
use crate::session::SessionLayout;

/// Flattened grayscale images and the file each row came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawImageStore")]
pub struct ImageFeatureStore {
    pub dataset: FeatureMatrix,
    pub filenames: Vec<String>,
}

#[derive(Deserialize)]
struct RawImageStore {
    dataset: FeatureMatrix,
    filenames: Vec<String>,
}

impl TryFrom<RawImageStore> for ImageFeatureStore {
    type Error = Error;

    fn try_from(raw: RawImageStore) -> Result<Self> {
        Self::new(raw.dataset, raw.filenames)
    }
}

impl ImageFeatureStore {
    pub fn new(dataset: FeatureMatrix, filenames: Vec<String>) -> Result<Self> {
        if dataset.n_rows() != filenames.len() {
            return Err(Error::InvalidData(format!(
                "image store has {} rows but {} filenames",
                dataset.n_rows(),
                filenames.len()
            )));
        }
        Ok(Self { dataset, filenames })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.filenames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filenames.is_empty()
    }
}

/// Melody fingerprints keyed by dataset filename.
pub type AudioFeatureStore = BTreeMap<String, Fingerprint>;

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

/// Serialize with four-space indentation.
pub fn to_indented_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(|e| Error::InvalidData(e.to_string()))
}

pub fn load_image_store(path: &Path) -> Result<ImageFeatureStore> {
    load_json(path)
}

pub fn save_image_store(path: &Path, store: &ImageFeatureStore) -> Result<()> {
    save_json(path, store)
}

pub fn load_audio_store(path: &Path) -> Result<AudioFeatureStore> {
    load_json(path)
}

pub fn save_audio_store(path: &Path, store: &AudioFeatureStore) -> Result<()> {
    save_json(path, store)
}

/// Load a mapper file, failing with [`Error::MissingMapper`] if absent.
pub fn load_mapper(path: &Path) -> Result<Vec<MapperEntry>> {
    if !path.is_file() {
        return Err(Error::MissingMapper(path.to_path_buf()));
    }
    load_json(path)
}

pub fn save_mapper(path: &Path, entries: &[MapperEntry]) -> Result<()> {
    let json = to_indented_json(entries)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Copy `mapper.json` to the backup path unless a backup already exists.
///
/// Returns `true` if a new backup was written.
pub fn backup_mapper(layout: &SessionLayout) -> Result<bool> {
    let mapper = layout.mapper_path();
    let backup = layout.mapper_backup_path();
    if backup.is_file() {
        return Ok(false);
    }
    if !mapper.is_file() {
        return Err(Error::MissingMapper(mapper));
    }
    std::fs::copy(&mapper, &backup)?;
    log::debug!("Backed up {} to {}", mapper.display(), backup.display());
    Ok(true)
}

/// Load the pristine mapper: the backup when one exists, else `mapper.json`.
pub fn load_source_mapper(layout: &SessionLayout) -> Result<Vec<MapperEntry>> {
    let backup = layout.mapper_backup_path();
    if backup.is_file() {
        load_mapper(&backup)
    } else {
        load_mapper(&layout.mapper_path())
    }
}

/// Put the backed-up mapper back in place and delete the backup.
pub fn restore_mapper(layout: &SessionLayout) -> Result<()> {
    let backup = layout.mapper_backup_path();
    if !backup.is_file() {
        return Err(Error::MissingMapper(backup));
    }
    std::fs::copy(&backup, layout.mapper_path())?;
    std::fs::remove_file(&backup)?;
    Ok(())
}

/// Mapper rows whose image and audio files are both present in the session.
pub fn list_dataset(layout: &SessionLayout) -> Result<Vec<DatasetEntry>> {
    let mapper = load_mapper(&layout.mapper_path())?;
    let images = layout.images_dir();
    let audio = layout.audio_dir();
    Ok(mapper
        .iter()
        .filter(|entry| {
            images.join(&entry.pic_name).is_file() && audio.join(&entry.audio_file).is_file()
        })
        .map(DatasetEntry::from)
        .collect())
}
