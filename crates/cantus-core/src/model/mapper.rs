use serde::{Deserialize, Serialize};

/// One row of the audio-file ↔ image-file cross-reference table.
///
/// Before fusion only `pic_name` and `audio_file` are populated. After a
/// query the mapper is rewritten with the fused scores, and whichever
/// modality did not contribute stays `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapperEntry {
    pub audio_file: String,
    pub pic_name: String,
    #[serde(default)]
    pub audio_similarity: Option<f64>,
    #[serde(default)]
    pub image_distance: Option<f64>,
}

impl MapperEntry {
    #[must_use]
    pub fn new(pic_name: impl Into<String>, audio_file: impl Into<String>) -> Self {
        Self {
            audio_file: audio_file.into(),
            pic_name: pic_name.into(),
            audio_similarity: None,
            image_distance: None,
        }
    }

    #[must_use]
    pub fn with_scores(mut self, audio_similarity: Option<f64>, image_distance: Option<f64>) -> Self {
        self.audio_similarity = audio_similarity;
        self.image_distance = image_distance;
        self
    }
}

/// A mapper row whose image and audio files both exist in the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub song: String,
    pub cover: String,
    pub audio_similarity: Option<f64>,
    pub image_distance: Option<f64>,
}

impl From<&MapperEntry> for DatasetEntry {
    fn from(entry: &MapperEntry) -> Self {
        Self {
            song: entry.audio_file.clone(),
            cover: entry.pic_name.clone(),
            audio_similarity: entry.audio_similarity,
            image_distance: entry.image_distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pre_fusion_mapper() {
        let json = r#"[{"pic_name": "a.png", "audio_file": "a.mid"}]"#;
        let entries: Vec<MapperEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries, vec![MapperEntry::new("a.png", "a.mid")]);
        assert!(entries[0].audio_similarity.is_none());
    }

    #[test]
    fn test_serialize_writes_nulls_in_order() {
        let entry = MapperEntry::new("a.png", "a.mid").with_scores(None, Some(0.0));
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(
            json,
            r#"{"audio_file":"a.mid","pic_name":"a.png","audio_similarity":null,"image_distance":0.0}"#
        );
    }

    #[test]
    fn test_dataset_entry_from_mapper() {
        let entry = MapperEntry::new("c.jpg", "c.mid").with_scores(Some(1.5), None);
        let dataset = DatasetEntry::from(&entry);
        assert_eq!(dataset.song, "c.mid");
        assert_eq!(dataset.cover, "c.jpg");
        assert_eq!(dataset.audio_similarity, Some(1.5));
    }
}
