//! Merges image and audio rankings through the mapper table.

use std::collections::HashMap;

use cantus_core::model::MapperEntry;

use crate::audio_retriever::AudioMatch;
use crate::image_retriever::ImageMatch;

/// Default number of image matches that take part in fusion.
pub const DEFAULT_TOP_K: usize = 10;

/// Combines the rankings of whichever modalities were queried.
///
/// `None` means the modality was not queried at all. When both are present
/// the audio order wins and every audio candidate must map to an image in
/// the image top-k.
#[derive(Debug, Clone, Copy)]
pub struct ResultFusion<'a> {
    mapper: &'a [MapperEntry],
    top_k: usize,
}

impl<'a> ResultFusion<'a> {
    pub const fn new(mapper: &'a [MapperEntry], top_k: usize) -> Self {
        Self { mapper, top_k }
    }

    pub fn fuse(
        &self,
        images: Option<&[ImageMatch]>,
        audio: Option<&[AudioMatch]>,
    ) -> Vec<MapperEntry> {
        match (images, audio) {
            (Some(images), None) => {
                log::debug!("Fusing image results only");
                self.image_only(images)
            }
            (None, Some(audio)) => {
                log::debug!("Fusing audio results only");
                self.audio_only(audio)
            }
            (Some(images), Some(audio)) => {
                log::debug!("Fusing audio results filtered by the image top {}", self.top_k);
                self.combined(images, audio)
            }
            (None, None) => Vec::new(),
        }
    }

    fn top_images<'m>(&self, images: &'m [ImageMatch]) -> &'m [ImageMatch] {
        &images[..images.len().min(self.top_k)]
    }

    /// Audio file to image file; later mapper rows override earlier ones.
    fn audio_to_image(&self) -> HashMap<&'a str, &'a str> {
        self.mapper
            .iter()
            .map(|entry| (entry.audio_file.as_str(), entry.pic_name.as_str()))
            .collect()
    }

    /// Every mapped audio file of each top image, in image order.
    fn image_only(&self, images: &[ImageMatch]) -> Vec<MapperEntry> {
        let mapper = self.mapper;
        self.top_images(images)
            .iter()
            .flat_map(move |image| {
                mapper
                    .iter()
                    .filter(move |entry| entry.pic_name == image.filename)
                    .map(move |entry| {
                        MapperEntry::new(&image.filename, &entry.audio_file)
                            .with_scores(None, Some(image.distance))
                    })
            })
            .collect()
    }

    fn audio_only(&self, audio: &[AudioMatch]) -> Vec<MapperEntry> {
        let lookup = self.audio_to_image();
        audio
            .iter()
            .filter_map(|m| {
                lookup.get(m.filename.as_str()).map(|&pic| {
                    MapperEntry::new(pic, &m.filename).with_scores(Some(m.similarity), None)
                })
            })
            .collect()
    }

    fn combined(&self, images: &[ImageMatch], audio: &[AudioMatch]) -> Vec<MapperEntry> {
        let lookup = self.audio_to_image();
        let mut top: HashMap<&str, f64> = HashMap::new();
        for image in self.top_images(images) {
            top.entry(image.filename.as_str()).or_insert(image.distance);
        }

        audio
            .iter()
            .filter_map(|m| {
                let pic = *lookup.get(m.filename.as_str())?;
                let distance = *top.get(pic)?;
                Some(
                    MapperEntry::new(pic, &m.filename)
                        .with_scores(Some(m.similarity), Some(distance)),
                )
            })
            .collect()
    }
}
