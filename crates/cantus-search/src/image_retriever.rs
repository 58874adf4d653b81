//! Nearest-neighbour image search in PCA space.

use cantus_core::store::ImageFeatureStore;
use serde::Serialize;

use crate::error::PcaResult;
use crate::pca::{PcaEngine, PcaModel};
use crate::similarity::euclidean_distance;

/// One ranked dataset image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageMatch {
    pub index: usize,
    pub filename: String,
    pub distance: f64,
}

/// A PCA basis fitted to a session's images plus their file names.
#[derive(Debug, Clone)]
pub struct ImageRetriever {
    model: PcaModel,
    embedded: Vec<Vec<f64>>,
    filenames: Vec<String>,
}

impl ImageRetriever {
    /// Fit `n_components` components, clamped to what the store can
    /// support.
    pub fn build(store: &ImageFeatureStore, n_components: usize, engine: &PcaEngine) -> PcaResult<Self> {
        let dataset = &store.dataset;
        let k = n_components.min(dataset.n_rows()).min(dataset.n_cols());
        if k < n_components {
            log::debug!(
                "Clamping PCA components from {} to {} for {} images of {} pixels",
                n_components,
                k,
                dataset.n_rows(),
                dataset.n_cols()
            );
        }
        let model = engine.fit(dataset, k)?;
        let embedded = (0..model.n_samples()).map(|i| model.embedded_row(i)).collect();
        Ok(Self {
            model,
            embedded,
            filenames: store.filenames.clone(),
        })
    }

    pub const fn model(&self) -> &PcaModel {
        &self.model
    }

    /// Every dataset image ranked by distance to `pixels`, closest first.
    pub fn query(&self, pixels: &[f64]) -> PcaResult<Vec<ImageMatch>> {
        let embedded = self.model.project(pixels)?;
        let ranked = rank_by_distance(&embedded, &self.embedded);
        Ok(ranked
            .into_iter()
            .map(|(index, distance)| ImageMatch {
                index,
                filename: self.filenames[index].clone(),
                distance,
            })
            .collect())
    }
}

/// `(index, distance)` for every candidate, ascending by distance with ties
/// kept in candidate order.
pub fn rank_by_distance(query: &[f64], candidates: &[Vec<f64>]) -> Vec<(usize, f64)> {
    let mut ranked: Vec<(usize, f64)> = candidates
        .iter()
        .enumerate()
        .map(|(i, candidate)| (i, euclidean_distance(query, candidate)))
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked
}
