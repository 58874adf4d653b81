//! Melody ranking by weighted cosine similarity of histogram triples.

use cantus_core::model::{Fingerprint, HistogramTriple};
use cantus_core::store::AudioFeatureStore;
use cantus_core::{ItemFailure, WorkerPool};
use serde::Serialize;

use crate::error::{Result, SearchError};
use crate::similarity::cosine_similarity;

pub const RTB_WEIGHT: f64 = 0.45;
pub const FTB_WEIGHT: f64 = 0.45;
pub const ATB_WEIGHT: f64 = 0.10;

/// One ranked dataset melody.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioMatch {
    pub filename: String,
    pub similarity: f64,
}

/// Ranked keys, best first, plus keys that could not be scored.
#[derive(Debug, Clone, Default)]
pub struct AudioRanking {
    pub matches: Vec<AudioMatch>,
    pub failures: Vec<ItemFailure>,
}

/// Weighted similarity of one query window to one dataset window.
pub fn window_similarity(query: &HistogramTriple, candidate: &HistogramTriple) -> f64 {
    RTB_WEIGHT * cosine_similarity(&query.rtb, &candidate.rtb)
        + FTB_WEIGHT * cosine_similarity(&query.ftb, &candidate.ftb)
        + ATB_WEIGHT * cosine_similarity(&query.atb, &candidate.atb)
}

/// Best score of `query` against any window of `candidate`: for each
/// candidate window the similarities to all query windows are summed, and
/// the maximum sum wins. `None` when the candidate has no windows.
pub fn best_score(query: &Fingerprint, candidate: &Fingerprint) -> Option<f64> {
    candidate
        .iter()
        .map(|window| {
            query
                .iter()
                .map(|q| window_similarity(q, window))
                .sum::<f64>()
        })
        .max_by(f64::total_cmp)
}

/// Ranks a dataset of fingerprints against a query on a shared pool.
#[derive(Debug)]
pub struct AudioRetriever<'a> {
    pool: &'a WorkerPool,
}

impl<'a> AudioRetriever<'a> {
    pub const fn new(pool: &'a WorkerPool) -> Self {
        Self { pool }
    }

    /// Score every key independently and sort by descending similarity.
    ///
    /// Keys whose fingerprint is empty are reported as failures; equal
    /// scores keep the store's key order.
    pub fn rank(&self, query: &Fingerprint, dataset: &AudioFeatureStore) -> Result<AudioRanking> {
        if query.is_empty() {
            return Err(SearchError::EmptyFingerprint("query".to_string()));
        }

        let entries: Vec<(&String, &Fingerprint)> = dataset.iter().collect();
        log::info!(
            "Ranking {} melodies against {} query windows",
            entries.len(),
            query.len()
        );

        let batch = self.pool.map_isolated(
            &entries,
            |(key, _)| (*key).clone(),
            |(key, fingerprint)| {
                best_score(query, fingerprint)
                    .map(|similarity| AudioMatch {
                        filename: (*key).clone(),
                        similarity,
                    })
                    .ok_or_else(|| SearchError::EmptyFingerprint((*key).clone()))
            },
        );

        let mut matches = batch.succeeded;
        matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        Ok(AudioRanking {
            matches,
            failures: batch.failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cantus_core::model::histogram::{ATB_BINS, INTERVAL_BINS};

    fn triple(pitch_bin: usize, interval_bin: usize) -> HistogramTriple {
        let mut atb = [0u32; ATB_BINS];
        let mut rtb = [0u32; INTERVAL_BINS];
        let mut ftb = [0u32; INTERVAL_BINS];
        atb[pitch_bin] = 1;
        rtb[interval_bin] = 1;
        ftb[interval_bin] = 1;
        HistogramTriple::from_counts(&atb, &rtb, &ftb).unwrap()
    }

    #[test]
    fn test_identical_windows_score_one() {
        let t = triple(60, 2);
        assert!((window_similarity(&t, &t) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_weights() {
        // Same intervals, different pitch
        let sim = window_similarity(&triple(60, 4), &triple(40, 4));
        assert!((sim - 0.9).abs() < 1e-12);
        // Same pitch, different intervals
        let sim = window_similarity(&triple(60, 4), &triple(60, 6));
        assert!((sim - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_best_score_sums_query_windows_and_maxes_candidates() {
        let query = Fingerprint::new(vec![triple(60, 2), triple(60, 2)]);
        let candidate = Fingerprint::new(vec![triple(10, 10), triple(60, 2)]);
        let score = best_score(&query, &candidate).unwrap();
        assert!((score - 2.0).abs() < 1e-12);

        assert!(best_score(&query, &Fingerprint::default()).is_none());
    }

    #[test]
    fn test_rank_orders_descending_and_isolates_failures() {
        let pool = WorkerPool::new(Some(2)).unwrap();
        let query = Fingerprint::new(vec![triple(60, 2)]);

        let mut dataset = AudioFeatureStore::new();
        dataset.insert("far.mid".into(), Fingerprint::new(vec![triple(20, 20)]));
        dataset.insert("exact.mid".into(), Fingerprint::new(vec![triple(60, 2)]));
        dataset.insert("close.mid".into(), Fingerprint::new(vec![triple(61, 2)]));
        dataset.insert("empty.mid".into(), Fingerprint::default());

        let ranking = AudioRetriever::new(&pool).rank(&query, &dataset).unwrap();
        let order: Vec<&str> = ranking.matches.iter().map(|m| m.filename.as_str()).collect();
        assert_eq!(order, vec!["exact.mid", "close.mid", "far.mid"]);
        assert_eq!(ranking.failures.len(), 1);
        assert_eq!(ranking.failures[0].item, "empty.mid");
    }

    #[test]
    fn test_equal_scores_keep_key_order() {
        let pool = WorkerPool::new(Some(3)).unwrap();
        let query = Fingerprint::new(vec![triple(60, 2)]);
        let mut dataset = AudioFeatureStore::new();
        for key in ["b.mid", "a.mid", "c.mid"] {
            dataset.insert(key.into(), Fingerprint::new(vec![triple(60, 2)]));
        }
        let ranking = AudioRetriever::new(&pool).rank(&query, &dataset).unwrap();
        let order: Vec<&str> = ranking.matches.iter().map(|m| m.filename.as_str()).collect();
        assert_eq!(order, vec!["a.mid", "b.mid", "c.mid"]);
    }

    #[test]
    fn test_empty_query_is_rejected() {
        let pool = WorkerPool::new(Some(1)).unwrap();
        let result = AudioRetriever::new(&pool).rank(&Fingerprint::default(), &AudioFeatureStore::new());
        assert!(matches!(result, Err(SearchError::EmptyFingerprint(_))));
    }
}
