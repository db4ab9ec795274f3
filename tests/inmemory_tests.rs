//! Behavior and property tests for the in-memory vector index.

use std::collections::HashMap;

use proptest::prelude::*;
use ragserve::document::{IndexEntry, Metric, TEXT_METADATA_KEY};
use ragserve::error::RagError;
use ragserve::index::VectorIndex;
use ragserve::inmemory::InMemoryVectorIndex;

const DIM: usize = 8;

fn entry(id: &str, values: Vec<f32>, text: &str) -> IndexEntry {
    IndexEntry {
        id: id.to_string(),
        values,
        metadata: HashMap::from([(TEXT_METADATA_KEY.to_string(), text.to_string())]),
    }
}

fn unit(axis: usize) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    v[axis] = 1.0;
    v
}

#[tokio::test]
async fn upsert_then_query_returns_self_as_top_match() {
    let index = InMemoryVectorIndex::new();
    index.create_if_absent("docs", DIM, Metric::Cosine).await.unwrap();

    let v = vec![0.3, -0.2, 0.9, 0.1, 0.0, 0.5, -0.7, 0.2];
    index.upsert("docs", &[entry("report.pdf", v.clone(), "report text")]).await.unwrap();

    let results = index.query("docs", &v, 1, true).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "report.pdf");
    // Trivial self-similarity: cosine score of a vector with itself.
    assert!(results[0].score > 0.999);
}

#[tokio::test]
async fn empty_index_yields_empty_results_not_an_error() {
    let index = InMemoryVectorIndex::new();
    index.create_if_absent("docs", DIM, Metric::Cosine).await.unwrap();

    let results = index.query("docs", &unit(0), 5, true).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn create_if_absent_is_idempotent() {
    let index = InMemoryVectorIndex::new();
    index.create_if_absent("docs", DIM, Metric::Cosine).await.unwrap();
    index.upsert("docs", &[entry("a", unit(0), "a")]).await.unwrap();

    // A second creation must not clear existing entries.
    index.create_if_absent("docs", DIM, Metric::Cosine).await.unwrap();
    let results = index.query("docs", &unit(0), 1, false).await.unwrap();
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn upsert_with_wrong_dimension_is_rejected() {
    let index = InMemoryVectorIndex::new();
    index.create_if_absent("docs", DIM, Metric::Cosine).await.unwrap();

    let result = index.upsert("docs", &[entry("short", vec![1.0, 2.0], "short")]).await;
    assert!(matches!(
        result,
        Err(RagError::DimensionMismatch { expected: DIM, actual: 2 })
    ));
}

#[tokio::test]
async fn query_with_wrong_dimension_is_rejected() {
    let index = InMemoryVectorIndex::new();
    index.create_if_absent("docs", DIM, Metric::Cosine).await.unwrap();

    let result = index.query("docs", &[1.0, 2.0, 3.0], 1, false).await;
    assert!(matches!(
        result,
        Err(RagError::DimensionMismatch { expected: DIM, actual: 3 })
    ));
}

#[tokio::test]
async fn reupserting_an_id_overwrites_the_prior_entry() {
    let index = InMemoryVectorIndex::new();
    index.create_if_absent("docs", DIM, Metric::Cosine).await.unwrap();

    index.upsert("docs", &[entry("report.pdf", unit(0), "old text")]).await.unwrap();
    index.upsert("docs", &[entry("report.pdf", unit(0), "new text")]).await.unwrap();

    let results = index.query("docs", &unit(0), 10, true).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].metadata.as_ref().unwrap()[TEXT_METADATA_KEY], "new text");
}

#[tokio::test]
async fn metadata_is_stripped_when_not_requested() {
    let index = InMemoryVectorIndex::new();
    index.create_if_absent("docs", DIM, Metric::Cosine).await.unwrap();
    index.upsert("docs", &[entry("a", unit(0), "a text")]).await.unwrap();

    let results = index.query("docs", &unit(0), 1, false).await.unwrap();
    assert!(results[0].metadata.is_none());
}

#[tokio::test]
async fn querying_an_unknown_index_is_a_backend_error() {
    let index = InMemoryVectorIndex::new();
    let result = index.query("missing", &unit(0), 1, false).await;
    assert!(matches!(result, Err(RagError::IndexBackend { .. })));
}

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map("non-zero embedding", |mut v| {
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm < 1e-8 {
            return None;
        }
        for val in &mut v {
            *val /= norm;
        }
        Some(v)
    })
}

/// Generate an index entry with a normalized embedding.
fn arb_entry(dim: usize) -> impl Strategy<Value = IndexEntry> {
    ("[a-z]{3,8}", "[a-z ]{5,30}", arb_normalized_embedding(dim)).prop_map(|(id, text, values)| {
        IndexEntry {
            id,
            values,
            metadata: HashMap::from([(TEXT_METADATA_KEY.to_string(), text)]),
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// For any set of stored entries, search returns results ordered by
    /// descending cosine score, bounded by top_k and by the number of
    /// distinct ids.
    #[test]
    fn results_ordered_descending_and_bounded_by_top_k(
        entries in proptest::collection::vec(arb_entry(DIM), 1..20),
        query in arb_normalized_embedding(DIM),
        top_k in 1usize..25,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (results, unique_count) = rt.block_on(async {
            let index = InMemoryVectorIndex::new();
            index.create_if_absent("docs", DIM, Metric::Cosine).await.unwrap();

            // Deduplicate by id: upserting the same id twice overwrites.
            let mut deduped: HashMap<String, IndexEntry> = HashMap::new();
            for entry in &entries {
                deduped.entry(entry.id.clone()).or_insert_with(|| entry.clone());
            }
            let unique: Vec<IndexEntry> = deduped.into_values().collect();
            let count = unique.len();

            index.upsert("docs", &unique).await.unwrap();
            (index.query("docs", &query, top_k, true).await.unwrap(), count)
        });

        prop_assert!(results.len() <= top_k);
        prop_assert!(results.len() <= unique_count);

        for window in results.windows(2) {
            prop_assert!(
                window[0].score >= window[1].score,
                "results not in descending order: {} < {}",
                window[0].score,
                window[1].score,
            );
        }
    }
}
