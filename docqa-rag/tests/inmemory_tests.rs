//! Tests for in-memory vector index search, replacement and snapshots.

use docqa_rag::{
    Document, InMemoryVectorIndex, MmrParams, RagError, SearchScope, Segment, VectorIndex,
};
use proptest::prelude::*;

fn segment(document_id: &str, index: usize, vector: Vec<f32>) -> Segment {
    Segment {
        id: format!("{document_id}_{index}"),
        document_id: document_id.to_string(),
        page_number: Some(1),
        text: format!("segment {index} of {document_id}"),
        vector,
    }
}

fn segments(document_id: &str, vectors: &[Vec<f32>]) -> Vec<Segment> {
    vectors.iter().enumerate().map(|(i, v)| segment(document_id, i, v.clone())).collect()
}

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map("non-zero embedding", |mut v| {
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm < 1e-3 {
            return None;
        }
        for val in &mut v {
            *val /= norm;
        }
        Some(v)
    })
}

mod prop_search {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Plain search returns at most `top_k` results in descending score order.
        #[test]
        fn results_ordered_descending_and_bounded_by_top_k(
            vectors in proptest::collection::vec(arb_normalized_embedding(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let results = rt.block_on(async {
                let index = InMemoryVectorIndex::new(DIM, MmrParams::default()).unwrap();
                index.upsert("doc", segments("doc", &vectors)).await.unwrap();
                index.search(&SearchScope::All, &query, top_k, false).await.unwrap()
            });

            prop_assert!(results.len() <= top_k);
            prop_assert!(results.len() <= vectors.len());
            let scores: Vec<f32> = results.iter().map(|r| r.score).collect();
            for window in scores.windows(2) {
                prop_assert!(
                    window[0] >= window[1],
                    "results not in descending order: {} < {}",
                    window[0],
                    window[1],
                );
            }
        }

        /// Searching with a stored segment's own vector ranks that segment first.
        #[test]
        fn self_similarity_ranks_first(
            vectors in proptest::collection::vec(arb_normalized_embedding(DIM), 1..12),
            pick in any::<prop::sample::Index>(),
            diversify in any::<bool>(),
        ) {
            let target = pick.index(vectors.len());
            let rt = tokio::runtime::Runtime::new().unwrap();
            let results = rt.block_on(async {
                let index = InMemoryVectorIndex::new(DIM, MmrParams::default()).unwrap();
                index.upsert("doc", segments("doc", &vectors)).await.unwrap();
                index.search(&SearchScope::document("doc"), &vectors[target], 3, diversify).await.unwrap()
            });

            let top = results.top().map(|r| r.segment.id.clone());
            prop_assert_eq!(top, Some(format!("doc_{target}")));
        }
    }
}

#[tokio::test]
async fn empty_index_search_is_empty() {
    let index = InMemoryVectorIndex::new(2, MmrParams::default()).unwrap();
    let results = index.search(&SearchScope::All, &[1.0, 0.0], 5, true).await.unwrap();
    assert!(results.is_empty());
    assert_eq!(index.segment_count(&SearchScope::All).await.unwrap(), 0);
}

#[tokio::test]
async fn diversify_prefers_distinct_candidate_over_near_duplicate() {
    let index = InMemoryVectorIndex::new(2, MmrParams { lambda: 0.5, fetch_k: 20 }).unwrap();
    let vectors = vec![vec![0.985, 0.174], vec![0.978, 0.208], vec![0.643, -0.766]];
    index.upsert("doc", segments("doc", &vectors)).await.unwrap();

    let plain = index.search(&SearchScope::All, &[1.0, 0.0], 2, false).await.unwrap();
    let diverse = index.search(&SearchScope::All, &[1.0, 0.0], 2, true).await.unwrap();

    assert_eq!(plain.segment_ids(), vec!["doc_0", "doc_1"]);
    assert_eq!(diverse.segment_ids(), vec!["doc_0", "doc_2"]);
    // Scores stay the raw cosine similarity.
    let diverse_score = diverse.iter().nth(1).map(|r| r.score).unwrap();
    assert!((diverse_score - 0.643).abs() < 1e-3);
}

#[tokio::test]
async fn reupsert_replaces_previous_segments() {
    let index = InMemoryVectorIndex::new(2, MmrParams::default()).unwrap();
    index.upsert("doc", segments("doc", &[vec![1.0, 0.0], vec![0.7, 0.7]])).await.unwrap();

    let mut replacement = segment("doc", 0, vec![0.0, 1.0]);
    replacement.id = "doc_new".to_string();
    index.upsert("doc", vec![replacement]).await.unwrap();

    let scope = SearchScope::document("doc");
    assert_eq!(index.segment_count(&scope).await.unwrap(), 1);
    let results = index.search(&scope, &[1.0, 0.0], 5, false).await.unwrap();
    assert_eq!(results.segment_ids(), vec!["doc_new"]);
}

#[tokio::test]
async fn mismatched_dimension_leaves_index_untouched() {
    let index = InMemoryVectorIndex::new(2, MmrParams::default()).unwrap();
    index.upsert("doc", segments("doc", &[vec![1.0, 0.0]])).await.unwrap();

    let bad = vec![segment("doc", 0, vec![0.0, 1.0]), segment("doc", 1, vec![1.0, 0.0, 0.0])];
    let err = index.upsert("doc", bad).await.unwrap_err();

    assert!(matches!(
        err,
        RagError::DimensionMismatch { ref segment_id, expected: 2, actual: 3 } if segment_id == "doc_1"
    ));
    let results = index.search(&SearchScope::All, &[1.0, 0.0], 5, false).await.unwrap();
    assert_eq!(results.segment_ids(), vec!["doc_0"]);
}

#[tokio::test]
async fn query_of_wrong_dimension_is_rejected() {
    let index = InMemoryVectorIndex::new(2, MmrParams::default()).unwrap();
    let err = index.search(&SearchScope::All, &[1.0], 1, false).await.unwrap_err();
    assert!(matches!(err, RagError::DimensionMismatch { expected: 2, actual: 1, .. }));
}

#[tokio::test]
async fn scope_limits_results_to_listed_documents() {
    let index = InMemoryVectorIndex::new(2, MmrParams::default()).unwrap();
    index.upsert("a", segments("a", &[vec![1.0, 0.0]])).await.unwrap();
    index.upsert("b", segments("b", &[vec![0.9, 0.1]])).await.unwrap();

    let only_b = index.search(&SearchScope::document("b"), &[1.0, 0.0], 5, true).await.unwrap();
    assert_eq!(only_b.segment_ids(), vec!["b_0"]);

    assert!(index.remove("a").await.unwrap());
    assert!(!index.remove("a").await.unwrap());
    assert_eq!(index.document_ids().await, vec!["b"]);
}

#[tokio::test]
async fn equal_scores_keep_insertion_order() {
    let index = InMemoryVectorIndex::new(2, MmrParams::default()).unwrap();
    index.upsert("doc", segments("doc", &[vec![0.0, 1.0], vec![0.0, 1.0], vec![0.0, 1.0]])).await.unwrap();

    let results = index.search(&SearchScope::All, &[0.0, 1.0], 3, false).await.unwrap();
    assert_eq!(results.segment_ids(), vec!["doc_0", "doc_1", "doc_2"]);
}

#[tokio::test]
async fn snapshot_round_trip_preserves_search() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");

    let index = InMemoryVectorIndex::new(2, MmrParams::default()).unwrap();
    let vectors = vec![vec![0.985, 0.174], vec![0.978, 0.208], vec![0.643, -0.766]];
    index.upsert("doc", segments("doc", &vectors)).await.unwrap();
    index.save_snapshot(&path, &[Document::new("doc", "report.pdf")]).await.unwrap();

    let (restored, documents) = InMemoryVectorIndex::load_snapshot(&path, MmrParams::default()).await.unwrap();

    assert_eq!(restored.dimensions(), 2);
    assert_eq!(documents, vec![Document::new("doc", "report.pdf")]);
    let before = index.search(&SearchScope::All, &[1.0, 0.0], 2, true).await.unwrap();
    let after = restored.search(&SearchScope::All, &[1.0, 0.0], 2, true).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn unreadable_snapshot_is_index_unavailable() {
    let dir = tempfile::tempdir().unwrap();

    let missing = InMemoryVectorIndex::load_snapshot(dir.path().join("missing.json"), MmrParams::default())
        .await
        .unwrap_err();
    assert!(matches!(missing, RagError::IndexUnavailable { .. }));
    assert!(missing.is_recoverable());

    let corrupt_path = dir.path().join("corrupt.json");
    std::fs::write(&corrupt_path, "{ not json").unwrap();
    let corrupt = InMemoryVectorIndex::load_snapshot(&corrupt_path, MmrParams::default()).await.unwrap_err();
    assert!(matches!(corrupt, RagError::IndexUnavailable { .. }));
}

#[tokio::test]
async fn undescribed_snapshot_documents_are_named_by_id() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");

    let index = InMemoryVectorIndex::new(2, MmrParams::default()).unwrap();
    index.upsert("b", segments("b", &[vec![1.0, 0.0]])).await.unwrap();
    index.upsert("a", segments("a", &[vec![0.0, 1.0]])).await.unwrap();
    let described = [Document::new("b", "b.pdf"), Document::new("gone", "gone.pdf")];
    index.save_snapshot(&path, &described).await.unwrap();

    let (_, documents) = InMemoryVectorIndex::load_snapshot(&path, MmrParams::default()).await.unwrap();

    assert_eq!(documents, vec![Document::new("b", "b.pdf"), Document::new("a", "a")]);
}

/// Save a two-segment snapshot, apply `edit` to its JSON and try to load it.
async fn load_edited_snapshot(edit: impl FnOnce(&mut serde_json::Value)) -> docqa_rag::Result<()> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");
    let index = InMemoryVectorIndex::new(2, MmrParams::default()).unwrap();
    index.upsert("doc", segments("doc", &[vec![1.0, 0.0], vec![0.0, 1.0]])).await.unwrap();
    index.save_snapshot(&path, &[]).await.unwrap();

    let mut json: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    edit(&mut json);
    std::fs::write(&path, serde_json::to_vec(&json).unwrap()).unwrap();

    InMemoryVectorIndex::load_snapshot(&path, MmrParams::default()).await.map(|_| ())
}

#[tokio::test]
async fn unedited_snapshot_passes_consistency_checks() {
    assert!(load_edited_snapshot(|_| {}).await.is_ok());
}

#[tokio::test]
async fn snapshot_with_stale_next_sequence_is_rejected() {
    let err = load_edited_snapshot(|json| json["state"]["next_sequence"] = 1.into()).await.unwrap_err();
    assert!(matches!(err, RagError::IndexUnavailable { .. }));
}

#[tokio::test]
async fn snapshot_with_repeated_sequence_is_rejected() {
    let err = load_edited_snapshot(|json| json["state"]["documents"]["doc"][1]["sequence"] = 0.into())
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::IndexUnavailable { .. }));
}

#[tokio::test]
async fn snapshot_segment_filed_under_wrong_document_is_rejected() {
    let err = load_edited_snapshot(|json| {
        json["state"]["documents"]["doc"][0]["segment"]["document_id"] = "other".into()
    })
    .await
    .unwrap_err();
    assert!(matches!(err, RagError::IndexUnavailable { .. }));
}
