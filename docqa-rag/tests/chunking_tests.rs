//! Property tests for fixed-window chunking.

use docqa_rag::{Chunker, FixedSizeChunker, split};
use proptest::prelude::*;

/// Valid `(chunk_size, chunk_overlap)` pairs.
fn arb_window() -> impl Strategy<Value = (usize, usize)> {
    (1usize..40).prop_flat_map(|size| (Just(size), 0..size))
}

mod prop_chunking {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Dropping each later chunk's overlap and concatenating rebuilds the text.
        #[test]
        fn chunks_reconstruct_the_original_text(
            text in "\\PC{0,200}",
            (size, overlap) in arb_window(),
        ) {
            let chunks = split(&text, size, overlap).unwrap();

            let mut rebuilt = chunks.first().cloned().unwrap_or_default();
            for chunk in chunks.iter().skip(1) {
                rebuilt.extend(chunk.chars().skip(overlap));
            }
            prop_assert_eq!(rebuilt, text);
        }

        /// Every chunk fits the window and full windows share `overlap` characters with the next.
        #[test]
        fn windows_are_bounded_and_overlap_exactly(
            text in "[a-zé ]{1,120}",
            (size, overlap) in arb_window(),
        ) {
            let chunks = split(&text, size, overlap).unwrap();
            prop_assert!(!chunks.is_empty());

            for chunk in &chunks {
                prop_assert!(chunk.chars().count() <= size);
            }
            let step = size - overlap;
            for pair in chunks.windows(2) {
                // Each window starts `step` characters after the previous one.
                let shared: String = pair[0].chars().skip(step).collect();
                prop_assert!(pair[1].starts_with(&shared));
                if pair[0].chars().count() == size {
                    prop_assert_eq!(shared.chars().count(), overlap);
                }
            }
        }

        /// The same input and parameters always give the same chunks.
        #[test]
        fn splitting_is_deterministic(
            text in "\\PC{0,120}",
            (size, overlap) in arb_window(),
        ) {
            let chunker = FixedSizeChunker::new(size, overlap).unwrap();
            prop_assert_eq!(chunker.split(&text), chunker.split(&text));
        }
    }
}
