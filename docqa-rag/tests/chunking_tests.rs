//! Property tests for fixed-size character chunking.

use docqa_rag::chunking::chunk_text;
use proptest::prelude::*;

/// Chunk size and an overlap strictly smaller than it.
fn arb_window() -> impl Strategy<Value = (usize, usize)> {
    (1usize..40).prop_flat_map(|size| (Just(size), 0..size))
}

/// Text mixing ASCII, accented and CJK characters.
fn arb_text() -> impl Strategy<Value = String> {
    "[a-zé漢 .\n]{0,300}"
}

mod prop_chunk_coverage {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Dropping each chunk's leading overlap and concatenating gives back the text.
        #[test]
        fn chunks_reassemble_to_the_original_text(text in arb_text(), (size, overlap) in arb_window()) {
            let chunks = chunk_text(&text, size, overlap).unwrap();

            let mut rebuilt = String::new();
            for (i, chunk) in chunks.iter().enumerate() {
                let skip = if i == 0 { 0 } else { overlap };
                rebuilt.extend(chunk.chars().skip(skip));
            }
            prop_assert_eq!(rebuilt, text);
        }

        #[test]
        fn no_chunk_exceeds_the_window(text in arb_text(), (size, overlap) in arb_window()) {
            for chunk in chunk_text(&text, size, overlap).unwrap() {
                let len = chunk.chars().count();
                prop_assert!(len >= 1 && len <= size);
            }
        }
    }
}

mod prop_chunk_overlap {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Consecutive chunks share exactly `overlap` characters.
        #[test]
        fn consecutive_chunks_share_exactly_overlap(text in arb_text(), (size, overlap) in arb_window()) {
            let chunks = chunk_text(&text, size, overlap).unwrap();
            for pair in chunks.windows(2) {
                let prev: Vec<char> = pair[0].chars().collect();
                let next: Vec<char> = pair[1].chars().collect();
                prop_assert_eq!(prev.len(), size);
                prop_assert_eq!(&prev[size - overlap..], &next[..overlap]);
            }
        }

        /// Text no longer than the window is a single chunk.
        #[test]
        fn short_text_is_one_chunk(text in "[a-z]{1,20}", extra in 0usize..10) {
            let size = text.chars().count() + extra;
            prop_assert_eq!(chunk_text(&text, size, 0).unwrap(), vec![text]);
        }
    }
}
