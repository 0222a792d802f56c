use docsum::processing::{LengthPolicy, chunk_by_characters, chunk_by_words, count_words};
use proptest::prelude::*;

proptest! {
    #[test]
    fn word_chunks_preserve_the_word_sequence(
        text in "[a-z]{1,8}([ \t\n]{1,3}[a-z]{1,8}){0,200}",
        max_words in 1usize..50,
    ) {
        let chunks = chunk_by_words(&text, max_words);
        let (last, rest) = chunks.split_last().expect("non-empty input yields chunks");
        for chunk in rest {
            prop_assert_eq!(count_words(chunk), max_words);
        }
        prop_assert!(count_words(last) <= max_words);

        let rejoined: Vec<&str> = chunks.iter().flat_map(|chunk| chunk.split_whitespace()).collect();
        let original: Vec<&str> = text.split_whitespace().collect();
        prop_assert_eq!(rejoined, original);
    }

    #[test]
    fn character_windows_reconstruct_the_text(
        text in "\\PC{1,400}",
        window in 1usize..64,
    ) {
        let chunks = chunk_by_characters(&text, window);
        let (last, rest) = chunks.split_last().expect("non-empty input yields chunks");
        for chunk in rest {
            prop_assert_eq!(chunk.chars().count(), window);
        }
        prop_assert!(!last.is_empty());
        prop_assert!(last.chars().count() <= window);
        prop_assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn length_bounds_stay_ordered_and_capped(
        words in 4usize..20_000,
        proportion in 0.25f64..=1.0,
        max_cap in 1usize..3000,
        min_cap in 0usize..100,
    ) {
        let policy = LengthPolicy { proportion, max_cap, min_cap };
        let bounds = policy.bounds_for_word_count(words);
        prop_assert!(bounds.min_length < bounds.max_length);
        prop_assert!(bounds.max_length <= max_cap);
    }
}
