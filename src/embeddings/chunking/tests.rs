use super::*;

fn normalized(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `count` sentences of exactly `words` words each
fn sentences(count: usize, words: usize) -> String {
    (0..count)
        .map(|i| {
            let mut sentence = vec![format!("Topic{i}")];
            sentence.extend(std::iter::repeat_n("detail".to_string(), words - 2));
            sentence.push("closes.".to_string());
            sentence.join(" ")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn revenue_document() -> String {
    (0..12)
        .map(|i| {
            format!("Quarterly revenue growth in segment {i} exceeded the annual forecast.")
        })
        .collect::<Vec<_>>()
        .join("\n   ")
}

#[test]
fn word_counting() {
    assert_eq!(word_count("hello world"), 2);
    assert_eq!(word_count("  spaced \n\t out  "), 2);
    assert_eq!(word_count(""), 0);
}

#[test]
fn empty_text_yields_no_chunks() {
    let config = ChunkingConfig::new(300, 50, 20).expect("valid config");
    assert!(chunk_text("", &config).expect("should chunk").is_empty());
    assert!(
        chunk_text("   \n\t  ", &config)
            .expect("should chunk")
            .is_empty()
    );
}

#[test]
fn short_document_is_single_normalized_chunk() {
    let text = revenue_document();
    let config = ChunkingConfig::new(300, 50, 0).expect("valid config");

    let chunks = chunk_text(&text, &config).expect("should chunk");

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].word_count, 120);
    assert_eq!(chunks[0].text, normalized(&text));
    assert_eq!(chunks[0].overlap_words, 0);
}

#[test]
fn document_below_minimum_is_still_emitted() {
    let config = ChunkingConfig::new(300, 50, 20).expect("valid config");
    let chunks = chunk_text("Revenue grew. Costs fell.", &config).expect("should chunk");

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, "Revenue grew. Costs fell.");
}

#[test]
fn long_paragraphs_split_within_max() {
    let text = format!("{}\n\n{}", sentences(20, 10), sentences(20, 10));
    let config = ChunkingConfig::new(150, 50, 20).expect("valid config");

    let chunks = chunk_text(&text, &config).expect("should chunk");

    assert!(chunks.len() >= 2);
    for chunk in &chunks {
        assert!(
            chunk.word_count <= 150,
            "chunk {} has {} words",
            chunk.index,
            chunk.word_count
        );
        assert_eq!(chunk.word_count, word_count(&chunk.text));
    }
}

#[test]
fn chunk_indices_are_sequential() {
    let text = sentences(40, 10);
    let config = ChunkingConfig::new(150, 50, 20).expect("valid config");

    let chunks = chunk_text(&text, &config).expect("should chunk");

    for (expected, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.index, expected);
    }
}

#[test]
fn overlap_removal_reconstructs_text() {
    let text = sentences(40, 10);
    let config = ChunkingConfig::new(150, 50, 20).expect("valid config");

    let chunks = chunk_text(&text, &config).expect("should chunk");
    assert_eq!(chunks.len(), 3);

    let rebuilt = chunks
        .iter()
        .map(Chunk::fresh_text)
        .collect::<Vec<_>>()
        .join(" ");
    assert_eq!(rebuilt, normalized(&text));
}

#[test]
fn adjacent_chunks_share_overlap_words() {
    let text = sentences(40, 10);
    let config = ChunkingConfig::new(150, 50, 20).expect("valid config");

    let chunks = chunk_text(&text, &config).expect("should chunk");

    for pair in chunks.windows(2) {
        let previous: Vec<&str> = pair[0].text.split_whitespace().collect();
        let next: Vec<&str> = pair[1].text.split_whitespace().collect();
        let shared = pair[1].overlap_words;

        assert_eq!(shared, 20);
        assert_eq!(&previous[previous.len() - shared..], &next[..shared]);
    }
}

#[test]
fn zero_overlap_disables_carry_over() {
    let text = sentences(40, 10);
    let config = ChunkingConfig::new(150, 50, 0).expect("valid config");

    let chunks = chunk_text(&text, &config).expect("should chunk");

    assert!(chunks.len() > 1);
    assert!(chunks.iter().all(|c| c.overlap_words == 0));
    let total: usize = chunks.iter().map(|c| c.word_count).sum();
    assert_eq!(total, 400);
}

#[test]
fn oversized_sentence_is_never_split() {
    let long_sentence = format!(
        "Metrics {} done.",
        (1..29)
            .map(|i| format!("value{i}"))
            .collect::<Vec<_>>()
            .join(" ")
    );
    let text = format!(
        "Short lead in here. {long_sentence} Another short tail sentence follows here."
    );
    let config = ChunkingConfig::new(10, 2, 0).expect("valid config");

    let chunks = chunk_text(&text, &config).expect("should chunk");

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].word_count, 4);
    assert_eq!(chunks[1].word_count, 30);
    assert_eq!(chunks[1].text, long_sentence);
    assert_eq!(chunks[2].word_count, 6);
}

#[test]
fn single_unpunctuated_run_is_one_chunk() {
    let text = (0..40)
        .map(|i| format!("token{i}"))
        .collect::<Vec<_>>()
        .join(" ");
    let config = ChunkingConfig::new(10, 2, 3).expect("valid config");

    let chunks = chunk_text(&text, &config).expect("should chunk");

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].word_count, 40);
}

#[test]
fn oversized_sentence_gets_its_own_chunk_after_short_buffer() {
    let long_sentence = format!(
        "Metrics {} done.",
        (1..29)
            .map(|i| format!("value{i}"))
            .collect::<Vec<_>>()
            .join(" ")
    );
    let text = format!("Hello. {long_sentence} Another short tail sentence follows here.");

    let config = ChunkingConfig::new(10, 2, 0).expect("valid config");
    let chunks = chunk_text(&text, &config).expect("should chunk");

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].text, "Hello.");
    assert_eq!(chunks[1].text, long_sentence);
    assert_eq!(chunks[1].word_count, 30);
    assert_eq!(chunks[2].text, "Another short tail sentence follows here.");

    let config = ChunkingConfig::new(10, 2, 3).expect("valid config");
    let chunks = chunk_text(&text, &config).expect("should chunk");

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[1].text, long_sentence);
    assert_eq!(chunks[1].overlap_words, 0);
    assert_eq!(chunks[2].overlap_words, 3);
    assert_eq!(chunks[2].word_count, 9);
}

#[test]
fn short_buffer_closes_before_overflowing_sentence() {
    let text = "Tiny one here. \
        Operating margin expanded across every regional business unit reviewed. \
        Customer retention improved after the loyalty program was launched.";
    let config = ChunkingConfig::new(10, 8, 0).expect("valid config");

    let chunks = chunk_text(text, &config).expect("should chunk");

    let sizes: Vec<usize> = chunks.iter().map(|c| c.word_count).collect();
    assert_eq!(sizes, vec![3, 9, 9]);
    assert_eq!(chunks[0].text, "Tiny one here.");
    assert!(chunks[1].text.starts_with("Operating margin"));
    assert!(chunks[2].text.starts_with("Customer retention"));
}

#[test]
fn chunks_before_the_last_stay_within_max() {
    let lengths = [
        3, 12, 1, 25, 4, 7, 40, 2, 9, 15, 6, 11, 1, 33, 5, 8, 2, 18, 3, 10,
    ];
    let text = lengths
        .iter()
        .enumerate()
        .map(|(i, &words)| match words {
            1 => "Noted.".to_string(),
            _ => {
                let mut sentence = vec![format!("Lead{i}")];
                sentence.extend(std::iter::repeat_n("detail".to_string(), words - 2));
                sentence.push("closes.".to_string());
                sentence.join(" ")
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    for (max, min, overlap) in [(10, 2, 0), (10, 8, 3), (20, 5, 4), (50, 20, 10), (12, 12, 11)] {
        let config = ChunkingConfig::new(max, min, overlap).expect("valid config");
        let chunks = chunk_text(&text, &config).expect("should chunk");

        for chunk in &chunks[..chunks.len() - 1] {
            let single_sentence =
                chunk.overlap_words == 0 && split_sentences(&chunk.text).len() == 1;
            assert!(
                chunk.word_count <= max || single_sentence,
                "chunk {} has {} words with max {max}: {}",
                chunk.index,
                chunk.word_count,
                chunk.text
            );
        }

        let rebuilt = chunks
            .iter()
            .map(Chunk::fresh_text)
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(rebuilt, normalized(&text));
    }
}

#[test]
fn undersized_tail_folds_into_previous_chunk() {
    let text = sentences(13, 10);
    let config = ChunkingConfig::new(100, 50, 0).expect("valid config");

    let chunks = chunk_text(&text, &config).expect("should chunk");

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].word_count, 130);
    assert_eq!(chunks[0].text, normalized(&text));
}

#[test]
fn undersized_tail_drops_its_overlap_when_folded() {
    let text = sentences(12, 10);
    let config = ChunkingConfig::new(100, 50, 20).expect("valid config");

    let chunks = chunk_text(&text, &config).expect("should chunk");

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].word_count, 120);
    assert_eq!(chunks[0].text, normalized(&text));
}

#[test]
fn config_validation() {
    assert!(ChunkingConfig::new(0, 0, 0).is_err());
    assert!(ChunkingConfig::new(10, 20, 0).is_err());
    assert!(ChunkingConfig::new(10, 5, 10).is_err());
    assert!(ChunkingConfig::new(10, 10, 9).is_ok());

    let invalid = ChunkingConfig {
        max_chunk_size: 5,
        min_chunk_size: 6,
        overlap: 0,
    };
    assert!(chunk_text("Anything at all.", &invalid).is_err());
}

#[test]
fn sentence_splitting_normalizes_whitespace() {
    let sentences = split_sentences("First  one here.\n\nSecond\tone.  ");
    assert_eq!(
        sentences,
        vec![vec!["First", "one", "here."], vec!["Second", "one."]]
    );
}
