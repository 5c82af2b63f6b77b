use super::*;

fn chunk(file_path: &str, chunk_index: usize) -> ChunkMetadata {
    ChunkMetadata {
        file_path: file_path.to_string(),
        title: file_path.to_string(),
        chunk_index,
        text: format!("chunk {chunk_index} of {file_path}"),
    }
}

#[test]
fn insert_and_get() {
    let mut store = MetadataStore::new();
    assert!(store.is_empty());

    assert!(store.insert(0, chunk("q1.txt", 0)).is_none());
    store.insert(1, chunk("q1.txt", 1));

    assert_eq!(store.len(), 2);
    assert_eq!(store.get(1).map(|m| m.chunk_index), Some(1));
    assert!(store.get(2).is_none());
}

#[test]
fn contains_source_and_sources() {
    let store: MetadataStore = [
        (0, chunk("b.txt", 0)),
        (1, chunk("a.txt", 0)),
        (2, chunk("b.txt", 1)),
    ]
    .into_iter()
    .collect();

    assert!(store.contains_source("a.txt"));
    assert!(!store.contains_source("c.txt"));
    assert_eq!(store.sources().into_iter().collect::<Vec<_>>(), vec!["a.txt", "b.txt"]);
}

#[test]
fn ids_are_ordered() {
    let store: MetadataStore = [(5, chunk("x", 0)), (2, chunk("x", 1)), (9, chunk("x", 2))]
        .into_iter()
        .collect();

    assert_eq!(store.ids().collect::<Vec<_>>(), vec![2, 5, 9]);
}
