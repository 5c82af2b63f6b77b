use super::*;

fn index_with(vectors: &[Vec<f32>]) -> FlatIndex {
    let mut index = FlatIndex::new(vectors[0].len()).expect("valid dimension");
    index.add(vectors).expect("vectors should be accepted");
    index
}

#[test]
fn new_index_is_empty() {
    let index = FlatIndex::new(4).expect("valid dimension");
    assert!(index.is_empty());
    assert_eq!(index.len(), 0);
    assert_eq!(index.dimension(), 4);
    assert!(FlatIndex::new(0).is_err());
}

#[test]
fn add_assigns_dense_ids() {
    let mut index = FlatIndex::new(2).expect("valid dimension");

    let first = index
        .add(&[vec![0.0, 0.0], vec![1.0, 1.0]])
        .expect("should add");
    let second = index.add(&[vec![2.0, 2.0]]).expect("should add");

    assert_eq!(first, 0..2);
    assert_eq!(second, 2..3);
    assert_eq!(index.len(), 3);
    assert_eq!(index.vector(2), Some(&[2.0, 2.0][..]));
    assert_eq!(index.vector(3), None);
}

#[test]
fn add_rejects_bad_vectors_without_mutation() {
    let mut index = index_with(&[vec![0.0, 0.0]]);

    assert!(index.add(&[vec![1.0, 1.0], vec![1.0]]).is_err());
    assert!(index.add(&[vec![f32::NAN, 0.0]]).is_err());
    assert!(index.add(&[vec![f32::INFINITY, 0.0]]).is_err());
    assert_eq!(index.len(), 1);
}

#[test]
fn search_returns_nearest_first() {
    let index = index_with(&[
        vec![10.0, 10.0],
        vec![1.0, 0.0],
        vec![0.0, 3.0],
        vec![5.0, 5.0],
    ]);

    let neighbors = index.search(&[0.0, 0.0], 3).expect("should search");

    let ids: Vec<u64> = neighbors.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(neighbors[0].distance, 1.0);
    assert_eq!(neighbors[1].distance, 9.0);
    assert_eq!(neighbors[2].distance, 50.0);
}

#[test]
fn search_returns_at_most_len_results() {
    let index = index_with(&[vec![1.0], vec![2.0]]);

    assert_eq!(index.search(&[0.0], 10).expect("should search").len(), 2);
    assert!(index.search(&[0.0], 0).expect("should search").is_empty());
}

#[test]
fn empty_index_search_is_empty() {
    let index = FlatIndex::new(3).expect("valid dimension");
    let neighbors = index.search(&[0.0, 0.0, 0.0], 5).expect("should search");
    assert!(neighbors.is_empty());
}

#[test]
fn ties_break_by_smaller_id() {
    let index = index_with(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, 0.0], vec![9.0, 9.0]]);

    let neighbors = index.search(&[0.0, 0.0], 2).expect("should search");

    let ids: Vec<u64> = neighbors.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![0, 1]);
}

#[test]
fn search_rejects_wrong_dimension() {
    let index = index_with(&[vec![1.0, 2.0]]);
    assert!(index.search(&[1.0], 1).is_err());
    assert!(index.search(&[f32::NAN, 1.0], 1).is_err());
}

#[test]
fn distances_are_non_decreasing() {
    let vectors: Vec<Vec<f32>> = (0..50)
        .map(|i| {
            let x = ((i * 37) % 50) as f32;
            vec![x, (x * 0.5).sin()]
        })
        .collect();
    let index = index_with(&vectors);

    let neighbors = index.search(&[25.0, 0.0], 20).expect("should search");

    assert_eq!(neighbors.len(), 20);
    for pair in neighbors.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }
}

#[test]
fn relevance_is_inverse_distance() {
    assert_eq!(relevance_score(0.0), 1.0);
    assert_eq!(relevance_score(1.0), 0.5);
    let neighbor = Neighbor {
        id: 0,
        distance: 3.0,
    };
    assert_eq!(neighbor.relevance(), 0.25);
}

#[test]
fn relevance_stays_positive_for_huge_distances() {
    for distance in [f32::MAX, f32::INFINITY] {
        let score = relevance_score(distance);
        assert!(score > 0.0 && score <= 1.0, "{distance} scored {score}");
    }

    let index = index_with(&[vec![1.0e19, 0.0]]);
    let neighbors = index.search(&[-1.0e19, 0.0], 1).expect("should search");
    assert!(neighbors[0].distance.is_infinite());
    assert!(neighbors[0].relevance() > 0.0);
}

#[test]
fn add_rejects_vectors_with_overflowing_norm() {
    let mut index = index_with(&[vec![0.0, 0.0]]);

    assert!(index.add(&[vec![f32::MAX, f32::MAX]]).is_err());
    assert!(index.search(&[f32::MAX, 0.0], 1).is_err());
    assert_eq!(index.len(), 1);
}
