use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use traverse_graph::{CooccurrenceAccumulator, CooccurrenceConfig, CooccurrenceGraph, Link, Observation};

const VOCAB: &[&str] = &[
    "rock", "pop", "jazz", "techno", "house", "ambient", "idm", "punk", "soul", "funk", "dub",
    "folk",
];

fn random_observations(seed: u64, count: usize) -> Vec<Observation> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let n = rng.gen_range(0..5);
            let tags: Vec<&str> = (0..n).map(|_| VOCAB[rng.gen_range(0..VOCAB.len())]).collect();
            let ts = if rng.gen_bool(0.7) { Some(rng.gen_range(0..10_000)) } else { None };
            Observation::new(tags, ts)
        })
        .collect()
}

fn build(config: CooccurrenceConfig, observations: &[Observation]) -> CooccurrenceGraph {
    let mut acc = CooccurrenceAccumulator::new(config).unwrap();
    for obs in observations {
        acc.add_observation(obs);
    }
    acc.build()
}

fn edge_set(graph: &CooccurrenceGraph) -> BTreeSet<(String, String)> {
    graph
        .links
        .iter()
        .map(|l| (l.source.clone(), l.target.clone()))
        .collect()
}

#[test]
fn test_scenario_three_tags_min_one() {
    let mut acc = CooccurrenceAccumulator::new(CooccurrenceConfig::default().with_min_cooccurrence(1)).unwrap();
    acc.add(["rock", "pop", "jazz"], None);
    acc.add(["rock", "pop"], None);

    let graph = acc.build();
    assert_eq!(
        graph.links,
        vec![
            Link::new("pop", "rock", 2),
            Link::new("jazz", "pop", 1),
            Link::new("jazz", "rock", 1),
        ]
    );
    assert_eq!(graph.points.len(), 3);
}

#[test]
fn test_scenario_three_tags_min_two() {
    let mut acc = CooccurrenceAccumulator::new(CooccurrenceConfig::default().with_min_cooccurrence(2)).unwrap();
    acc.add(["rock", "pop", "jazz"], None);
    acc.add(["rock", "pop"], None);

    let graph = acc.build();
    assert_eq!(graph.links, vec![Link::new("pop", "rock", 2)]);
    assert!(graph.point("jazz").is_none());
    assert_eq!(graph.points.len(), 2);
}

#[test]
fn test_scenario_node_cap_keeps_strongest() {
    let config = CooccurrenceConfig::default()
        .with_min_cooccurrence(1)
        .with_max_nodes(2);
    let mut acc = CooccurrenceAccumulator::new(config).unwrap();
    acc.add(["a", "b"], None);
    acc.add(["a", "b"], None);
    acc.add(["a", "c"], None);

    let graph = acc.build();
    assert!(graph.points.len() <= 2);
    assert!(graph.point("a").is_some());
    assert!(graph.point("b").is_some());
    assert_eq!(graph.links, vec![Link::new("a", "b", 2)]);
}

#[test]
fn test_links_canonical_and_above_threshold() {
    let observations = random_observations(11, 2_000);
    for min in 1..=4 {
        let graph = build(CooccurrenceConfig::default().with_min_cooccurrence(min), &observations);
        for link in &graph.links {
            assert!(link.source <= link.target, "non-canonical link {:?}", link);
            assert!(link.weight >= min);
        }
    }
}

#[test]
fn test_points_equal_endpoints() {
    let observations = random_observations(12, 1_000);
    let config = CooccurrenceConfig::default()
        .with_min_cooccurrence(3)
        .with_max_nodes(6)
        .with_max_edges(10);
    let graph = build(config, &observations);

    let point_ids: BTreeSet<&str> = graph.points.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(point_ids, graph.endpoint_ids());
    assert!(graph.points.len() <= 6);
    assert!(graph.links.len() <= 10);
}

#[test]
fn test_build_is_idempotent() {
    let observations = random_observations(13, 500);
    let mut acc = CooccurrenceAccumulator::new(CooccurrenceConfig::default()).unwrap();
    for obs in &observations {
        acc.add_observation(obs);
    }
    let first = acc.build().to_json_string().unwrap();
    let second = acc.build().to_json_string().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_order_independence() {
    let observations = random_observations(14, 1_500);
    let config = CooccurrenceConfig::default().with_min_cooccurrence(2).with_max_edges(25);
    let expected = build(config.clone(), &observations).to_json_string().unwrap();

    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..3 {
        let mut shuffled = observations.clone();
        shuffled.shuffle(&mut rng);
        // Tag order inside an observation must not matter either
        for obs in &mut shuffled {
            obs.tags.reverse();
        }
        assert_eq!(build(config.clone(), &shuffled).to_json_string().unwrap(), expected);
    }
}

#[test]
fn test_parallel_matches_sequential() {
    let observations = random_observations(15, 3_000);
    let config = CooccurrenceConfig::default().with_min_cooccurrence(2);
    let sequential = build(config.clone(), &observations);

    let chunks: Vec<Vec<Observation>> = observations.chunks(257).map(|c| c.to_vec()).collect();
    let parallel = CooccurrenceAccumulator::accumulate_parallel(config, chunks)
        .unwrap()
        .build();
    assert_eq!(parallel, sequential);
}

#[test]
fn test_threshold_monotonicity() {
    let observations = random_observations(16, 2_000);
    let mut previous = edge_set(&build(CooccurrenceConfig::default().with_min_cooccurrence(1), &observations));
    for min in 2..=8 {
        let current = edge_set(&build(CooccurrenceConfig::default().with_min_cooccurrence(min), &observations));
        assert!(current.is_subset(&previous), "min={} added edges", min);
        previous = current;
    }
}

#[test]
fn test_first_seen_is_minimum() {
    let mut acc = CooccurrenceAccumulator::new(CooccurrenceConfig::default().with_min_cooccurrence(1)).unwrap();
    acc.add(["rock", "pop"], Some(300));
    acc.add(["pop", "rock"], None);
    acc.add(["rock", "pop"], Some(100));
    acc.add(["jazz", "rock"], None);

    let graph = acc.build();
    assert_eq!(graph.link("rock", "pop").unwrap().first_seen, Some(100));
    assert_eq!(graph.link("jazz", "rock").unwrap().first_seen, None);
    assert_eq!(graph.point("rock").unwrap().first_seen, Some(100));
    assert_eq!(graph.point("jazz").unwrap().first_seen, None);
}

#[test]
fn test_empty_input_builds_empty_graph() {
    let acc = CooccurrenceAccumulator::new(CooccurrenceConfig::default()).unwrap();
    let graph = acc.build();
    assert!(graph.is_empty());
    assert_eq!(graph.to_json_string().unwrap(), r#"{"points":[],"links":[]}"#);
}
