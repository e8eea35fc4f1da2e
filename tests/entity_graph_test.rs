use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use traverse_graph::algo::COMMUNITY_KEY;
use traverse_graph::{
    BatchConsolidator, ConnectedComponentLabeler, ConsolidationConfig, CooccurrenceGraph, DegreePolicy,
    EntityKeyMode, EntityRecord, GraphAnalytics, GraphBuildError, GraphCache, InvertedIndexPairGenerator,
    PairGeneratorConfig, PairGeneratorStats, PrunePolicy, RecordSchema, RequiredTags, TagKind, WeightTable,
};

fn synthetic_pairs(seed: u64, count: usize) -> Vec<(u32, u32)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let a = rng.gen_range(0..400u32);
            let mut b = rng.gen_range(0..400u32);
            while b == a {
                b = rng.gen_range(0..400u32);
            }
            (a.min(b), a.max(b))
        })
        .collect()
}

fn exact_counts(pairs: &[(u32, u32)]) -> Vec<(u32, u32, u32)> {
    let mut counts: BTreeMap<(u32, u32), u32> = BTreeMap::new();
    for &pair in pairs {
        *counts.entry(pair).or_insert(0) += 1;
    }
    counts.into_iter().map(|((a, b), w)| (a, b, w)).collect()
}

#[test]
fn test_batch_consolidation_matches_exact_count() {
    let pairs = synthetic_pairs(42, 100_000);
    let expected = exact_counts(&pairs);

    for capacity in [3usize, 97, 1_000, 33_333, 100_000, 250_000] {
        let config = ConsolidationConfig::default()
            .with_batch_capacity(capacity)
            .with_prune(PrunePolicy::Never);
        let mut consolidator = BatchConsolidator::new(config, 1);
        for &(a, b) in &pairs {
            consolidator.push(a, b);
        }
        let (table, stats) = consolidator.finish();
        assert_eq!(stats.observations, 100_000);
        assert_eq!(table.iter().collect::<Vec<_>>(), expected, "capacity={}", capacity);
        assert_eq!(table.total_weight(), 100_000);
    }
}

#[test]
fn test_merge_order_does_not_matter() {
    let pairs = synthetic_pairs(43, 100_000);
    let expected = exact_counts(&pairs);

    let mut rng = StdRng::seed_from_u64(5);
    let mut chunks: Vec<WeightTable> = Vec::new();
    let mut start = 0;
    while start < pairs.len() {
        let len = rng.gen_range(1..20_000).min(pairs.len() - start);
        chunks.push(WeightTable::from_pairs(pairs[start..start + len].iter().copied()));
        start += len;
    }
    chunks.shuffle(&mut rng);

    let sequential = chunks.iter().fold(WeightTable::new(), |acc, t| acc.merge(t));
    let parallel = WeightTable::merge_all(chunks);
    assert_eq!(sequential, parallel);
    assert_eq!(parallel.iter().collect::<Vec<_>>(), expected);
}

/// 300 entities share one hub tag; everything else is unique to its entity
fn hub_generator(policy: DegreePolicy, max_tag_degree: usize) -> InvertedIndexPairGenerator {
    let config = PairGeneratorConfig::new(policy)
        .with_min_cooccurrence(1)
        .with_max_tag_degree(max_tag_degree);
    let mut generator = InvertedIndexPairGenerator::new(config).unwrap();
    for i in 0..300 {
        let key = format!("artist{:03}", i);
        let own = format!("own{:03}", i);
        generator.ingest(EntityRecord::new(key.clone(), key).with_edge_tags(["hub".to_string(), own]));
    }
    generator
}

#[test]
fn test_skip_policy_hub_contributes_nothing() {
    let (graph, stats) = hub_generator(DegreePolicy::Skip, 50).build_with_stats().unwrap();
    assert!(graph.is_empty());
    assert_eq!(stats.degree.skipped_tags, 1);
    assert_eq!(stats.indexed_entities, 300);
}

#[test]
fn test_sample_policy_bounded_by_max_degree() {
    let max_degree = 50;
    let (graph, stats) = hub_generator(DegreePolicy::Sample { seed: 17 }, max_degree)
        .build_with_stats()
        .unwrap();
    assert_eq!(stats.degree.sampled_tags, 1);
    assert!(!graph.is_empty());
    assert!(graph.links.len() <= max_degree * (max_degree - 1) / 2);
    assert!(graph.points.len() <= max_degree);

    let again = hub_generator(DegreePolicy::Sample { seed: 17 }, max_degree).build().unwrap();
    assert_eq!(again, graph);
}

#[test]
fn test_pruning_never_changes_result() {
    let mut rng = StdRng::seed_from_u64(8);
    let tags: Vec<String> = (0..40).map(|i| format!("tag{:02}", i)).collect();
    let records: Vec<EntityRecord> = (0..200)
        .map(|i| {
            let key = format!("e{:03}", i);
            let picked: Vec<String> = tags.choose_multiple(&mut rng, 6).cloned().collect();
            EntityRecord::new(key.clone(), key).with_edge_tags(picked)
        })
        .collect();

    let build = |consolidation: ConsolidationConfig| {
        let config = PairGeneratorConfig::new(DegreePolicy::Skip)
            .with_min_cooccurrence(3)
            .with_consolidation(consolidation);
        let mut generator = InvertedIndexPairGenerator::new(config).unwrap();
        for record in &records {
            generator.ingest(record.clone());
        }
        generator.build_with_stats().unwrap()
    };

    let (exact, _) = build(ConsolidationConfig::default().with_prune(PrunePolicy::Never));
    let (pruned, stats) = build(
        ConsolidationConfig::default()
            .with_batch_capacity(64)
            .with_prune(PrunePolicy::Unreachable),
    );
    assert!(stats.consolidation.consolidations > 1);
    assert!(!exact.is_empty());
    assert_eq!(pruned, exact);
}

#[test]
fn test_node_cap_by_tag_diversity() {
    let config = PairGeneratorConfig::new(DegreePolicy::Skip)
        .with_min_cooccurrence(1)
        .with_max_nodes(2);
    let mut generator = InvertedIndexPairGenerator::new(config).unwrap();
    generator.ingest(EntityRecord::new("a", "A").with_edge_tags(["x", "y", "z"]));
    generator.ingest(EntityRecord::new("b", "B").with_edge_tags(["x", "y"]));
    generator.ingest(EntityRecord::new("c", "C").with_edge_tags(["x", "y"]));

    let (graph, stats) = generator.build_with_stats().unwrap();
    assert_eq!(stats.entities_capped, 1);
    // b and c tie on diversity; the lower key is kept
    assert!(graph.point("b").is_some());
    assert!(graph.point("c").is_none());
    assert_eq!(graph.link("a", "b").unwrap().weight, 2);
}

#[test]
fn test_rows_to_labelled_graph() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let headers = ["Title", "Artist", "Genres", "Styles", "Year"];
    let rows = [
        ["Selected Ambient Works 85-92", "Aphex Twin", "Electronic", "Techno|IDM|Ambient", "1992"],
        ["Music Has the Right to Children", "Boards of Canada", "Electronic", "IDM;Ambient", "1998"],
        ["Tri Repetae", "Autechre", "Electronic", "IDM, Techno", "1995"],
        ["Greatest Hits", "Various Artists", "Pop", "IDM", "2001"],
        ["Nevermind", "Nirvana", "Rock", "Grunge", "1991"],
        ["In Utero", "Nirvana", "Rock", "Grunge|Alternative Rock", "1993"],
    ];

    let schema = RecordSchema::resolve(&headers).unwrap();
    let kinds = [TagKind::Styles];
    schema.require_tags(&kinds).unwrap();
    schema.require_key(EntityKeyMode::Artist).unwrap();

    let config = PairGeneratorConfig::new(DegreePolicy::Skip).with_min_cooccurrence(2);
    let mut generator = InvertedIndexPairGenerator::new(config).unwrap();
    for row in &rows {
        if let Some(record) = schema.project(row).entity_record(EntityKeyMode::Artist, &kinds) {
            generator.ingest(record);
        }
    }
    assert_eq!(generator.entity_count(), 4);

    let mut graph = generator.build().unwrap();
    assert_eq!(graph.link("Aphex Twin", "Autechre").unwrap().weight, 2);
    assert_eq!(graph.link("Aphex Twin", "Boards of Canada").unwrap().weight, 2);
    assert!(graph.point("Nirvana").is_none());
    assert_eq!(
        graph.point("Aphex Twin").unwrap().get_property("styles").and_then(|v| v.as_string()),
        Some("Ambient | IDM | Techno")
    );

    ConnectedComponentLabeler::new().annotate(&mut graph).unwrap();
    assert!(graph.points.iter().all(|p| p.get_property(COMMUNITY_KEY).is_some()));

    let dir = tempfile::tempdir().unwrap();
    let cache = GraphCache::new(2).with_dir(dir.path());
    let cached = cache.load_or_build("artists-styles", || Ok(graph.clone())).unwrap();
    assert_eq!(*cached, graph);
    let json = std::fs::read_to_string(cache.path_for("artists-styles").unwrap()).unwrap();
    assert!(json.contains("\"community\""));
}

fn build_from_rows(
    rows: &[[&str; 3]],
    mode: EntityKeyMode,
    required: RequiredTags,
) -> (CooccurrenceGraph, PairGeneratorStats) {
    let schema = RecordSchema::resolve(&["title", "artist", "styles"]).unwrap();
    let kinds = [TagKind::Styles];
    let config = PairGeneratorConfig::new(DegreePolicy::Skip).with_min_cooccurrence(1);
    let mut generator = InvertedIndexPairGenerator::new(config)
        .unwrap()
        .with_required_tags(required);
    for row in rows {
        if let Some(record) = schema.project(row).entity_record(mode, &kinds) {
            generator.ingest(record);
        }
    }
    generator.build_with_stats().unwrap()
}

#[test]
fn test_required_artists_in_artist_mode() {
    let rows = [
        ["Selected Ambient Works", "Aphex Twin", "IDM|Ambient"],
        ["Analord", "Aphex Twin", "Acid"],
        ["Tri Repetae", "Autechre", "IDM"],
        ["Geogaddi", "Boards of Canada", "IDM|Ambient"],
    ];
    let required = RequiredTags::new().require("artists", ["Aphex Twin", "autechre"]);
    let (graph, stats) = build_from_rows(&rows, EntityKeyMode::Artist, required);

    assert_eq!(stats.entities_filtered, 1);
    assert_eq!(graph.points.len(), 2);
    assert!(graph.point("Boards of Canada").is_none());
    assert_eq!(graph.link("Aphex Twin", "Autechre").unwrap().weight, 1);
}

#[test]
fn test_required_artists_in_album_mode() {
    let rows = [
        ["September", "Earth, Wind & Fire", "Funk|Soul"],
        ["Boogie Wonderland", "Earth, Wind & Fire", "Funk|Disco"],
        ["Superstition", "Stevie Wonder", "Funk|Soul"],
    ];
    let required = RequiredTags::new().require("artists", ["Earth, Wind & Fire"]);
    let (graph, stats) = build_from_rows(&rows, EntityKeyMode::Album, required);

    assert_eq!(stats.entities_filtered, 1);
    assert_eq!(graph.points.len(), 2);
    assert!(graph.point("september::earth, wind & fire").is_some());
    assert!(graph.point("boogie wonderland::earth, wind & fire").is_some());
    assert_eq!(graph.links.len(), 1);
    assert_eq!(graph.links[0].weight, 1);
}

#[test]
fn test_generator_ignores_ingest_order() {
    let mut rng = StdRng::seed_from_u64(21);
    let tags: Vec<String> = (0..30).map(|i| format!("style{:02}", i)).collect();
    let mut records: Vec<EntityRecord> = Vec::new();
    for i in 0..150 {
        let key = format!("e{:03}", i);
        // Two records per entity so profile merging is exercised too
        for _ in 0..2 {
            let picked: Vec<String> = tags.choose_multiple(&mut rng, 3).cloned().collect();
            let ts = rng.gen_range(0..1_000i64);
            records.push(
                EntityRecord::new(key.clone(), key.to_uppercase())
                    .with_edge_tags(picked)
                    .with_first_seen(Some(ts)),
            );
        }
    }

    let build = |records: &[EntityRecord]| {
        let config = PairGeneratorConfig::new(DegreePolicy::Sample { seed: 9 })
            .with_min_cooccurrence(1)
            .with_max_tag_degree(12)
            .with_max_edges(200);
        let mut generator = InvertedIndexPairGenerator::new(config).unwrap();
        for record in records {
            generator.ingest(record.clone());
        }
        generator.build_with_stats().unwrap()
    };

    let (graph, stats) = build(&records);
    assert!(stats.degree.sampled_tags > 0);
    let expected = graph.to_json_string().unwrap();

    for _ in 0..3 {
        records.shuffle(&mut rng);
        let (shuffled, _) = build(&records);
        assert_eq!(shuffled.to_json_string().unwrap(), expected);
    }
}

#[test]
fn test_missing_key_column_is_fatal() {
    let schema = RecordSchema::resolve(&["genres", "styles"]).unwrap();
    let err = schema.require_key(EntityKeyMode::Album).unwrap_err();
    assert!(matches!(err, GraphBuildError::MissingColumn(_)));

    let err = RecordSchema::resolve(&["plays", "user"]).unwrap_err();
    assert!(err.to_string().contains("Missing column"));
}

#[test]
fn test_config_from_yaml() {
    let yaml = r#"
min_cooccurrence: 3
max_edges: 1000
max_tag_degree: 150
degree_policy:
  policy: sample
  seed: 7
consolidation:
  batch_capacity: 500000
  prune: never
"#;
    let config = PairGeneratorConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(config.min_cooccurrence, 3);
    assert_eq!(config.degree_policy, DegreePolicy::Sample { seed: 7 });
    assert_eq!(config.consolidation.prune, PrunePolicy::Never);
    assert_eq!(config.max_nodes, 0);

    let missing_policy = "min_cooccurrence: 2\n";
    assert!(PairGeneratorConfig::from_yaml_str(missing_policy).is_err());
}
