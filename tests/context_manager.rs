//! Integration tests for the context manager
//!
//! Exercises the add/retrieve/update/delete lifecycle against the in-memory
//! backend, including relationship bookkeeping and post-query filtering.

mod common;

use common::{entry, entry_at, init_tracing};
use recollect::embeddings::HashedEmbeddingService;
use recollect::{
    ContextManager, ContextQuery, InMemoryVectorBackend, MetadataPatch, RelationshipRef,
    RetrieveOptions, TimeRange,
};
use std::sync::Arc;

fn setup() -> (ContextManager, Arc<InMemoryVectorBackend>) {
    init_tracing();
    let backend = Arc::new(InMemoryVectorBackend::new());
    let embeddings = Arc::new(HashedEmbeddingService::new());
    (ContextManager::new(backend.clone(), embeddings), backend)
}

#[tokio::test]
async fn relationship_lifecycle() {
    let (manager, _backend) = setup();

    manager
        .add_context(entry("b", "original auth design note", "decision"))
        .await
        .unwrap();

    let mut a = entry("a", "follow-up on the auth design", "decision");
    a.metadata.relationships = vec![RelationshipRef::new("b", "references", 0.8)];
    manager.add_context(a).await.unwrap();

    let related = manager.get_related_memories("a").await;
    assert_eq!(related.len(), 1);
    assert_eq!(related[0].id, "b");
    assert_eq!(related[0].relationship, "references");
    assert!((related[0].strength - 0.8).abs() < f32::EPSILON);

    manager.delete_context("a").await.unwrap();
    assert!(manager.get_related_memories("a").await.is_empty());
}

#[tokio::test]
async fn deleting_target_clears_other_nodes_relationships() {
    let (manager, backend) = setup();

    manager
        .add_context(entry("b", "retired component notes", "note"))
        .await
        .unwrap();

    let mut a = entry("a", "uses the retired component", "note");
    a.metadata.relationships = vec![RelationshipRef::new("b", "references", 0.4)];
    manager.add_context(a).await.unwrap();

    manager.delete_context("b").await.unwrap();

    // The edge pointing at b is gone along with b itself
    assert!(manager.get_related_memories("a").await.is_empty());
    assert_eq!(backend.count().await, 1);
}

#[tokio::test]
async fn delete_removes_entry_from_retrieval() {
    let (manager, _backend) = setup();

    manager
        .add_context(entry("gone", "temporary scratch note", "note"))
        .await
        .unwrap();
    manager.delete_context("gone").await.unwrap();

    let results = manager
        .retrieve_context(
            ContextQuery::Text("temporary scratch note".to_string()),
            RetrieveOptions::default(),
        )
        .await
        .unwrap();

    assert!(results.iter().all(|r| r.entry.id != "gone"));
}

#[tokio::test]
async fn time_range_filter_is_inclusive_and_post_query() {
    let (manager, _backend) = setup();
    let t = 1_700_000_000_000i64;

    manager
        .add_context(entry_at("e1", "first note about caching", "note", t))
        .await
        .unwrap();
    manager
        .add_context(entry_at("e2", "second note about caching", "note", t + 1000))
        .await
        .unwrap();
    manager
        .add_context(entry_at("e3", "third note about caching", "note", t - 5000))
        .await
        .unwrap();

    let results = manager
        .retrieve_context(
            ContextQuery::Text("notes about caching".to_string()),
            RetrieveOptions {
                time_range: Some(TimeRange {
                    start: t - 1,
                    end: t + 2000,
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let mut ids: Vec<&str> = results.iter().map(|r| r.entry.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["e1", "e2"]);
}

#[tokio::test]
async fn context_type_filter_applies_after_time_range() {
    let (manager, _backend) = setup();
    let t = 1_700_000_000_000i64;

    manager
        .add_context(entry_at("d1", "decision about retries", "decision", t))
        .await
        .unwrap();
    manager
        .add_context(entry_at("n1", "note about retries", "note", t))
        .await
        .unwrap();

    let results = manager
        .retrieve_context(
            ContextQuery::Text("retries".to_string()),
            RetrieveOptions {
                context_types: vec!["decision".to_string()],
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].entry.id, "d1");
}

#[tokio::test]
async fn include_related_resolves_only_cached_targets() {
    let (manager, _backend) = setup();

    manager
        .add_context(entry("known", "the schema definition", "note"))
        .await
        .unwrap();

    let mut hub = entry("hub", "index of schema material", "note");
    hub.metadata.relationships = vec![
        RelationshipRef::new("known", "references", 0.9),
        // Target exists only remotely; must be silently omitted
        RelationshipRef::new("remote-only", "references", 0.9),
    ];
    manager.add_context(hub).await.unwrap();

    let results = manager
        .retrieve_context(
            ContextQuery::Text("index of schema material".to_string()),
            RetrieveOptions {
                include_related: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let hub_hit = results.iter().find(|r| r.entry.id == "hub").unwrap();
    assert_eq!(hub_hit.related.len(), 1);
    assert_eq!(hub_hit.related[0].id, "known");
}

#[tokio::test]
async fn raw_vector_query_matches_stored_entry() {
    let (manager, _backend) = setup();

    let id = manager
        .add_context(entry("v1", "vector query target", "note"))
        .await
        .unwrap();
    let cached = manager.get_cached(&id).await.unwrap();
    let vector = cached.vector.unwrap();

    let results = manager
        .retrieve_context(ContextQuery::Vector(vector), RetrieveOptions::default())
        .await
        .unwrap();

    assert_eq!(results[0].entry.id, "v1");
    assert!(results[0].score > 0.99);
}

#[tokio::test]
async fn update_merges_and_repersists() {
    let (manager, backend) = setup();

    let mut original = entry("u1", "tuning the pool size", "note");
    original
        .metadata
        .attributes
        .insert("kept".to_string(), serde_json::json!("yes"));
    manager.add_context(original).await.unwrap();

    let updated = manager
        .update_context_metadata(
            "u1",
            MetadataPatch {
                context_type: Some("decision".to_string()),
                attributes: Some(
                    [("added".to_string(), serde_json::json!(1))]
                        .into_iter()
                        .collect(),
                ),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.metadata.context_type, "decision");
    assert_eq!(updated.metadata.attributes["kept"], "yes");
    assert_eq!(updated.metadata.attributes["added"], 1);

    // The backend copy reflects the merge
    let record = backend.get("u1").await.unwrap();
    assert_eq!(record.metadata.unwrap().context_type, "decision");
}

#[tokio::test]
async fn set_relationships_replaces_whole_list() {
    let (manager, backend) = setup();

    let mut a = entry("a", "evolving dependency notes", "note");
    a.metadata.relationships = vec![RelationshipRef::new("old", "references", 0.2)];
    manager.add_context(a).await.unwrap();

    manager
        .set_relationships("a", vec![RelationshipRef::new("new", "supersedes", 0.9)])
        .await
        .unwrap();

    let related = manager.get_related_memories("a").await;
    assert_eq!(related.len(), 1);
    assert_eq!(related[0].id, "new");

    let record = backend.get("a").await.unwrap();
    let rels = record.metadata.unwrap().relationships;
    assert_eq!(rels.len(), 1);
    assert_eq!(rels[0].target_id, "new");
}
