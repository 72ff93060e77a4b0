// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end pipeline tests: save -> gamification -> background jobs ->
//! discovery, over real SQLite storage and a mock provider.

use somnia_core::{ImageStatus, StorageAdapter};
use somnia_pipeline::now_ms;
use somnia_test_utils::TestHarness;

fn analysis_reply(symbols: &[(&str, &str)]) -> String {
    let symbols: Vec<serde_json::Value> = symbols
        .iter()
        .map(|(name, context)| serde_json::json!({"name": name, "context": context}))
        .collect();
    serde_json::json!({
        "interpretation": "Flight speaks to a longing for open space.",
        "sentiment": "freedom",
        "secondary_sentiments": ["wonder"],
        "symbols": symbols,
        "archetypes": [{"name": "The Explorer", "context": "you, unafraid"}],
        "emotions": [{"name": "Awe", "context": "looking down"}],
        "lumi_quote": "Wings suit you.",
        "guidance": "Notice where waking life feels weightless."
    })
    .to_string()
}

fn synthesis_reply() -> String {
    serde_json::json!({
        "synthesis": "Across these nights you move toward open air.",
        "dominant_archetype": "The Explorer",
        "guidance": "Give yourself one unscheduled hour."
    })
    .to_string()
}

#[tokio::test]
async fn first_dream_full_journey() {
    let harness = TestHarness::new().await;
    harness.profiles.sync_user("u1").await.unwrap();

    harness
        .provider
        .push_response(analysis_reply(&[("Mountains", "jagged peaks below")]))
        .await;
    harness
        .provider
        .push_image(serde_json::json!({"image_url": {"url": "https://img/flight.png"}}))
        .await;

    // Save returns immediately with the entry id.
    let t = now_ms();
    let id = harness
        .journal
        .save("u1", "I was flying over mountains", Some(t))
        .await
        .unwrap();

    // The stub row and gamification are visible before any background work.
    let dream = harness.journal.get(&id).await.unwrap().unwrap();
    assert_eq!(dream.created_at, t);
    assert!(dream.interpretation.is_none());

    let user = harness.storage.get_user("u1").await.unwrap().unwrap();
    assert_eq!(user.xp, 10);
    assert_eq!(user.level, 1);
    assert_eq!(user.streak, 1);

    // Background jobs settle: analysis patches, synthesis no-ops (one
    // entry), image completes.
    harness.drain_jobs().await;

    let dream = harness.journal.get(&id).await.unwrap().unwrap();
    assert_eq!(
        dream.interpretation.as_deref(),
        Some("Flight speaks to a longing for open space.")
    );
    assert_eq!(dream.sentiment.as_deref(), Some("Freedom"));
    assert_eq!(dream.symbols[0].name, "mountains");
    assert_eq!(dream.image_status, ImageStatus::Completed);
    assert_eq!(dream.image_url.as_deref(), Some("https://img/flight.png"));

    let user = harness.storage.get_user("u1").await.unwrap().unwrap();
    assert!(user.last_synthesis.is_none(), "one entry is below the precondition");

    // Discovery reflects the normalized entities with count 1 each.
    let discoveries = harness.discovery.get_user_discoveries("u1").await.unwrap();
    assert_eq!(discoveries.symbols.len(), 1);
    assert_eq!(discoveries.symbols[0].name, "mountains");
    assert_eq!(discoveries.symbols[0].count, 1);
    assert_eq!(discoveries.archetypes[0].name, "the explorer");
    assert_eq!(discoveries.emotions[0].count, 1);
}

#[tokio::test]
async fn second_dream_triggers_a_synthesis() {
    let harness = TestHarness::new().await;
    harness.profiles.sync_user("u1").await.unwrap();

    // Worker order per drain: both analyses first, then synthesis jobs.
    harness
        .provider
        .push_response(analysis_reply(&[("Ocean", "an endless ocean")]))
        .await;
    harness
        .provider
        .push_response(analysis_reply(&[("Ocean", "the same dark water")]))
        .await;
    harness.provider.push_response(synthesis_reply()).await;
    harness.provider.push_response(synthesis_reply()).await;
    harness.provider.push_image(serde_json::json!("https://img/1.png")).await;
    harness.provider.push_image(serde_json::json!("https://img/2.png")).await;

    harness.journal.save("u1", "lost at sea", Some(1_000)).await.unwrap();
    harness.journal.save("u1", "the ocean again", Some(2_000)).await.unwrap();
    harness.drain_jobs().await;

    let user = harness.storage.get_user("u1").await.unwrap().unwrap();
    let stored = user.last_synthesis.expect("synthesis stored after two entries");
    assert!(stored.contains("open air"));
    assert!(user.last_synthesis_date.is_some());

    // Both mentions of the same symbol share one catalog row.
    let discoveries = harness.discovery.get_user_discoveries("u1").await.unwrap();
    assert_eq!(discoveries.symbols.len(), 1);
    assert_eq!(discoveries.symbols[0].count, 2);
}

#[tokio::test]
async fn discovery_tallies_per_reference() {
    let harness = TestHarness::new().await;
    harness.profiles.sync_user("u1").await.unwrap();

    harness
        .provider
        .push_response(analysis_reply(&[("ocean", "c1"), ("fire", "c2")]))
        .await;
    harness.provider.push_response(analysis_reply(&[("ocean", "c3")])).await;
    harness.provider.push_response(synthesis_reply()).await;
    harness.provider.push_response(synthesis_reply()).await;

    harness.journal.save("u1", "ocean and fire", Some(1_000)).await.unwrap();
    harness.journal.save("u1", "ocean only", Some(2_000)).await.unwrap();
    harness.drain_jobs().await;

    let discoveries = harness.discovery.get_user_discoveries("u1").await.unwrap();
    assert_eq!(discoveries.symbols.len(), 2);
    let ocean = discoveries.symbols.iter().find(|e| e.name == "ocean").unwrap();
    let fire = discoveries.symbols.iter().find(|e| e.name == "fire").unwrap();
    assert_eq!(ocean.count, 2);
    assert_eq!(fire.count, 1);

    let combined = discoveries.combined_by_count();
    assert_eq!(combined[0].name, "ocean");
}

#[tokio::test]
async fn provider_outage_degrades_gracefully() {
    let harness = TestHarness::new().await;
    harness.profiles.sync_user("u1").await.unwrap();

    // No canned responses at all: every provider call fails.
    let id = harness.journal.save("u1", "a fragile dream", None).await.unwrap();
    harness.drain_jobs().await;

    let dream = harness.journal.get(&id).await.unwrap().unwrap();
    assert!(dream.interpretation.is_some(), "canned fallback applied");
    assert!(dream.sentiment.is_none());
    assert_eq!(dream.image_status, ImageStatus::Failed);
    assert_eq!(dream.image_retry_count, 1);

    // The save itself and gamification were never affected.
    let user = harness.storage.get_user("u1").await.unwrap().unwrap();
    assert_eq!(user.xp, 10);
}
