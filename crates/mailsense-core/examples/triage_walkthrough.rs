#![allow(clippy::expect_used, clippy::unwrap_used, clippy::too_many_lines)]
//! Example: full triage flow against in-memory storage
//!
//! Walks one user through the whole engine:
//! 1. Seed sender history and a trust designation
//! 2. Score two incoming messages
//! 3. Record the scoring decisions in the ledger
//! 4. Review one (approve) and correct the other
//! 5. Inspect memories, the accuracy metrics, and the review queue
//!
//! ## Running
//!
//! ```bash
//! RUST_LOG=info cargo run --package mailsense-core --example triage_walkthrough
//! ```

use mailsense_core::decision::{DecisionData, SqliteDecisionStore};
use mailsense_core::signal::{
    InteractionKind, MailCategory, PlatformSignals, SignalRepository, TrustLevel, UserId,
};
use mailsense_core::{EngineConfig, TriageService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let store = SqliteDecisionStore::in_memory().await?;
    let signals = SignalRepository::in_memory().await?;
    let service = TriageService::new(store, signals, EngineConfig::default()).await?;
    let user = UserId::new(1);

    // Seed behavior: a colleague the user always answers, and a newsletter
    // the user always archives
    for _ in 0..12 {
        service.signals().record_message(user, "ana@corp.com").await?;
    }
    for _ in 0..8 {
        service
            .signals()
            .record_interaction(user, "ana@corp.com", InteractionKind::Responded)
            .await?;
    }
    for _ in 0..9 {
        service.signals().record_message(user, "news@letter.io").await?;
    }
    for _ in 0..8 {
        service
            .signals()
            .record_interaction(user, "news@letter.io", InteractionKind::Archived)
            .await?;
    }
    service
        .signals()
        .set_trust(user, "ana@corp.com", TrustLevel::Trusted)
        .await?;

    // Score both messages
    let colleague = service
        .score_message(
            user,
            "ana@corp.com",
            "Deadline today: budget approval needed",
            "Can you sign off before 5pm?",
            &PlatformSignals {
                is_starred: true,
                category: MailCategory::Primary,
                ..PlatformSignals::default()
            },
        )
        .await?;
    println!(
        "ana@corp.com     -> score {:3}  {:?}  ({})",
        colleague.importance_score, colleague.suggested_action, colleague.reasoning
    );

    let newsletter = service
        .score_message(
            user,
            "news@letter.io",
            "Your weekly digest",
            "The ten best articles this week...",
            &PlatformSignals {
                category: MailCategory::Promotional,
                has_unsubscribe_link: true,
                ..PlatformSignals::default()
            },
        )
        .await?;
    println!(
        "news@letter.io   -> score {:3}  {:?}  ({})",
        newsletter.importance_score, newsletter.suggested_action, newsletter.reasoning
    );

    // Record both as decisions
    let colleague_id = service
        .record_decision(
            user,
            DecisionData::ImportanceScoring {
                importance_score: colleague.importance_score,
                sender_email: Some("ana@corp.com".to_string()),
                suggested_action: Some(colleague.suggested_action),
            },
            colleague.reasoning.clone(),
            colleague.confidence,
            Some("msg-1001".to_string()),
        )
        .await?;
    let newsletter_id = service
        .record_decision(
            user,
            DecisionData::ImportanceScoring {
                importance_score: newsletter.importance_score,
                sender_email: Some("news@letter.io".to_string()),
                suggested_action: Some(newsletter.suggested_action),
            },
            newsletter.reasoning.clone(),
            newsletter.confidence,
            Some("msg-1002".to_string()),
        )
        .await?;

    let pending = service.get_pending_reviews(user, 10).await?;
    println!("\n{} decisions awaiting review", pending.len());

    // The user agrees about the colleague but finds the newsletter score
    // still too generous
    service
        .user_review_decision(colleague_id, user, true, None, None)
        .await?;
    service
        .user_review_decision(
            newsletter_id,
            user,
            false,
            Some(DecisionData::ImportanceScoring {
                importance_score: 2,
                sender_email: Some("news@letter.io".to_string()),
                suggested_action: None,
            }),
            Some("promotional noise, archive it".to_string()),
        )
        .await?;

    let metrics = service.get_accuracy_metrics(user, None, 30).await?;
    println!(
        "\naccuracy: {}/{} approved ({:.0}%), avg confidence {:.2}",
        metrics.approved,
        metrics.total,
        metrics.approval_rate * 100.0,
        metrics.avg_confidence
    );

    let catalog = service.get_all_memories(user).await?;
    println!(
        "memories: {} sender, {} correction",
        catalog.sender_memories.len(),
        catalog.correction_memories.len()
    );

    let queue = service.review_queue(user, 7).await?;
    let summary = queue.summary();
    println!(
        "queue: {} total, {} need attention, approval rate {:?}",
        summary.total, summary.needs_attention, summary.approval_rate
    );

    Ok(())
}
