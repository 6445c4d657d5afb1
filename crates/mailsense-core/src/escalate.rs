//! Deep triage escalation.
//!
//! Messages the fast scorer is unsure about (low confidence or unknown
//! sender) can be batched to an external reasoning service for contextual
//! rescoring. The batch is bounded and the call has a timeout; on any
//! failure - timeout, transport error, malformed reply - every message
//! keeps its already-computed composite score. Failure is per batch item,
//! never per batch.

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use mailsense_reason::Completer;

use crate::config::EscalationConfig;
use crate::scoring::{RelationshipType, ScoringResult, SuggestedAction};
use crate::signal::{TrustLevel, UserContext};

/// One scored message, as the escalation path sees it.
#[derive(Debug, Clone)]
pub struct ScoredMessage {
    /// Provider message id, if known.
    pub message_id: Option<String>,
    /// Sender email.
    pub sender_email: String,
    /// Message subject.
    pub subject: String,
    /// Message snippet.
    pub snippet: String,
    /// Trust designation of the sender.
    pub trust: TrustLevel,
    /// The composite scoring result, overridden in place on success.
    pub result: ScoringResult,
}

/// Escalates uncertain scores to an external reasoning service.
///
/// The completer is injected at construction; there is no process-wide
/// client state.
pub struct Escalator<C> {
    completer: C,
    config: EscalationConfig,
}

impl<C: Completer> Escalator<C> {
    /// Creates an escalator with the given completer and limits.
    #[must_use]
    pub const fn new(completer: C, config: EscalationConfig) -> Self {
        Self { completer, config }
    }

    /// Rescore the uncertain messages in a batch.
    ///
    /// Selects messages below the confidence cutoff or from unknown
    /// senders (blocked senders are never escalated; blocking dominates),
    /// caps the batch, and applies whatever adjustments the service
    /// returns. Messages the service skips, and the whole batch on
    /// failure, keep their composite scores.
    pub async fn deep_rescore(
        &self,
        user_context: &UserContext,
        mut messages: Vec<ScoredMessage>,
    ) -> Vec<ScoredMessage> {
        let selected: Vec<usize> = messages
            .iter()
            .enumerate()
            .filter(|(_, m)| {
                m.trust != TrustLevel::Blocked
                    && (m.result.confidence < self.config.confidence_cutoff
                        || m.result.relationship == RelationshipType::Unknown)
            })
            .map(|(i, _)| i)
            .take(self.config.max_batch)
            .collect();

        if selected.is_empty() {
            return messages;
        }
        debug!("Escalating {} messages for deep triage", selected.len());

        let prompt = self.build_prompt(user_context, &selected, &messages);

        let reply =
            match tokio::time::timeout(self.config.timeout, self.completer.complete(&prompt)).await
            {
                Ok(Ok(reply)) => reply,
                Ok(Err(e)) => {
                    warn!("Deep triage escalation failed: {e}; keeping composite scores");
                    return messages;
                }
                Err(_) => {
                    warn!(
                        "Deep triage escalation timed out after {:?}; keeping composite scores",
                        self.config.timeout
                    );
                    return messages;
                }
            };

        let Some(adjustments) = parse_adjustments(&reply) else {
            warn!("Deep triage reply was not valid JSON; keeping composite scores");
            return messages;
        };

        for adjustment in adjustments {
            let Some(&message_index) = selected.get(adjustment.index) else {
                continue;
            };
            let message = &mut messages[message_index];

            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                message.result.importance_score =
                    adjustment.adjusted_score.clamp(0.0, 100.0).round() as u8;
            }
            if let Some(reasoning) = adjustment.reasoning.filter(|r| !r.is_empty()) {
                message.result.reasoning = reasoning;
            }
            if let Some(action) = adjustment
                .suggested_action
                .as_deref()
                .and_then(SuggestedAction::parse)
            {
                message.result.suggested_action = action;
            }
        }

        messages
    }

    fn build_prompt(
        &self,
        user_context: &UserContext,
        selected: &[usize],
        messages: &[ScoredMessage],
    ) -> String {
        let priorities = if user_context.priorities.is_empty() {
            "General work".to_string()
        } else {
            user_context.priorities.join(", ")
        };

        let batch: Vec<serde_json::Value> = selected
            .iter()
            .enumerate()
            .map(|(batch_index, &message_index)| {
                let message = &messages[message_index];
                let snippet: String = message
                    .snippet
                    .chars()
                    .take(self.config.snippet_limit)
                    .collect();
                json!({
                    "index": batch_index,
                    "from": message.sender_email,
                    "subject": message.subject,
                    "snippet": snippet,
                    "sender_relationship": message.result.relationship.as_str(),
                    "initial_score": message.result.importance_score,
                    "confidence": message.result.confidence,
                })
            })
            .collect();

        format!(
            "You are the user's AI triage assistant.\n\n\
             USER CONTEXT:\n\
             - Role: {role}\n\
             - Current Priorities: {priorities}\n\
             - Communication Style: {style}\n\n\
             MESSAGES NEEDING ANALYSIS:\n{batch}\n\n\
             QUESTION: Which of these messages truly matter to this user \
             given their role and priorities?\n\n\
             For each message, provide:\n\
             1. adjusted_score (0-100): your contextual importance score\n\
             2. reasoning: why this matters (or doesn't) to this user\n\
             3. suggested_action: reply_now | review_today | read_later | archive\n\n\
             Return ONLY a valid JSON array:\n\
             [{{\"index\": 0, \"adjusted_score\": 85, \"reasoning\": \"...\", \
             \"suggested_action\": \"reply_now\"}}]",
            role = user_context.role,
            priorities = priorities,
            style = user_context.communication_style,
            batch = serde_json::to_string_pretty(&batch).unwrap_or_else(|_| "[]".to_string()),
        )
    }
}

#[derive(Debug, Deserialize)]
struct Adjustment {
    index: usize,
    adjusted_score: f64,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    suggested_action: Option<String>,
}

/// Pull the JSON array out of a completion reply, tolerating markdown
/// code fences.
fn parse_adjustments(reply: &str) -> Option<Vec<Adjustment>> {
    let body = if let Some(fenced) = reply.split("```json").nth(1) {
        fenced.split("```").next().unwrap_or(fenced)
    } else if let Some(fenced) = reply.split("```").nth(1) {
        fenced
    } else {
        reply
    };

    serde_json::from_str(body.trim()).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mailsense_reason::{Error as ReasonError, Result as ReasonResult};
    use std::time::Duration;

    struct ScriptedCompleter {
        reply: String,
    }

    impl Completer for ScriptedCompleter {
        async fn complete(&self, _prompt: &str) -> ReasonResult<String> {
            Ok(self.reply.clone())
        }
    }

    struct FailingCompleter;

    impl Completer for FailingCompleter {
        async fn complete(&self, _prompt: &str) -> ReasonResult<String> {
            Err(ReasonError::EmptyCompletion)
        }
    }

    struct SlowCompleter;

    impl Completer for SlowCompleter {
        async fn complete(&self, _prompt: &str) -> ReasonResult<String> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok("[]".to_string())
        }
    }

    fn message(confidence: f64, relationship: RelationshipType, trust: TrustLevel) -> ScoredMessage {
        ScoredMessage {
            message_id: None,
            sender_email: "someone@example.com".to_string(),
            subject: "hello".to_string(),
            snippet: "snippet".to_string(),
            trust,
            result: ScoringResult {
                importance_score: 50,
                confidence,
                relationship,
                reasoning: "composite".to_string(),
                suggested_action: SuggestedAction::UserDecides,
            },
        }
    }

    fn escalator<C: Completer>(completer: C) -> Escalator<C> {
        Escalator::new(completer, EscalationConfig::default())
    }

    #[tokio::test]
    async fn test_adjustments_applied_to_selected_messages() {
        let reply = r#"[{"index": 0, "adjusted_score": 85, "reasoning": "matches hiring priority", "suggested_action": "reply_now"}]"#;
        let escalator = escalator(ScriptedCompleter {
            reply: reply.to_string(),
        });

        let messages = vec![
            message(0.3, RelationshipType::Unknown, TrustLevel::Neutral),
            message(0.9, RelationshipType::Vip, TrustLevel::Neutral),
        ];
        let rescored = escalator
            .deep_rescore(&UserContext::default(), messages)
            .await;

        assert_eq!(rescored[0].result.importance_score, 85);
        assert_eq!(rescored[0].result.reasoning, "matches hiring priority");
        assert_eq!(
            rescored[0].result.suggested_action,
            SuggestedAction::ReplyNow
        );
        // Confident message was never part of the batch
        assert_eq!(rescored[1].result.importance_score, 50);
        assert_eq!(rescored[1].result.reasoning, "composite");
    }

    #[tokio::test]
    async fn test_fenced_reply_is_parsed() {
        let reply = "Here you go:\n```json\n[{\"index\": 0, \"adjusted_score\": 10}]\n```";
        let escalator = escalator(ScriptedCompleter {
            reply: reply.to_string(),
        });

        let rescored = escalator
            .deep_rescore(
                &UserContext::default(),
                vec![message(0.3, RelationshipType::Unknown, TrustLevel::Neutral)],
            )
            .await;

        assert_eq!(rescored[0].result.importance_score, 10);
        // No reasoning supplied: the composite explanation survives
        assert_eq!(rescored[0].result.reasoning, "composite");
    }

    #[tokio::test]
    async fn test_malformed_reply_keeps_composite_scores() {
        let escalator = escalator(ScriptedCompleter {
            reply: "I could not decide, sorry!".to_string(),
        });

        let rescored = escalator
            .deep_rescore(
                &UserContext::default(),
                vec![message(0.3, RelationshipType::Unknown, TrustLevel::Neutral)],
            )
            .await;

        assert_eq!(rescored[0].result.importance_score, 50);
    }

    #[tokio::test]
    async fn test_service_failure_keeps_composite_scores() {
        let escalator = escalator(FailingCompleter);

        let rescored = escalator
            .deep_rescore(
                &UserContext::default(),
                vec![message(0.3, RelationshipType::Unknown, TrustLevel::Neutral)],
            )
            .await;

        assert_eq!(rescored[0].result.importance_score, 50);
        assert_eq!(rescored[0].result.reasoning, "composite");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_keeps_composite_scores() {
        let escalator = escalator(SlowCompleter);

        let rescored = escalator
            .deep_rescore(
                &UserContext::default(),
                vec![message(0.3, RelationshipType::Unknown, TrustLevel::Neutral)],
            )
            .await;

        assert_eq!(rescored[0].result.importance_score, 50);
    }

    #[tokio::test]
    async fn test_blocked_senders_are_never_escalated() {
        let reply = r#"[{"index": 0, "adjusted_score": 95, "suggested_action": "reply_now"}]"#;
        let escalator = escalator(ScriptedCompleter {
            reply: reply.to_string(),
        });

        let rescored = escalator
            .deep_rescore(
                &UserContext::default(),
                vec![message(0.3, RelationshipType::Unknown, TrustLevel::Blocked)],
            )
            .await;

        assert_eq!(rescored[0].result.importance_score, 50);
        assert_ne!(
            rescored[0].result.suggested_action,
            SuggestedAction::ReplyNow
        );
    }

    #[tokio::test]
    async fn test_batch_is_capped() {
        let escalator = Escalator::new(
            ScriptedCompleter {
                reply: "[]".to_string(),
            },
            EscalationConfig {
                max_batch: 3,
                ..EscalationConfig::default()
            },
        );

        let messages: Vec<ScoredMessage> = (0..10)
            .map(|_| message(0.3, RelationshipType::Unknown, TrustLevel::Neutral))
            .collect();
        let rescored = escalator
            .deep_rescore(&UserContext::default(), messages)
            .await;

        assert_eq!(rescored.len(), 10);
    }

    #[tokio::test]
    async fn test_out_of_range_adjustment_index_ignored() {
        let reply = r#"[{"index": 7, "adjusted_score": 99}]"#;
        let escalator = escalator(ScriptedCompleter {
            reply: reply.to_string(),
        });

        let rescored = escalator
            .deep_rescore(
                &UserContext::default(),
                vec![message(0.3, RelationshipType::Unknown, TrustLevel::Neutral)],
            )
            .await;

        assert_eq!(rescored[0].result.importance_score, 50);
    }

    #[test]
    fn test_parse_plain_and_fenced() {
        assert!(parse_adjustments(r#"[{"index": 0, "adjusted_score": 1.0}]"#).is_some());
        assert!(
            parse_adjustments("```json\n[{\"index\": 0, \"adjusted_score\": 1.0}]\n```").is_some()
        );
        assert!(parse_adjustments("```\n[{\"index\": 0, \"adjusted_score\": 1.0}]\n```").is_some());
        assert!(parse_adjustments("no json here").is_none());
    }
}
