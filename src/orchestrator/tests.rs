use super::*;
use crate::completion::{FailingCompletionClient, MockCompletionClient};
use crate::models::{Persona, Tier};
use crate::prompt::PromptMessage;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;

fn investment_orchestrator(reply: &str) -> Orchestrator {
    Orchestrator::new(Box::new(MockCompletionClient::with_reply(reply)))
}

fn settings(vertical: Vertical) -> SessionSettings {
    SessionSettings {
        vertical,
        persona: Persona::Introverted,
    }
}

fn full_allocation(entries: [(Bucket, u64); 5]) -> BTreeMap<Bucket, u64> {
    entries.into_iter().collect()
}

/// Answer every investment question with the given choice
async fn run_questionnaire(orchestrator: &Orchestrator, mut session: Session, choice: u8) -> Session {
    let count = questionnaire::questionnaire(Vertical::Investment).len();
    for _ in 0..count {
        let outcome = orchestrator
            .handle_event(
                session,
                SessionEvent::UserMessage {
                    text: choice.to_string(),
                },
            )
            .await;
        session = outcome.session;
    }
    session
}

#[tokio::test]
async fn test_start_session_emits_greeting_and_first_question() {
    let orchestrator = investment_orchestrator("ok");
    let outcome = orchestrator.start_session(Uuid::new_v4(), settings(Vertical::Investment));

    assert_eq!(outcome.session.stage, Stage::Questionnaire { index: 0 });
    assert_eq!(outcome.replies.len(), 2);
    assert!(outcome.replies[1].text.contains("Question 1"));
}

#[tokio::test]
async fn test_invalid_answer_reprompts_without_advancing() {
    let orchestrator = investment_orchestrator("ok");
    let outcome = orchestrator.start_session(Uuid::new_v4(), settings(Vertical::Investment));

    let outcome = orchestrator
        .handle_event(
            outcome.session,
            SessionEvent::UserMessage {
                text: "maybe".to_string(),
            },
        )
        .await;

    assert_eq!(outcome.session.stage, Stage::Questionnaire { index: 0 });
    assert!(outcome.session.questionnaire_answers.is_empty());
    assert!(outcome.replies[0].text.contains("doesn't match"));

    let outcome = orchestrator
        .handle_event(
            outcome.session,
            SessionEvent::UserMessage {
                text: "9".to_string(),
            },
        )
        .await;
    assert_eq!(outcome.session.stage, Stage::Questionnaire { index: 0 });
}

#[tokio::test]
async fn test_questionnaire_completion_scores_and_briefs() {
    let orchestrator = investment_orchestrator("ok");
    let outcome = orchestrator.start_session(Uuid::new_v4(), settings(Vertical::Investment));
    let session = run_questionnaire(&orchestrator, outcome.session, 3).await;

    assert_eq!(session.stage, Stage::ProductIntro);
    assert_eq!(session.risk_score, Some(30));
    assert_eq!(session.tier, Some(Tier::Moderate));
}

#[tokio::test]
async fn test_final_before_first_allocation_is_refused() {
    let orchestrator = investment_orchestrator("ok");
    let outcome = orchestrator.start_session(Uuid::new_v4(), settings(Vertical::Investment));
    let session = run_questionnaire(&orchestrator, outcome.session, 3).await;

    let outcome = orchestrator
        .handle_event(
            session,
            SessionEvent::UserMessage {
                text: "FINAL".to_string(),
            },
        )
        .await;

    assert_eq!(outcome.session.stage, Stage::ProductIntro);
    assert!(outcome.replies[0]
        .text
        .contains("complete your first allocation"));
}

#[tokio::test]
async fn test_first_allocation_runs_advisory_and_extracts_delta() {
    let orchestrator =
        investment_orchestrator("⬆️ Move NT$300,000 from RR1 to RR5 for more growth.");
    let outcome = orchestrator.start_session(Uuid::new_v4(), settings(Vertical::Investment));
    let session = run_questionnaire(&orchestrator, outcome.session, 3).await;

    let outcome = orchestrator
        .handle_event(
            session,
            SessionEvent::AllocationSubmitted {
                amounts: full_allocation([
                    (Bucket::RR1, 700_000),
                    (Bucket::RR2, 300_000),
                    (Bucket::RR3, 0),
                    (Bucket::RR4, 0),
                    (Bucket::RR5, 0),
                ]),
            },
        )
        .await;

    assert_eq!(outcome.session.stage, Stage::RecommendationReview);
    assert!(outcome.session.has_allocation());
    assert_eq!(outcome.session.recommended_delta[&Bucket::RR1], -300_000);
    assert_eq!(outcome.session.recommended_delta[&Bucket::RR5], 300_000);
}

#[tokio::test]
async fn test_invalid_allocation_reprompts() {
    let orchestrator = investment_orchestrator("ok");
    let outcome = orchestrator.start_session(Uuid::new_v4(), settings(Vertical::Investment));
    let session = run_questionnaire(&orchestrator, outcome.session, 3).await;

    // RR3-RR5 missing entirely
    let amounts: BTreeMap<Bucket, u64> = [(Bucket::RR1, 700_001), (Bucket::RR2, 299_999)]
        .into_iter()
        .collect();

    let outcome = orchestrator
        .handle_event(session, SessionEvent::AllocationSubmitted { amounts })
        .await;

    assert_eq!(outcome.session.stage, Stage::ProductIntro);
    assert!(!outcome.session.has_allocation());
    assert!(outcome.replies[0].text.contains("RR3 has no entry"));
}

#[tokio::test]
async fn test_transport_failure_does_not_advance() {
    let orchestrator = Orchestrator::new(Box::new(FailingCompletionClient));
    let outcome = orchestrator.start_session(Uuid::new_v4(), settings(Vertical::Investment));
    let session = run_questionnaire(&orchestrator, outcome.session, 3).await;

    let outcome = orchestrator
        .handle_event(
            session,
            SessionEvent::AllocationSubmitted {
                amounts: full_allocation([
                    (Bucket::RR1, 700_000),
                    (Bucket::RR2, 300_000),
                    (Bucket::RR3, 0),
                    (Bucket::RR4, 0),
                    (Bucket::RR5, 0),
                ]),
            },
        )
        .await;

    // Apology appended, stage back where a resubmission retries the turn
    assert_eq!(outcome.session.stage, Stage::ProductIntro);
    assert!(outcome.replies[0].text.contains("try again"));
    assert!(outcome.session.recommended_delta.is_empty());
    // The validated allocation is kept so the retry is cheap
    assert!(outcome.session.has_allocation());
}

#[tokio::test]
async fn test_full_investment_flow_to_completion() {
    let orchestrator =
        investment_orchestrator("⬆️ Move NT$300,000 from RR1 to RR5 for more growth.");
    let outcome = orchestrator.start_session(Uuid::new_v4(), settings(Vertical::Investment));
    let session = run_questionnaire(&orchestrator, outcome.session, 3).await;

    let outcome = orchestrator
        .handle_event(
            session,
            SessionEvent::AllocationSubmitted {
                amounts: full_allocation([
                    (Bucket::RR1, 700_000),
                    (Bucket::RR2, 300_000),
                    (Bucket::RR3, 0),
                    (Bucket::RR4, 0),
                    (Bucket::RR5, 0),
                ]),
            },
        )
        .await;

    let outcome = orchestrator
        .handle_event(
            outcome.session,
            SessionEvent::UserMessage {
                text: "final".to_string(),
            },
        )
        .await;
    assert_eq!(outcome.session.stage, Stage::FinalAllocation);

    let seeded = outcome.session.seeded_final_allocation();
    assert_eq!(seeded[&Bucket::RR1], 400_000);
    assert_eq!(seeded[&Bucket::RR5], 300_000);

    let outcome = orchestrator
        .handle_event(
            outcome.session,
            SessionEvent::AllocationSubmitted {
                amounts: seeded.clone(),
            },
        )
        .await;

    assert_eq!(outcome.session.stage, Stage::Completed);
    assert!(outcome.session.is_finalized);
}

#[tokio::test]
async fn test_completed_session_accepts_no_transition() {
    let orchestrator =
        investment_orchestrator("⬆️ Move NT$300,000 from RR1 to RR5 for more growth.");
    let outcome = orchestrator.start_session(Uuid::new_v4(), settings(Vertical::Investment));
    let session = run_questionnaire(&orchestrator, outcome.session, 3).await;

    let outcome = orchestrator
        .handle_event(
            session,
            SessionEvent::AllocationSubmitted {
                amounts: full_allocation([
                    (Bucket::RR1, 700_000),
                    (Bucket::RR2, 300_000),
                    (Bucket::RR3, 0),
                    (Bucket::RR4, 0),
                    (Bucket::RR5, 0),
                ]),
            },
        )
        .await;
    let outcome = orchestrator
        .handle_event(
            outcome.session,
            SessionEvent::UserMessage {
                text: "FINAL".to_string(),
            },
        )
        .await;
    let seeded = outcome.session.seeded_final_allocation();
    let outcome = orchestrator
        .handle_event(
            outcome.session,
            SessionEvent::AllocationSubmitted { amounts: seeded },
        )
        .await;
    assert!(outcome.session.is_finalized);
    let log_len = outcome.session.log.len();

    // Nothing after finalization may transition or touch the log
    let outcome = orchestrator
        .handle_event(
            outcome.session,
            SessionEvent::UserMessage {
                text: "FINAL".to_string(),
            },
        )
        .await;
    assert!(outcome.session.is_finalized);
    assert_eq!(outcome.session.stage, Stage::Completed);
    assert_eq!(outcome.session.log.len(), log_len);
    assert!(outcome.replies.is_empty());

    let outcome = orchestrator
        .handle_event(
            outcome.session,
            SessionEvent::AllocationSubmitted {
                amounts: full_allocation([
                    (Bucket::RR1, 1_000_000),
                    (Bucket::RR2, 0),
                    (Bucket::RR3, 0),
                    (Bucket::RR4, 0),
                    (Bucket::RR5, 0),
                ]),
            },
        )
        .await;
    assert_eq!(outcome.session.stage, Stage::Completed);
    assert_eq!(outcome.session.log.len(), log_len);
}

#[tokio::test]
async fn test_free_chat_forwards_and_appends_reply() {
    let orchestrator = investment_orchestrator("Happy to elaborate on RR3.");
    let outcome = orchestrator.start_session(Uuid::new_v4(), settings(Vertical::Investment));
    let session = run_questionnaire(&orchestrator, outcome.session, 3).await;

    let outcome = orchestrator
        .handle_event(
            session,
            SessionEvent::AllocationSubmitted {
                amounts: full_allocation([
                    (Bucket::RR1, 700_000),
                    (Bucket::RR2, 300_000),
                    (Bucket::RR3, 0),
                    (Bucket::RR4, 0),
                    (Bucket::RR5, 0),
                ]),
            },
        )
        .await;
    assert_eq!(outcome.session.stage, Stage::RecommendationReview);

    let outcome = orchestrator
        .handle_event(
            outcome.session,
            SessionEvent::UserMessage {
                text: "Why RR3 and not RR4?".to_string(),
            },
        )
        .await;

    assert_eq!(outcome.session.stage, Stage::FreeChat);
    assert_eq!(outcome.replies[0].text, "Happy to elaborate on RR3.");
    assert_eq!(
        outcome.session.log.last().map(|m| m.text.as_str()),
        Some("Happy to elaborate on RR3.")
    );
}

#[tokio::test]
async fn test_fixed_recommendation_mode_skips_model() {
    let orchestrator = Orchestrator::new(Box::new(FailingCompletionClient))
        .with_fixed_recommendations(true);
    let outcome = orchestrator.start_session(Uuid::new_v4(), settings(Vertical::Investment));
    // All 1s: score 10, Low tier
    let session = run_questionnaire(&orchestrator, outcome.session, 1).await;

    let outcome = orchestrator
        .handle_event(
            session,
            SessionEvent::AllocationSubmitted {
                amounts: full_allocation([
                    (Bucket::RR1, 1_000_000),
                    (Bucket::RR2, 0),
                    (Bucket::RR3, 0),
                    (Bucket::RR4, 0),
                    (Bucket::RR5, 0),
                ]),
            },
        )
        .await;

    // The failing client was never consulted
    assert_eq!(outcome.session.stage, Stage::RecommendationReview);
    assert_eq!(outcome.session.recommended_delta[&Bucket::RR1], -300_000);
    assert_eq!(outcome.session.recommended_delta[&Bucket::RR2], 300_000);
    assert!(outcome.replies[0].text.contains("low risk profile"));
}

#[tokio::test]
async fn test_insurance_flow_to_completion() {
    let orchestrator = Orchestrator::new(Box::new(MockCompletionClient::with_reply(
        "The Secure Choice Plan covers your travel plans well.",
    )));
    let outcome = orchestrator.start_session(Uuid::new_v4(), settings(Vertical::Insurance));
    assert_eq!(outcome.session.stage, Stage::PlanChoice);

    let outcome = orchestrator
        .handle_event(
            outcome.session,
            SessionEvent::PlanSelected {
                plan: "Secure Choice Plan".to_string(),
            },
        )
        .await;
    assert_eq!(outcome.session.stage, Stage::Questionnaire { index: 0 });

    let mut session = outcome.session;
    for answer in ["2", "1", "3"] {
        let outcome = orchestrator
            .handle_event(
                session,
                SessionEvent::UserMessage {
                    text: answer.to_string(),
                },
            )
            .await;
        session = outcome.session;
    }
    assert_eq!(session.stage, Stage::PlanConfirmation);
    assert_eq!(session.risk_score, Some(6));

    let outcome = orchestrator
        .handle_event(
            session,
            SessionEvent::UserMessage {
                text: "FINAL".to_string(),
            },
        )
        .await;
    assert_eq!(outcome.session.stage, Stage::PlanChoiceFinal);

    let outcome = orchestrator
        .handle_event(
            outcome.session,
            SessionEvent::PlanSelected {
                plan: "New Protection Plan".to_string(),
            },
        )
        .await;
    assert_eq!(outcome.session.stage, Stage::Completed);
    assert!(outcome.session.is_finalized);
    assert_eq!(
        outcome.session.chosen_plan.as_deref(),
        Some("New Protection Plan")
    );
}

#[tokio::test]
async fn test_unknown_plan_blocks_save() {
    let orchestrator = investment_orchestrator("ok");
    let outcome = orchestrator.start_session(Uuid::new_v4(), settings(Vertical::Insurance));

    let outcome = orchestrator
        .handle_event(
            outcome.session,
            SessionEvent::PlanSelected {
                plan: "Platinum Unicorn Plan".to_string(),
            },
        )
        .await;

    assert_eq!(outcome.session.stage, Stage::PlanChoice);
    assert!(outcome.session.chosen_plan.is_none());
    assert!(outcome.replies[0].text.contains("isn't one of the available plans"));
}

/// Records the exact message lists sent to the model
struct RecordingClient {
    sent: Arc<Mutex<Vec<Vec<PromptMessage>>>>,
}

#[async_trait]
impl CompletionClient for RecordingClient {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String> {
        self.sent
            .lock()
            .expect("recorder poisoned")
            .push(messages.to_vec());
        Ok("noted.".to_string())
    }
}

#[tokio::test]
async fn test_exact_request_gets_formatting_clause() {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let orchestrator = Orchestrator::new(Box::new(RecordingClient { sent: sent.clone() }));

    let outcome = orchestrator.start_session(Uuid::new_v4(), settings(Vertical::Chat));
    assert_eq!(outcome.session.stage, Stage::FreeChat);

    orchestrator
        .handle_event(
            outcome.session,
            SessionEvent::UserMessage {
                text: "Give me the exact amounts to move.".to_string(),
            },
        )
        .await;

    let sent = sent.lock().expect("recorder poisoned");
    let last_turn = sent[0].last().expect("messages sent");
    assert!(last_turn.content.starts_with("Give me the exact amounts"));
    assert!(last_turn.content.contains("Move NT$X from RRa to RRb"));
}

#[tokio::test]
async fn test_chat_vertical_treats_final_as_plain_text() {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let orchestrator = Orchestrator::new(Box::new(RecordingClient { sent: sent.clone() }));

    let outcome = orchestrator.start_session(Uuid::new_v4(), settings(Vertical::Chat));
    let outcome = orchestrator
        .handle_event(
            outcome.session,
            SessionEvent::UserMessage {
                text: "FINAL".to_string(),
            },
        )
        .await;

    // Forwarded like any other line; no finalization machinery in chat
    assert_eq!(outcome.session.stage, Stage::FreeChat);
    assert!(!outcome.session.is_finalized);
    assert_eq!(sent.lock().expect("recorder poisoned").len(), 1);
}
