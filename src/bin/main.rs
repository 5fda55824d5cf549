use advisory_chat_orchestrator::{
    catalog::Bucket,
    completion::MockCompletionClient,
    models::{Persona, SessionSettings, Vertical},
    orchestrator::{Orchestrator, SessionEvent},
    questionnaire,
};
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

/// Scripted walkthrough of the investment flow against the mock client
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("Advisory Chat Orchestrator demo starting");

    let orchestrator = Orchestrator::new(Box::new(MockCompletionClient::new()));

    // Submit settings: investment vertical, introverted persona
    let mut outcome = orchestrator.start_session(
        Uuid::new_v4(),
        SessionSettings {
            vertical: Vertical::Investment,
            persona: Persona::Introverted,
        },
    );
    print_replies(&outcome.replies);

    // Answer the questionnaire with middling choices
    let question_count = questionnaire::questionnaire(Vertical::Investment).len();
    for _ in 0..question_count {
        outcome = orchestrator
            .handle_event(
                outcome.session,
                SessionEvent::UserMessage {
                    text: "3".to_string(),
                },
            )
            .await;
        print_replies(&outcome.replies);
    }

    // First allocation round
    let amounts: BTreeMap<_, _> = [
        ("RR1", 700_000u64),
        ("RR2", 300_000),
        ("RR3", 0),
        ("RR4", 0),
        ("RR5", 0),
    ]
    .into_iter()
    .map(|(label, amount)| (Bucket::from_label(label).expect("demo bucket label"), amount))
    .collect();

    outcome = orchestrator
        .handle_event(outcome.session, SessionEvent::AllocationSubmitted { amounts })
        .await;
    print_replies(&outcome.replies);

    info!(
        "Extracted recommendation deltas: {:?}",
        outcome.session.recommended_delta
    );

    // A follow-up question, then finalize
    outcome = orchestrator
        .handle_event(
            outcome.session,
            SessionEvent::UserMessage {
                text: "Why move anything out of RR1?".to_string(),
            },
        )
        .await;
    print_replies(&outcome.replies);

    outcome = orchestrator
        .handle_event(
            outcome.session,
            SessionEvent::UserMessage {
                text: "FINAL".to_string(),
            },
        )
        .await;
    print_replies(&outcome.replies);

    let seeded = outcome.session.seeded_final_allocation();
    info!("Final allocation pre-seed: {:?}", seeded);

    outcome = orchestrator
        .handle_event(
            outcome.session,
            SessionEvent::AllocationSubmitted { amounts: seeded },
        )
        .await;
    print_replies(&outcome.replies);

    info!(
        finalized = outcome.session.is_finalized,
        stage = ?outcome.session.stage,
        messages = outcome.session.log.len(),
        "Demo complete"
    );

    Ok(())
}

fn print_replies(replies: &[advisory_chat_orchestrator::transcript::ChatMessage]) {
    for reply in replies {
        println!("🤖 {}\n", reply.text);
    }
}
