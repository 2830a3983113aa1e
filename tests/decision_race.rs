//! Concurrent decisions on one proposal.
//!
//! Many moderators pressing Approve and Reject at the same moment, on a real
//! on-disk database with a multi-threaded runtime, must produce exactly one
//! winner and exactly one set of side effects.

use curator::moderation::texts;
use curator::moderation::{
    DecisionEvent, DecisionOutcome, Moderators, Pipeline, PipelineSettings, ProposalId,
    ProposalStatus, Submission, Submitter, Verdict,
};
use curator::store::{ProposalStore, SqliteProposalStore};
use curator::telegram::{CallbackId, ChatId, ChatRef, MessageRef, MockTransport, RetryPolicy, UserId};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Barrier;

const SUBMITTER: UserId = UserId(42);
const PRESSES: usize = 16;

fn moderators() -> Vec<UserId> {
    (0..4).map(|i| UserId(900 + i)).collect()
}

struct Harness {
    _dir: TempDir,
    store: SqliteProposalStore,
    transport: MockTransport,
    pipeline: Arc<Pipeline<SqliteProposalStore, MockTransport>>,
}

async fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let store = SqliteProposalStore::open(&dir.path().join("proposals.db"))
        .await
        .unwrap();
    let transport = MockTransport::new();
    let settings = PipelineSettings {
        moderators: Moderators::new(moderators()),
        outlet: ChatRef::Username("@outlet".to_string()),
        publish_retry: RetryPolicy::none(),
    };
    let pipeline = Arc::new(Pipeline::new(store.clone(), transport.clone(), settings));

    Harness {
        _dir: dir,
        store,
        transport,
        pipeline,
    }
}

async fn submit(harness: &Harness, message_id: i64) -> ProposalId {
    harness
        .pipeline
        .handle_submission(Submission {
            submitter: Submitter {
                id: SUBMITTER,
                display_name: None,
            },
            origin: MessageRef {
                chat_id: ChatId(SUBMITTER.0),
                message_id,
            },
            preview: None,
        })
        .await
        .unwrap()
        .proposal_id
}

/// Fire `tokens` at the same proposal concurrently, one task per press.
async fn press_all(harness: &Harness, tokens: Vec<String>) -> Vec<DecisionOutcome> {
    let barrier = Arc::new(Barrier::new(tokens.len()));
    let mods = moderators();

    let handles: Vec<_> = tokens
        .into_iter()
        .enumerate()
        .map(|(i, token)| {
            let pipeline = Arc::clone(&harness.pipeline);
            let barrier = Arc::clone(&barrier);
            let actor = mods[i % mods.len()];
            tokio::spawn(async move {
                barrier.wait().await;
                pipeline
                    .handle_decision(DecisionEvent {
                        actor,
                        token,
                        callback: CallbackId(format!("cb-{}", i)),
                        view: None,
                    })
                    .await
            })
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }
    outcomes
}

fn winners(outcomes: &[DecisionOutcome]) -> Vec<Verdict> {
    outcomes
        .iter()
        .filter_map(|o| match o {
            DecisionOutcome::Decided { verdict, .. } => Some(*verdict),
            _ => None,
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_reject_and_approve() {
    let harness = harness().await;
    let id = submit(&harness, 1).await;

    let outcomes = press_all(
        &harness,
        vec![format!("reject:{}", id), format!("approve:{}", id)],
    )
    .await;

    let winners = winners(&outcomes);
    assert_eq!(winners.len(), 1, "outcomes: {:?}", outcomes);

    let loser = outcomes
        .iter()
        .find(|o| matches!(o, DecisionOutcome::AlreadyDecided { .. }));
    assert!(loser.is_some(), "outcomes: {:?}", outcomes);

    let status = harness.store.get(id).await.unwrap().unwrap().status;
    assert_eq!(status, ProposalStatus::from(winners[0]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_presses_one_side_effect() {
    let harness = harness().await;

    for message_id in 1..=5 {
        let id = submit(&harness, message_id).await;
        harness.transport.clear();

        let tokens = (0..PRESSES)
            .map(|i| {
                let action = if i % 2 == 0 { "approve" } else { "reject" };
                format!("{}:{}", action, id)
            })
            .collect();
        let outcomes = press_all(&harness, tokens).await;

        let winners = winners(&outcomes);
        assert_eq!(winners.len(), 1, "outcomes: {:?}", outcomes);
        let already = outcomes
            .iter()
            .filter(|o| matches!(o, DecisionOutcome::AlreadyDecided { .. }))
            .count();
        assert_eq!(already, PRESSES - 1);

        // Exactly one publish or one rejection notice, never both
        let published = harness.transport.published().len();
        let notices = harness.transport.notifications_to(SUBMITTER);
        let rejections = notices
            .iter()
            .filter(|text| text.as_str() == texts::SUBMITTER_REJECTED)
            .count();
        assert_eq!(published + rejections, 1);
        assert_eq!(notices.len(), 1);

        let status = harness.store.get(id).await.unwrap().unwrap().status;
        assert_eq!(status, ProposalStatus::from(winners[0]));
        match winners[0] {
            Verdict::Approved => assert_eq!(published, 1),
            Verdict::Rejected => assert_eq!(rejections, 1),
        }
    }

    let counts = harness.store.counts().await.unwrap();
    assert_eq!(counts.pending, 0);
    assert_eq!(counts.total(), 5);
}
