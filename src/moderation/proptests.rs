//! Property-based tests for the decision protocol
//!
//! Tests for:
//! - Token parsing: never panics, accepts only the canonical form
//! - Status lifecycle: pending, then at most one terminal value, forever

use super::token::{Action, DecisionToken, MAX_TOKEN_LEN};
use super::types::{ProposalId, ProposalStatus, Verdict};
use crate::store::{ProposalStore, SqliteProposalStore};
use crate::telegram::traits::{ChatId, MessageRef, UserId};
use proptest::prelude::*;

fn canonical(raw: &str) -> bool {
    let Some((action, id)) = raw.split_once(':') else {
        return false;
    };
    (action == "approve" || action == "reject")
        && !id.is_empty()
        && id.bytes().all(|b| b.is_ascii_digit())
        && id.parse::<i64>().map(|n| n > 0).unwrap_or(false)
        && raw.len() <= MAX_TOKEN_LEN
}

fn verdict() -> impl Strategy<Value = Verdict> {
    prop_oneof![Just(Verdict::Approved), Just(Verdict::Rejected)]
}

proptest! {
    /// Property: Arbitrary callback data never panics the parser, and is
    /// accepted exactly when it is in canonical form
    #[test]
    fn parse_accepts_only_canonical_tokens(raw in ".{0,80}") {
        let parsed = DecisionToken::parse(&raw);
        prop_assert_eq!(parsed.is_ok(), canonical(&raw), "raw = {:?}", raw);
    }

    /// Property: Near-miss tokens built from real actions are still validated
    #[test]
    fn parse_checks_id_part(
        action in prop_oneof![Just("approve"), Just("reject")],
        id in "[-+ 0-9a-z]{0,24}",
    ) {
        let raw = format!("{}:{}", action, id);
        prop_assert_eq!(DecisionToken::parse(&raw).is_ok(), canonical(&raw));
    }

    /// Property: Every token we emit parses back to itself
    #[test]
    fn emitted_tokens_parse(id in 1i64.., approve in any::<bool>()) {
        let action = if approve { Action::Approve } else { Action::Reject };
        let token = DecisionToken::new(action, ProposalId(id));
        let encoded = token.encode();

        prop_assert!(encoded.len() <= MAX_TOKEN_LEN);
        prop_assert_eq!(DecisionToken::parse(&encoded), Ok(token));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: Whatever sequence of transitions is attempted, status is
    /// pending until the first one and equals the first verdict afterwards
    #[test]
    fn status_changes_at_most_once(attempts in prop::collection::vec(verdict(), 1..12)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let store = SqliteProposalStore::open_in_memory().await.unwrap();
            let origin = MessageRef { chat_id: ChatId(1), message_id: 1 };
            let id = store.create(UserId(1), &origin).await.unwrap();

            let mut observed = vec![store.get(id).await.unwrap().unwrap().status];
            let mut successes = 0;
            for verdict in &attempts {
                if store.transition(id, *verdict).await.unwrap() {
                    successes += 1;
                }
                observed.push(store.get(id).await.unwrap().unwrap().status);
            }

            prop_assert_eq!(successes, 1);
            prop_assert_eq!(observed[0], ProposalStatus::Pending);
            let terminal = ProposalStatus::from(attempts[0]);
            prop_assert!(observed[1..].iter().all(|s| *s == terminal));
            Ok(())
        })?;
    }
}
