//! Decision token encoding.
//!
//! Buttons carry `<action>:<proposal_id>` through the transport's callback
//! data channel, which Telegram caps at 64 bytes. Only the id travels in the
//! token; everything else is looked up in the store.

use super::types::ProposalId;
use std::fmt;
use std::str::FromStr;

/// Callback data limit imposed by the Bot API.
pub const MAX_TOKEN_LEN: usize = 64;

const SEPARATOR: char = ':';

/// Moderator action encoded in a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Approve,
    Reject,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Approve => "approve",
            Action::Reject => "reject",
        }
    }
}

/// Parsed `{action, proposal_id}` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecisionToken {
    pub action: Action,
    pub proposal_id: ProposalId,
}

/// Token parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Token is {0} bytes, limit is {limit}", limit = MAX_TOKEN_LEN)]
    TooLong(usize),

    #[error("Token has no ':' separator")]
    MissingSeparator,

    #[error("Unknown action '{0}'")]
    UnknownAction(String),

    #[error("Invalid proposal id '{0}'")]
    InvalidId(String),
}

impl DecisionToken {
    pub fn new(action: Action, proposal_id: ProposalId) -> Self {
        Self {
            action,
            proposal_id,
        }
    }

    pub fn encode(&self) -> String {
        format!("{}{}{}", self.action.as_str(), SEPARATOR, self.proposal_id.0)
    }

    /// Parse untrusted callback data.
    ///
    /// Accepts exactly `approve:<n>` or `reject:<n>` where `<n>` is a positive
    /// decimal integer written with ASCII digits only.
    pub fn parse(raw: &str) -> Result<Self, TokenError> {
        if raw.len() > MAX_TOKEN_LEN {
            return Err(TokenError::TooLong(raw.len()));
        }

        let (action, id) = raw
            .split_once(SEPARATOR)
            .ok_or(TokenError::MissingSeparator)?;

        let action = match action {
            "approve" => Action::Approve,
            "reject" => Action::Reject,
            other => return Err(TokenError::UnknownAction(other.to_string())),
        };

        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TokenError::InvalidId(id.to_string()));
        }
        let id: i64 = id
            .parse()
            .map_err(|_| TokenError::InvalidId(id.to_string()))?;
        if id <= 0 {
            return Err(TokenError::InvalidId(id.to_string()));
        }

        Ok(Self::new(action, ProposalId(id)))
    }
}

impl fmt::Display for DecisionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for DecisionToken {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        let token = DecisionToken::new(Action::Approve, ProposalId(17));
        assert_eq!(token.encode(), "approve:17");
        assert_eq!(
            DecisionToken::new(Action::Reject, ProposalId(3)).to_string(),
            "reject:3"
        );
    }

    #[test]
    fn test_parse_valid() {
        let token = DecisionToken::parse("reject:42").unwrap();
        assert_eq!(token.action, Action::Reject);
        assert_eq!(token.proposal_id, ProposalId(42));

        let token: DecisionToken = "approve:1".parse().unwrap();
        assert_eq!(token.action, Action::Approve);
    }

    #[test]
    fn test_parse_rejects_unknown_action() {
        assert_eq!(
            DecisionToken::parse("publish:1"),
            Err(TokenError::UnknownAction("publish".to_string()))
        );
        assert!(DecisionToken::parse("Approve:1").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_ids() {
        for raw in [
            "approve:",
            "approve:abc",
            "approve:+5",
            "approve:-5",
            "approve:0",
            "approve: 5",
            "approve:5 ",
            "approve:5:6",
            "approve:99999999999999999999",
        ] {
            assert!(
                matches!(DecisionToken::parse(raw), Err(TokenError::InvalidId(_))),
                "expected InvalidId for {raw:?}"
            );
        }
    }

    #[test]
    fn test_parse_rejects_missing_separator() {
        assert_eq!(
            DecisionToken::parse("approve"),
            Err(TokenError::MissingSeparator)
        );
        assert_eq!(DecisionToken::parse(""), Err(TokenError::MissingSeparator));
    }

    #[test]
    fn test_parse_rejects_legacy_pipe_format() {
        assert!(DecisionToken::parse("approve|5|photo|AgAC").is_err());
    }

    #[test]
    fn test_parse_rejects_oversized() {
        let raw = format!("approve:{}", "1".repeat(MAX_TOKEN_LEN));
        assert_eq!(
            DecisionToken::parse(&raw),
            Err(TokenError::TooLong(raw.len()))
        );
    }

    #[test]
    fn test_longest_token_fits_callback_limit() {
        let token = DecisionToken::new(Action::Approve, ProposalId(i64::MAX));
        assert!(token.encode().len() <= MAX_TOKEN_LEN);
        assert_eq!(DecisionToken::parse(&token.encode()), Ok(token));
    }
}
