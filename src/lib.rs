//! Curator - anonymous submission moderation bot
//!
//! Users send the bot anything in a private chat. Each message becomes a
//! pending proposal that is forwarded to every moderator with Approve/Reject
//! buttons. The first decision wins: approved proposals are copied to the
//! outlet channel without the author's name, and the submitter is told the
//! result either way.
//!
//! Layout:
//! - [`store`]: durable proposals and the decide-once transition
//! - [`moderation`]: ingestion, decision routing, publication
//! - [`telegram`]: Bot API transport and update decoding
//! - [`ingress`]: webhook server and long-polling loop

pub mod ingress;
pub mod moderation;
pub mod store;
pub mod telegram;
