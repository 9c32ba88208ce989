//! Signups command handler.
//!
//! Read-only: works on the published snapshot and never waits for the
//! channel, even while a start is in progress.

use async_trait::async_trait;
use log::debug;

use crate::commands::{
    Command, CommandContext, DispatchError, SessionAccess, SessionScope,
    markdown_response::format_signups,
};

pub struct Signups;

#[async_trait]
impl Command for Signups {
    fn name(&self) -> &'static str {
        "signups"
    }

    fn usage(&self, prefix: &str) -> String {
        format!(
            "`{}signups`: show the players signed up in this channel",
            prefix
        )
    }

    fn access(&self) -> SessionAccess {
        SessionAccess::Snapshot
    }

    async fn execute(
        &self,
        ctx: &CommandContext<'_>,
        scope: SessionScope<'_>,
    ) -> Result<String, DispatchError> {
        debug!("handling signups command");

        let snapshot = match scope {
            SessionScope::Snapshot(snapshot) => snapshot,
            _ => return Err(DispatchError::NoSession),
        };

        Ok(format_signups(
            snapshot.as_ref(),
            ctx.settings.limits,
            &ctx.settings.prefix,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;

    #[tokio::test]
    async fn test_signups_lists_players() {
        let harness = Harness::new();
        harness.open_session(ALICE, &[ALICE, BOB]).await;
        let invocation = invocation(CAROL, "signups", &[]);

        let reply = Signups
            .execute(
                &harness.context(&invocation),
                SessionScope::Snapshot(harness.session()),
            )
            .await
            .unwrap();

        assert!(reply.contains(&format!("(2/3): `{}`, `{}`", ALICE, BOB)));
    }

    #[tokio::test]
    async fn test_signups_without_session() {
        let harness = Harness::new();
        let invocation = invocation(CAROL, "signups", &[]);

        let reply = Signups
            .execute(&harness.context(&invocation), SessionScope::Snapshot(None))
            .await
            .unwrap();

        assert!(reply.starts_with("No game in this channel."));
    }

    #[tokio::test]
    async fn test_signups_does_not_wait_for_the_channel() {
        let harness = Harness::new();
        harness.open_session(ALICE, &[ALICE]).await;
        let _held = harness.sessions.lock_existing(CHANNEL).await.unwrap();
        let invocation = invocation(CAROL, "signups", &[]);

        let reply = Signups
            .execute(
                &harness.context(&invocation),
                SessionScope::Snapshot(harness.session()),
            )
            .await
            .unwrap();

        assert!(reply.contains(ALICE));
    }
}
