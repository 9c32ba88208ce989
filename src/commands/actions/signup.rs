//! Signup command handler.
//!
//! The first signup of a channel opens its session; the author becomes its
//! creator and first player.

use async_trait::async_trait;
use log::{debug, info};

use crate::commands::{
    Command, CommandContext, DispatchError, SessionAccess, SessionScope,
    markdown_response::format_signed_up,
};

pub struct Signup;

#[async_trait]
impl Command for Signup {
    fn name(&self) -> &'static str {
        "signup"
    }

    fn usage(&self, prefix: &str) -> String {
        format!("`{}signup`: sign up for the next game of this channel", prefix)
    }

    fn access(&self) -> SessionAccess {
        SessionAccess::OpenOrCreate
    }

    async fn execute(
        &self,
        ctx: &CommandContext<'_>,
        scope: SessionScope<'_>,
    ) -> Result<String, DispatchError> {
        debug!("handling signup command: {:?}", ctx.invocation);

        let (guard, created) = scope.into_guard()?;
        let author_id = &ctx.invocation.author_id;
        let limits = ctx.settings.limits;

        let session = guard.session_mut()?;
        session.signup(author_id, limits)?;

        info!(
            "{} signed up in session {} ({} players)",
            author_id,
            session.id(),
            session.signed_up_players().len()
        );

        Ok(format_signed_up(author_id, session, limits, created))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        commands::test_support::*,
        sessions::{SessionError, SessionState},
    };

    async fn signup(harness: &Harness, author: &str) -> Result<String, DispatchError> {
        let invocation = invocation(author, "signup", &[]);
        let ctx = harness.context(&invocation);
        let (mut guard, outcome) = harness.sessions.open(CHANNEL, GUILD, author).await;
        Signup
            .execute(
                &ctx,
                SessionScope::Exclusive {
                    guard: &mut guard,
                    created: outcome.is_created(),
                },
            )
            .await
    }

    #[tokio::test]
    async fn test_first_signup_opens_session() {
        let harness = Harness::new();

        let reply = signup(&harness, ALICE).await.unwrap();

        assert!(reply.starts_with("Signups are open!"));
        let session = harness.session().unwrap();
        assert_eq!(session.state(), SessionState::Signup);
        assert_eq!(session.creator_id(), ALICE);
        assert_eq!(session.signed_up_players(), &[ALICE.to_owned()]);
    }

    #[tokio::test]
    async fn test_next_signups_join_the_session() {
        let harness = Harness::new();
        signup(&harness, ALICE).await.unwrap();

        let reply = signup(&harness, BOB).await.unwrap();

        assert_eq!(reply, format!("`{}` signed up (2/3).", BOB));
        let session = harness.session().unwrap();
        assert_eq!(session.creator_id(), ALICE);
        assert_eq!(session.signed_up_players().len(), 2);
    }

    #[tokio::test]
    async fn test_signup_twice() {
        let harness = Harness::new();
        signup(&harness, ALICE).await.unwrap();

        let result = signup(&harness, ALICE).await;

        assert_eq!(result, Err(SessionError::AlreadySignedUp.into()));
    }

    #[tokio::test]
    async fn test_signup_when_full() {
        let harness = Harness::new();
        harness.open_session(ALICE, &[ALICE, BOB, CAROL]).await;

        let result = signup(&harness, ADMIN).await;

        assert_eq!(result, Err(SessionError::SessionFull { max: 3 }.into()));
    }

    #[tokio::test]
    async fn test_signup_without_exclusive_scope() {
        let harness = Harness::new();
        let invocation = invocation(ALICE, "signup", &[]);

        let result = Signup
            .execute(&harness.context(&invocation), SessionScope::None)
            .await;

        assert_eq!(result, Err(DispatchError::NoSession));
    }
}
