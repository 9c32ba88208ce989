//! Cancel command handler.
//!
//! Only the creator of the session or a privileged user may cancel it. The
//! dispatcher evicts the terminated session once the handler returns.

use async_trait::async_trait;
use log::{debug, info};

use crate::commands::{
    Command, CommandContext, DispatchError, SessionAccess, SessionScope,
    markdown_response::format_cancelled,
};

pub struct Cancel;

#[async_trait]
impl Command for Cancel {
    fn name(&self) -> &'static str {
        "cancel"
    }

    fn usage(&self, prefix: &str) -> String {
        format!(
            "`{}cancel`: close the signups of this channel (creator only)",
            prefix
        )
    }

    fn access(&self) -> SessionAccess {
        SessionAccess::Existing
    }

    async fn execute(
        &self,
        ctx: &CommandContext<'_>,
        scope: SessionScope<'_>,
    ) -> Result<String, DispatchError> {
        debug!("handling cancel command: {:?}", ctx.invocation);

        let (guard, _) = scope.into_guard()?;
        let author_id = &ctx.invocation.author_id;

        let session = guard.session_mut()?;
        session.cancel(author_id, ctx.is_privileged())?;

        info!("session {} cancelled by {}", session.id(), author_id);

        Ok(format_cancelled(author_id))
    }
}
