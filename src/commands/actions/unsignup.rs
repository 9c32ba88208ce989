//! Unsignup command handler.

use async_trait::async_trait;
use log::{debug, info};

use crate::commands::{
    Command, CommandContext, DispatchError, SessionAccess, SessionScope,
    markdown_response::format_unsigned_up,
};

pub struct Unsignup;

#[async_trait]
impl Command for Unsignup {
    fn name(&self) -> &'static str {
        "unsignup"
    }

    fn usage(&self, prefix: &str) -> String {
        format!("`{}unsignup`: leave the signups of this channel", prefix)
    }

    fn access(&self) -> SessionAccess {
        SessionAccess::Existing
    }

    async fn execute(
        &self,
        ctx: &CommandContext<'_>,
        scope: SessionScope<'_>,
    ) -> Result<String, DispatchError> {
        debug!("handling unsignup command: {:?}", ctx.invocation);

        let (guard, _) = scope.into_guard()?;
        let author_id = &ctx.invocation.author_id;

        let session = guard.session_mut()?;
        session.unsignup(author_id)?;

        info!("{} left session {}", author_id, session.id());

        Ok(format_unsigned_up(author_id, session, ctx.settings.limits))
    }
}
