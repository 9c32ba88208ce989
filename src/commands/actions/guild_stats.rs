//! Guild statistics command handler.

use async_trait::async_trait;
use log::debug;

use crate::commands::{
    Command, CommandContext, DispatchError, SessionScope, markdown_response::format_guild_stats,
};

/// Shows the recorded statistics of the current guild, or of the guild given
/// as argument, along with its live sessions.
pub struct GuildStats;

#[async_trait]
impl Command for GuildStats {
    fn name(&self) -> &'static str {
        "guildstats"
    }

    fn usage(&self, prefix: &str) -> String {
        format!(
            "`{}guildstats [guild id]`: show the statistics of this guild or another one",
            prefix
        )
    }

    fn validate(&self, args: &[String]) -> bool {
        args.len() <= 1
    }

    async fn execute(
        &self,
        ctx: &CommandContext<'_>,
        _scope: SessionScope<'_>,
    ) -> Result<String, DispatchError> {
        let guild_id = ctx
            .invocation
            .args
            .first()
            .unwrap_or(&ctx.invocation.guild_id);
        debug!("handling guildstats command for {}", guild_id);

        let stats = ctx.stats.guild_stats(guild_id).await;
        let live_sessions = ctx
            .sessions
            .list_all()
            .iter()
            .filter(|session| session.is_live() && session.guild_id() == guild_id)
            .count();

        Ok(format_guild_stats(guild_id, &stats, live_sessions))
    }
}
