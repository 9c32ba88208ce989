//! Help command handler.

use async_trait::async_trait;
use log::debug;

use crate::commands::{
    Command, CommandContext, DispatchError, SessionScope, markdown_response::format_help,
};

/// Lists every command, or shows the usage of the command given as argument.
pub struct Help;

#[async_trait]
impl Command for Help {
    fn name(&self) -> &'static str {
        "help"
    }

    fn usage(&self, prefix: &str) -> String {
        format!(
            "`{}help [command]`: show this help or the usage of a command",
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
        debug!("handling help command");
        let prefix = &ctx.settings.prefix;

        let Some(name) = ctx.invocation.args.first() else {
            return Ok(format_help(&ctx.commands.usages(prefix)));
        };

        let name = name.to_lowercase();
        ctx.commands
            .get(&name)
            .map(|command| command.usage(prefix))
            .ok_or(DispatchError::UnknownCommand(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;

    #[tokio::test]
    async fn test_help_lists_every_command() {
        let harness = Harness::new();
        let invocation = invocation(ALICE, "help", &[]);

        let reply = Help
            .execute(&harness.context(&invocation), SessionScope::None)
            .await
            .unwrap();

        for name in [
            "help",
            "signup",
            "unsignup",
            "start",
            "cancel",
            "signups",
            "guildstats",
        ] {
            assert!(reply.contains(&format!("`w.{}", name)), "missing {}", name);
        }
    }

    #[tokio::test]
    async fn test_help_for_one_command() {
        let harness = Harness::new();
        let invocation = invocation(ALICE, "help", &["START"]);

        let reply = Help
            .execute(&harness.context(&invocation), SessionScope::None)
            .await
            .unwrap();

        assert!(reply.starts_with("`w.start`"));
    }

    #[tokio::test]
    async fn test_help_for_unknown_command() {
        let harness = Harness::new();
        let invocation = invocation(ALICE, "help", &["dance"]);

        let result = Help
            .execute(&harness.context(&invocation), SessionScope::None)
            .await;

        assert_eq!(result, Err(DispatchError::UnknownCommand("dance".to_owned())));
    }

    #[test]
    fn test_help_validate() {
        assert!(Help.validate(&[]));
        assert!(Help.validate(&["signup".to_owned()]));
        assert!(!Help.validate(&["signup".to_owned(), "start".to_owned()]));
    }
}
