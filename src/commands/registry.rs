//! Command registry.
//!
//! Built once at startup and never mutated afterwards, so lookups need no
//! synchronization.

use std::collections::HashMap;

use crate::commands::{
    Command,
    actions::{Cancel, GuildStats, Help, Signup, Signups, Start, Unsignup},
};

pub struct CommandRegistry {
    commands: HashMap<&'static str, Box<dyn Command>>,
    /// Registration order, used to list commands in help
    order: Vec<&'static str>,
}

impl CommandRegistry {
    /// Registers `commands`; a later command replaces an earlier one with the
    /// same name.
    pub fn new(commands: Vec<Box<dyn Command>>) -> Self {
        let mut registry = CommandRegistry {
            commands: HashMap::new(),
            order: Vec::new(),
        };

        for command in commands {
            let name = command.name();
            if registry.commands.insert(name, command).is_none() {
                registry.order.push(name);
            }
        }

        registry
    }

    /// Registry of every command the bot understands.
    pub fn with_default_commands() -> Self {
        CommandRegistry::new(vec![
            Box::new(Help),
            Box::new(Signup),
            Box::new(Unsignup),
            Box::new(Start),
            Box::new(Cancel),
            Box::new(Signups),
            Box::new(GuildStats),
        ])
    }

    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands.get(name).map(|command| command.as_ref())
    }

    /// Usage line of every command, in registration order.
    pub fn usages(&self, prefix: &str) -> Vec<String> {
        self.order
            .iter()
            .filter_map(|name| self.get(name))
            .map(|command| command.usage(prefix))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_commands_are_registered() {
        let registry = CommandRegistry::with_default_commands();

        for name in [
            "help",
            "signup",
            "unsignup",
            "start",
            "cancel",
            "signups",
            "guildstats",
        ] {
            assert_eq!(registry.get(name).map(|c| c.name()), Some(name));
        }
        assert!(registry.get("dance").is_none());
    }

    #[test]
    fn test_lookup_is_exact() {
        let registry = CommandRegistry::with_default_commands();
        assert!(registry.get("SIGNUP").is_none());
        assert!(registry.get("sign").is_none());
    }

    #[test]
    fn test_usages_follow_registration_order() {
        let registry = CommandRegistry::with_default_commands();
        let usages = registry.usages("w.");

        assert_eq!(usages.len(), 7);
        assert!(usages[0].starts_with("`w.help"));
        assert!(usages[1].starts_with("`w.signup`"));
        assert!(usages[6].starts_with("`w.guildstats"));
    }

    #[test]
    fn test_duplicate_name_keeps_one_entry() {
        let registry = CommandRegistry::new(vec![Box::new(Help), Box::new(Help)]);
        assert_eq!(registry.usages("w.").len(), 1);
    }
}
