//! Markdown response formatters.
//!
//! Every message the bot posts is built here, including the rendering of
//! [`DispatchError`]s into user-facing lines.

use std::time::Duration;

use crate::{
    commands::DispatchError,
    game::{GameHandle, GameOutcome},
    sessions::{PlayerLimits, Session, SessionError, SessionState},
    stats::GuildStats,
    utils::{format_duration, format_users},
};

/// Formats the help message from the usage line of every command.
pub fn format_help(usages: &[String]) -> String {
    let commands = usages
        .iter()
        .map(|usage| format!("- {}", usage))
        .collect::<Vec<String>>()
        .join("\n");

    format!(
        "Commands:\n{}\n\n\
        Sign up in a channel, then start the game once enough players joined.\n\
        > *howl* hosts social deduction games in your rooms.",
        commands
    )
}

/// Formats the hint sent for an unknown command.
///
/// # Examples
///
/// ```
/// let msg = format_unknown_command("w.");
/// assert!(msg.contains("w.help"));
/// ```
pub fn format_unknown_command(prefix: &str) -> String {
    format!(
        "Unknown command. Type `{}help` for more information.",
        prefix
    )
}

/// Formats the reply to invalid arguments.
pub fn format_usage(usage: &str) -> String {
    format!("Invalid arguments. Usage: {}", usage)
}

pub fn format_signed_up(
    user_id: &str,
    session: &Session,
    limits: PlayerLimits,
    opened: bool,
) -> String {
    let count = format_player_count(session.signed_up_players().len(), limits);
    match opened {
        true => format!(
            "Signups are open! `{}` is the first player {}.",
            user_id, count
        ),
        false => format!("`{}` signed up {}.", user_id, count),
    }
}

pub fn format_unsigned_up(user_id: &str, session: &Session, limits: PlayerLimits) -> String {
    format!(
        "`{}` left the signups {}.",
        user_id,
        format_player_count(session.signed_up_players().len(), limits)
    )
}

pub fn format_game_started(handle: &GameHandle, players: &[String]) -> String {
    format!(
        "The game **{}** has started with {} players: {}",
        handle,
        players.len(),
        format_users(players)
    )
}

pub fn format_cancelled(actor_id: &str) -> String {
    format!("Signups were cancelled by `{}`.", actor_id)
}

/// Formats the `signups` listing of a channel.
pub fn format_signups(session: Option<&Session>, limits: PlayerLimits, prefix: &str) -> String {
    let Some(session) = session else {
        return format!(
            "No game in this channel. Type `{}signup` to open signups.",
            prefix
        );
    };

    let players = match session.signed_up_players().is_empty() {
        true => "nobody yet".to_owned(),
        false => format_users(session.signed_up_players()),
    };

    format!(
        "Session {} is **{}**, opened by `{}`.\n\n\
        **players** {}: {}\n\n\
        A game needs between {} and {} players.",
        session.id(),
        session.state(),
        session.creator_id(),
        format_player_count(session.signed_up_players().len(), limits),
        players,
        limits.min,
        limits.max
    )
}

pub fn format_game_ended(outcome: &GameOutcome) -> String {
    match outcome.winners.is_empty() {
        true => format!("The game is over, the **{}** won.", outcome.faction),
        false => format!(
            "The game is over, the **{}** won! Congratulations to {}.",
            outcome.faction,
            format_users(&outcome.winners)
        ),
    }
}

pub fn format_idle_expired(idle_timeout: Duration) -> String {
    format!(
        "Signups were closed after {} without activity.",
        format_duration(idle_timeout)
    )
}

/// Formats the statistics of a guild along with its live sessions.
pub fn format_guild_stats(guild_id: &str, stats: &GuildStats, live_sessions: usize) -> String {
    let mut body = format!(
        "Statistics of **{}**:\n\n\
        - **games played**: {}\n\
        - **live sessions**: {}\n\
        - **players seen**: {}",
        guild_id,
        stats.games_played,
        live_sessions,
        stats.players_seen.len()
    );

    if !stats.wins_by_faction.is_empty() {
        let factions = stats
            .wins_by_faction
            .iter()
            .map(|(faction, wins)| format!("{} {}", faction, wins))
            .collect::<Vec<String>>()
            .join(", ");
        body.push_str(&format!("\n- **wins**: {}", factions));
    }

    if let Some((channel_id, games)) = stats
        .games_by_channel
        .iter()
        .max_by_key(|(channel_id, games)| (**games, std::cmp::Reverse(*channel_id)))
    {
        body.push_str(&format!(
            "\n- **most active channel**: `{}` ({} games)",
            channel_id, games
        ));
    }

    body
}

/// Formats a dispatch failure.
pub fn format_error(error: &DispatchError, prefix: &str) -> String {
    match error {
        DispatchError::UnknownCommand(_) => format_unknown_command(prefix),
        DispatchError::InvalidArguments(name) => format!(
            "Invalid arguments. Type `{}help {}` for the usage.",
            prefix, name
        ),
        DispatchError::NoSession => format!(
            "No game in this channel. Type `{}signup` to open signups.",
            prefix
        ),
        DispatchError::Session(error) => format_session_error(error, prefix),
    }
}

fn format_session_error(error: &SessionError, prefix: &str) -> String {
    match error {
        SessionError::AlreadySignedUp => "You are already signed up.".to_owned(),
        SessionError::NotSignedUp => "You are not signed up.".to_owned(),
        SessionError::SessionFull { max } => {
            format!("Signups are full ({} players).", max)
        }
        SessionError::NotEnoughPlayers { signed_up, min } => format!(
            "Not enough players to start: {} signed up, at least {} needed.",
            signed_up, min
        ),
        SessionError::WrongState(SessionState::Running) => {
            "A game is running in this channel.".to_owned()
        }
        SessionError::WrongState(state) => format!("Not possible while the session is {}.", state),
        SessionError::SessionGone => format!(
            "This session is over. Type `{}signup` to open new signups.",
            prefix
        ),
        SessionError::Setup(reason) => {
            format!("The game could not be set up, signups are closed: {}", reason)
        }
        SessionError::Unauthorized => "You are not allowed to do that.".to_owned(),
    }
}

fn format_player_count(count: usize, limits: PlayerLimits) -> String {
    format!("({}/{})", count, limits.max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::SessionId;
    use std::collections::{BTreeMap, BTreeSet};

    const LIMITS: PlayerLimits = PlayerLimits { min: 2, max: 10 };

    fn session_with(players: &[&str]) -> Session {
        let mut session = Session::new(
            SessionId(7),
            "!room:example.org",
            "example.org",
            "@alice:example.org",
        );
        for player in players {
            session.signup(player, LIMITS).unwrap();
        }
        session
    }

    #[test]
    fn test_format_help_lists_usages() {
        let help = format_help(&["`w.signup`: sign up".to_owned(), "`w.start`: start".to_owned()]);

        assert!(help.starts_with("Commands:\n- `w.signup`: sign up\n- `w.start`: start"));
    }

    #[test]
    fn test_format_unknown_command_uses_prefix() {
        assert_eq!(
            format_unknown_command("w."),
            "Unknown command. Type `w.help` for more information."
        );
    }

    #[test]
    fn test_format_signed_up() {
        let session = session_with(&["@alice:example.org"]);

        assert_eq!(
            format_signed_up("@alice:example.org", &session, LIMITS, true),
            "Signups are open! `@alice:example.org` is the first player (1/10)."
        );
        assert_eq!(
            format_signed_up("@alice:example.org", &session, LIMITS, false),
            "`@alice:example.org` signed up (1/10)."
        );
    }

    #[test]
    fn test_format_signups_without_session() {
        assert!(format_signups(None, LIMITS, "w.").contains("`w.signup`"));
    }

    #[test]
    fn test_format_signups_with_players() {
        let session = session_with(&["@alice:example.org", "@bob:example.org"]);
        let listing = format_signups(Some(&session), LIMITS, "w.");

        assert!(listing.contains("Session #7 is **in signup**"));
        assert!(listing.contains("(2/10): `@alice:example.org`, `@bob:example.org`"));
        assert!(listing.contains("between 2 and 10 players"));
    }

    #[test]
    fn test_format_signups_empty_session() {
        let session = session_with(&[]);
        assert!(format_signups(Some(&session), LIMITS, "w.").contains("nobody yet"));
    }

    #[test]
    fn test_format_game_ended() {
        let outcome = GameOutcome {
            faction: "wolves".to_owned(),
            winners: vec!["@bob:example.org".to_owned()],
        };
        assert_eq!(
            format_game_ended(&outcome),
            "The game is over, the **wolves** won! Congratulations to `@bob:example.org`."
        );
    }

    #[test]
    fn test_format_idle_expired() {
        assert_eq!(
            format_idle_expired(Duration::from_secs(1800)),
            "Signups were closed after 30m without activity."
        );
    }

    #[test]
    fn test_format_guild_stats() {
        let stats = GuildStats {
            games_played: 3,
            players_seen: BTreeSet::from(["@a:example.org".to_owned()]),
            wins_by_faction: BTreeMap::from([
                ("village".to_owned(), 2),
                ("wolves".to_owned(), 1),
            ]),
            games_by_channel: BTreeMap::from([
                ("!one:example.org".to_owned(), 1),
                ("!two:example.org".to_owned(), 2),
            ]),
        };

        let body = format_guild_stats("example.org", &stats, 4);

        assert!(body.contains("Statistics of **example.org**"));
        assert!(body.contains("**games played**: 3"));
        assert!(body.contains("**live sessions**: 4"));
        assert!(body.contains("**wins**: village 2, wolves 1"));
        assert!(body.contains("**most active channel**: `!two:example.org` (2 games)"));
    }

    #[test]
    fn test_format_guild_stats_empty() {
        let body = format_guild_stats("example.org", &GuildStats::default(), 0);

        assert!(body.contains("**games played**: 0"));
        assert!(!body.contains("**wins**"));
        assert!(!body.contains("most active channel"));
    }

    #[test]
    fn test_format_error_covers_session_errors() {
        let errors = [
            SessionError::AlreadySignedUp,
            SessionError::NotSignedUp,
            SessionError::SessionFull { max: 10 },
            SessionError::NotEnoughPlayers { signed_up: 1, min: 2 },
            SessionError::WrongState(SessionState::Starting),
            SessionError::SessionGone,
            SessionError::Setup("engine down".to_owned()),
            SessionError::Unauthorized,
        ];

        for error in errors {
            let message = format_error(&DispatchError::Session(error), "w.");
            assert!(!message.is_empty());
        }

        assert_eq!(
            format_error(
                &DispatchError::Session(SessionError::WrongState(SessionState::Running)),
                "w."
            ),
            "A game is running in this channel."
        );
        let error = DispatchError::Session(SessionError::Setup("engine down".to_owned()));
        assert!(format_error(&error, "w.").ends_with("engine down"));
    }

    #[test]
    fn test_format_error_no_session_points_to_signup() {
        assert!(format_error(&DispatchError::NoSession, "w.").contains("`w.signup`"));
    }
}
