//! Bot wiring.
//!
//! This module provides the [`Bot`] that connects the Matrix client to the
//! command dispatcher and runs the background tasks.
//!
//! # Architecture
//!
//! Once started, the bot runs three concurrent activities:
//!
//! 1. **Matrix sync**: every inbound message is dispatched on its own task and
//!    the reply, if any, is sent back to the channel.
//! 2. **Idle sweeper**: reclaims signups left without activity.
//! 3. **Game watcher**: polls the rules engine for finished games.
//!
//! ```text
//! Matrix message → Dispatcher → Session registry → Reply → Matrix room
//! ```

use std::{sync::Arc, time::Duration};

use log::info;

use crate::{
    chat::{ChatTransport, InboundMessage},
    commands::{CommandSettings, Dispatcher},
    config::Config,
    game::{GameWatcher, HttpRulesEngine},
    matrix::MatrixClient,
    sessions::{IdleSweeper, SessionRegistry},
    stats::JsonStatsStore,
    utils::get_path,
};

pub struct Bot {
    matrix_client: Arc<MatrixClient>,
    dispatcher: Arc<Dispatcher>,
    idle_sweeper: IdleSweeper,
    sweep_interval: Duration,
    game_watcher: GameWatcher,
    polling_interval: Duration,
}

impl Bot {
    /// Creates the bot from the configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Loaded configuration
    /// * `data_path` - Directory holding the Matrix login (`matrix/`) and the
    ///   statistics file (`stats`)
    ///
    /// # Errors
    ///
    /// Returns an error if the Matrix client cannot log in.
    pub async fn new(config: Config, data_path: &str) -> Result<Self, anyhow::Error> {
        let matrix_client =
            Arc::new(MatrixClient::new(&config.matrix, &get_path(data_path, "matrix")).await?);

        let sessions = Arc::new(SessionRegistry::new());
        let rules_engine = Arc::new(HttpRulesEngine::new(&config.rules_engine.url));
        let stats = Arc::new(JsonStatsStore::load(get_path(data_path, "stats")).await);

        let dispatcher = Arc::new(Dispatcher::new(
            CommandSettings::from(&config),
            Arc::clone(&sessions),
            rules_engine,
            stats,
        ));

        let idle_sweeper = IdleSweeper::new(
            sessions,
            config.session.idle_timeout(),
            config.session.notify_on_idle,
        );
        let game_watcher = GameWatcher::new(
            Arc::clone(&dispatcher),
            config.rules_engine.poll_timeout(),
        );

        Ok(Bot {
            matrix_client,
            dispatcher,
            idle_sweeper,
            sweep_interval: config.session.sweep_interval(),
            game_watcher,
            polling_interval: config.rules_engine.polling_interval(),
        })
    }

    /// Starts the background tasks, then syncs with Matrix until the
    /// connection is lost for good.
    pub async fn start(self) {
        info!("starting bot");
        let transport: Arc<dyn ChatTransport> = self.matrix_client.clone();

        self.idle_sweeper
            .start(self.sweep_interval, Arc::clone(&transport));
        self.game_watcher
            .start(self.polling_interval, Arc::clone(&transport));

        let dispatcher = Arc::clone(&self.dispatcher);
        let on_message = move |message: InboundMessage| {
            let dispatcher = Arc::clone(&dispatcher);
            let transport = Arc::clone(&transport);
            tokio::spawn(async move {
                Bot::handle_message(&dispatcher, transport.as_ref(), message).await;
            });
        };

        self.matrix_client.sync(on_message).await;
    }

    /// Dispatches `message` and sends the reply back to its channel.
    async fn handle_message(
        dispatcher: &Dispatcher,
        transport: &dyn ChatTransport,
        message: InboundMessage,
    ) {
        if let Some(reply) = dispatcher.dispatch(&message).await {
            transport.send_message(&reply.channel_id, &reply.body).await;
        }
    }
}
