//! Login of the bot account.

use anyhow::{Context, anyhow};
use log::{debug, info};
use matrix_sdk::{Client, ruma::OwnedUserId};

use crate::{config, matrix::store::LoginStore};

/// Builds a client backed by the SQLite store of `store`.
async fn build_client(
    user_id: &OwnedUserId,
    credentials: &config::Matrix,
    store: &LoginStore,
) -> anyhow::Result<Client> {
    let client = Client::builder()
        .server_name(user_id.server_name())
        .sqlite_store(store.sqlite_path(), Some(&credentials.passphrase))
        .build()
        .await?;

    debug!("matrix client built for {}", user_id);
    Ok(client)
}

/// Logs in with the password and saves the resulting session.
async fn login(credentials: &config::Matrix, store: &LoginStore) -> anyhow::Result<Client> {
    info!("logging in as {}", credentials.user_id);

    let user_id: OwnedUserId = credentials.user_id.as_str().try_into()?;
    let client = build_client(&user_id, credentials, store).await?;

    client
        .matrix_auth()
        .login_username(&user_id, &credentials.password)
        .initial_device_display_name("howl bot")
        .send()
        .await?;

    let user_session = client
        .matrix_auth()
        .session()
        .ok_or_else(|| anyhow!("no session after login"))?;
    store
        .save_user_session(&user_session)
        .await
        .context("failed to save the matrix session")?;

    info!("logged in as {}", credentials.user_id);
    Ok(client)
}

/// Restores the session saved by a previous [`login`].
async fn restore(credentials: &config::Matrix, store: &LoginStore) -> anyhow::Result<Client> {
    info!("restoring matrix session of {}", credentials.user_id);

    let user_session = store
        .user_session()
        .ok_or_else(|| anyhow!("no saved matrix session"))?;
    let client = build_client(&user_session.meta.user_id, credentials, store).await?;
    client.restore_session(user_session.clone()).await?;

    info!("matrix session restored");
    Ok(client)
}

/// Returns a logged in client, restoring the saved session when there is one.
pub async fn connect(credentials: &config::Matrix, store: &LoginStore) -> anyhow::Result<Client> {
    if store.user_session().is_some() {
        restore(credentials, store).await
    } else {
        login(credentials, store).await
    }
}
