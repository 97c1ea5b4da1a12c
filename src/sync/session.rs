//! The owned, async handle to the vault of this process.
//!
//! `Session` pairs the single `VaultStore` with the `SyncCoordinator`.
//! Every operation waits its turn on a FIFO mutex, does its KDF/AEAD
//! work on the blocking pool, and publishes its event before releasing
//! the lock, so mutations never overlap and broadcasts leave in the
//! order the mutations happened.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;
use zeroize::Zeroizing;

use super::coordinator::SyncCoordinator;
use super::protocol::{Command, Event, Response};
use crate::errors::{Result, VaultFillError};
use crate::vault::{AccountSession, VaultRecord, VaultStore};

#[derive(Clone)]
pub struct Session {
    store: Arc<Mutex<VaultStore>>,
    coordinator: SyncCoordinator,
}

impl Session {
    pub fn new(store: VaultStore, coordinator: SyncCoordinator) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            coordinator,
        }
    }

    /// The coordinator listening contexts subscribe to and query.
    pub fn coordinator(&self) -> &SyncCoordinator {
        &self.coordinator
    }

    /// Unlock an account, then announce the login and its entries.
    pub async fn login(&self, email: String, password: Zeroizing<String>) -> Result<AccountSession> {
        self.with_store(move |store, coordinator| {
            let was_unlocked = store.is_unlocked();
            let result = store.login(&email, password.as_bytes());
            match &result {
                Ok(session) => {
                    coordinator.publish(Event::Login {
                        email: session.email.clone(),
                    });
                    coordinator.publish(Event::EntriesChanged {
                        entries: store.entries().to_vec(),
                    });
                }
                // `login` always ends the previous session first.
                Err(_) if was_unlocked => {
                    coordinator.publish(Event::Logout);
                }
                Err(_) => {}
            }
            result
        })
        .await
    }

    /// Lock the vault and tell every context.
    pub async fn logout(&self) -> Result<()> {
        self.with_store(|store, coordinator| {
            if store.logout() {
                coordinator.publish(Event::Logout);
            }
            Ok(())
        })
        .await
    }

    pub async fn add_entry(&self, platform: String, username: String, secret: Zeroizing<String>) -> Result<VaultRecord> {
        self.with_store(move |store, coordinator| {
            let record = store.add_entry(&platform, &username, &secret)?;
            publish_entries(store, coordinator);
            Ok(record)
        })
        .await
    }

    pub async fn edit_entry(
        &self,
        id: String,
        platform: String,
        username: String,
        secret: Zeroizing<String>,
    ) -> Result<VaultRecord> {
        self.with_store(move |store, coordinator| {
            let record = store.edit_entry(&id, &platform, &username, &secret)?;
            publish_entries(store, coordinator);
            Ok(record)
        })
        .await
    }

    /// Delete entry `id`. Returns how many entries remain.
    pub async fn delete_entry(&self, id: String) -> Result<usize> {
        self.with_store(move |store, coordinator| {
            store.delete_entry(&id)?;
            publish_entries(store, coordinator);
            Ok(store.entry_count())
        })
        .await
    }

    /// Re-read the stored envelope and re-announce the entries.
    pub async fn reload(&self) -> Result<usize> {
        self.with_store(|store, coordinator| {
            let count = store.load_entries()?.len();
            publish_entries(store, coordinator);
            Ok(count)
        })
        .await
    }

    /// Execute one owner command from the wire.
    pub async fn execute(&self, command: Command) -> Response {
        debug!(?command, "executing command");
        let result = match command {
            Command::Login { email, password } => self
                .login(email, Zeroizing::new(password))
                .await
                .map(|s| Response::Ok {
                    entry_count: s.entry_count,
                }),
            Command::Logout => self.logout().await.map(|()| Response::Ok { entry_count: 0 }),
            Command::AddEntry {
                platform,
                username,
                secret,
            } => self
                .add_entry(platform, username, Zeroizing::new(secret))
                .await
                .map(|entry| Response::Entry { entry }),
            Command::EditEntry {
                id,
                platform,
                username,
                secret,
            } => self
                .edit_entry(id, platform, username, Zeroizing::new(secret))
                .await
                .map(|entry| Response::Entry { entry }),
            Command::DeleteEntry { id } => self
                .delete_entry(id)
                .await
                .map(|entry_count| Response::Ok { entry_count }),
        };
        result.unwrap_or_else(|e| Response::error(&e))
    }

    /// Run `op` with exclusive access to the store.
    ///
    /// The lock is taken in arrival order and held until `op` (including
    /// its publish) has finished on the blocking pool.
    async fn with_store<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut VaultStore, &SyncCoordinator) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut store = Arc::clone(&self.store).lock_owned().await;
        let coordinator = self.coordinator.clone();
        tokio::task::spawn_blocking(move || op(&mut store, &coordinator))
            .await
            .map_err(|e| VaultFillError::CryptoFault(format!("vault task failed: {e}")))?
    }
}

fn publish_entries(store: &VaultStore, coordinator: &SyncCoordinator) {
    coordinator.publish(Event::EntriesChanged {
        entries: store.entries().to_vec(),
    });
}
