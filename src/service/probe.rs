//! WHOIS-based online check.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::sync::oneshot;
use tracing::{debug, instrument, warn};

use super::chat::ChatClient;

type Waiters = HashMap<String, Vec<oneshot::Sender<bool>>>;

/// Asks the server whether a nick is connected.
///
/// Pending probes are keyed by case-folded nick. The first caller for a nick
/// sends the `WHOIS`; callers that arrive while it is outstanding wait on the
/// same reply. This is trivially cloneable.
#[derive(Clone)]
pub struct OnlineProbe {
    chat: ChatClient,
    waiters: Arc<Mutex<Waiters>>,
}

impl OnlineProbe {
    pub fn new(chat: ChatClient) -> Self {
        Self {
            chat,
            waiters: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns `true` if a WHOIS reply for `nickname` arrives within `timeout`.
    ///
    /// A timeout, a failed send and a "no such nick" reply all count as offline.
    #[instrument(skip(self))]
    pub async fn is_online(&self, nickname: &str, timeout: Duration) -> bool {
        let key = fold(nickname);
        let (tx, rx) = oneshot::channel();

        let first = {
            let mut waiters = self.lock();
            let slot = waiters.entry(key.clone()).or_default();
            slot.push(tx);
            slot.len() == 1
        };

        if first && let Err(err) = self.chat.send_raw(&format!("WHOIS {nickname}")).await {
            warn!("Could not send WHOIS for {}: {}", nickname, err);
            self.resolve(nickname, false);
        }

        let online = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(online)) => online,
            Ok(Err(_)) => false,
            Err(_) => {
                debug!("No WHOIS reply for {} within {:?}", nickname, timeout);
                false
            }
        };

        self.prune(&key);

        online
    }

    /// Complete every pending probe for `nickname`.
    pub fn resolve(&self, nickname: &str, online: bool) {
        let senders = self.lock().remove(&fold(nickname)).unwrap_or_default();

        for sender in senders {
            let _ = sender.send(online);
        }
    }

    /// Number of nicks with a probe in flight.
    #[cfg(test)]
    fn in_flight(&self) -> usize {
        self.lock().len()
    }

    /// Drop waiters whose caller has given up.
    fn prune(&self, key: &str) {
        let mut waiters = self.lock();

        if let Some(slot) = waiters.get_mut(key) {
            slot.retain(|sender| !sender.is_closed());

            if slot.is_empty() {
                waiters.remove(key);
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Waiters> {
        self.waiters.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// IRC nicks compare case-insensitively.
fn fold(nickname: &str) -> String {
    nickname.to_lowercase()
}
