use serde::{Deserialize, Serialize};
use stellar_trezor_tx::{strkey, Capabilities, DeviceTransaction};
use tokio::sync::{broadcast, mpsc, Mutex};

use crate::{
    errors::{Error, Result},
    ledger_tx::{DecoratedSignature, LedgerTransaction},
    oracle::{AccountEffect, AccountOracle},
    path::Account,
    transport::{DeviceEvent, SignRequest, Transport},
};

/// Notifications sent to the subscribers of a [TrezorSession]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionEvent {
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, Default)]
struct SessionState {
    path: Option<String>,
    public_key: Option<String>,
    /// Bumped on every reset, so an answer requested before a disconnection
    /// is never committed after it
    generation: u64,
}

impl SessionState {
    fn reset(&mut self) {
        self.path = None;
        self.public_key = None;
        self.generation += 1;
    }
}

/// An account found by [TrezorSession::scan_accounts]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedAccount {
    pub number: u32,
    pub path: String,
    pub public_key: String,
    pub last_effect: AccountEffect,
}

/// A connection to one Trezor device.
///
/// Device requests queue on `device`, so there is never more than one request
/// waiting on the device. `state` is only locked to read or commit the
/// connection, never across a device request.
pub struct TrezorSession<T: Transport> {
    transport: T,
    capabilities: Capabilities,
    device: Mutex<()>,
    state: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl<T: Transport> core::fmt::Debug for TrezorSession<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TrezorSession")
            .field("capabilities", &self.capabilities)
            .field("state", &self.state)
            .finish()
    }
}

impl<T: Transport> TrezorSession<T> {
    pub fn new(transport: T) -> Self {
        Self::with_capabilities(transport, Capabilities::default())
    }

    pub fn with_capabilities(transport: T, capabilities: Capabilities) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            transport,
            capabilities,
            device: Mutex::new(()),
            state: Mutex::new(SessionState::default()),
            events,
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Register the application in the Trezor Connect manifest.
    pub fn register(&self, app_url: &str, email: &str) {
        self.transport.manifest(app_url, email);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Account id of the connected account
    pub async fn public_key(&self) -> Option<String> {
        self.state.lock().await.public_key.clone()
    }

    /// Derivation path of the connected account
    pub async fn path(&self) -> Option<String> {
        self.state.lock().await.path.clone()
    }

    async fn snapshot(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    fn notify(&self, event: SessionEvent) {
        log::info!("Trezor {event:?}");
        // No subscriber is not an error
        self.events.send(event).ok();
    }

    /// Connect to `account`, or to the current account if `None` (account 1
    /// when there is none). Returns the account id.
    ///
    /// Calling it again on an established connection does not reach the
    /// device. Calling it with another account switches to that account
    /// without a prior [TrezorSession::disconnect].
    pub async fn connect(&self, account: Option<Account>) -> Result<String> {
        let _device = self.device.lock().await;
        let snapshot = self.snapshot().await;
        let path = match (account, &snapshot.path) {
            (Some(account), _) => account.derivation_path()?,
            (None, Some(path)) => path.clone(),
            (None, None) => Account::default().derivation_path()?,
        };

        if snapshot.path.as_ref() == Some(&path) {
            if let Some(public_key) = snapshot.public_key {
                log::debug!("Trezor already connected to {path}");
                return Ok(public_key);
            }
        }

        log::info!("Attempting Trezor connection on {path}...");
        let payload = self
            .transport
            .get_address(&path, false)
            .await
            .into_result()?;
        strkey::raw_public_key(&payload.address)
            .map_err(|_| Error::InvalidPublicKey(payload.address.clone()))?;

        {
            let mut state = self.state.lock().await;
            if state.generation != snapshot.generation {
                log::warn!("Trezor disconnected while connecting to {path}");
                return Err(Error::ConnectionClosed);
            }
            state.path = Some(path);
            state.public_key = Some(payload.address.clone());
        }
        self.notify(SessionEvent::Connected);
        Ok(payload.address)
    }

    /// Have the user review `transaction` on the device and append the
    /// resulting signature to it.
    pub async fn sign<L>(&self, transaction: &mut L) -> Result<DecoratedSignature>
    where
        L: LedgerTransaction + Send,
    {
        let _device = self.device.lock().await;
        let SessionState {
            path: Some(path),
            public_key: Some(public_key),
            ..
        } = self.snapshot().await
        else {
            return Err(Error::NotConnected);
        };

        let descriptor = transaction.descriptor()?;
        let device_tx = DeviceTransaction::try_from((&descriptor, &self.capabilities))?;
        let request = SignRequest {
            path,
            network_passphrase: transaction.network_passphrase().to_owned(),
            transaction: device_tx,
        };
        log::debug!(
            "Trezor sign request: {}",
            serde_json::to_string(&request).unwrap_or_default()
        );

        let payload = self
            .transport
            .sign_transaction(&request)
            .await
            .into_result()?;
        let signature = hex::decode(&payload.signature)
            .map_err(|_| Error::InvalidSignature(payload.signature.clone()))?;
        let hint = strkey::signature_hint(&public_key)
            .map_err(|_| Error::InvalidPublicKey(public_key.clone()))?;

        let decorated = DecoratedSignature { hint, signature };
        transaction.add_signature(decorated.clone());
        log::info!("Transaction signed by {public_key}");
        Ok(decorated)
    }

    /// Close the connection, or stop waiting for one.
    pub async fn disconnect(&self) {
        if let Err(e) = self.transport.cancel() {
            log::warn!("Could not cancel the pending Trezor request: {e}");
        }
        self.state.lock().await.reset();
        self.notify(SessionEvent::Disconnected);
    }

    pub async fn handle_device_event(&self, event: DeviceEvent) {
        log::debug!("Trezor device event: {event:?}");
        match event {
            DeviceEvent::DeviceConnect => self.notify(SessionEvent::Connected),
            DeviceEvent::DeviceDisconnect => {
                self.state.lock().await.reset();
                self.notify(SessionEvent::Disconnected);
            }
        }
    }

    /// Process device events until every sender of `events` is dropped.
    pub async fn watch_device_events(&self, mut events: mpsc::Receiver<DeviceEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_device_event(event).await;
        }
        log::debug!("Trezor device event stream closed");
    }

    /// List the used accounts of the device, starting at account 1, stopping
    /// at the first account `oracle` knows nothing about or after `max`
    /// accounts. The connection state is not modified.
    pub async fn scan_accounts<O: AccountOracle>(
        &self,
        oracle: &O,
        max: u32,
    ) -> Result<Vec<ScannedAccount>> {
        let _device = self.device.lock().await;
        let mut accounts = Vec::new();
        for number in 1..=max {
            let path = Account::Number(number).derivation_path()?;
            let payload = self
                .transport
                .get_address(&path, false)
                .await
                .into_result()?;
            let Some(last_effect) = oracle.last_effect(&payload.address).await? else {
                log::debug!("Account {number} ({}) is unused", payload.address);
                break;
            };
            accounts.push(ScannedAccount {
                number,
                path,
                public_key: payload.address,
                last_effect,
            });
        }
        Ok(accounts)
    }
}
