//! Signing context and on-chain backends.
//!
//! The [`SigningContext`] owns the loaded key and the character notes are
//! posted under. Every chain call goes through it so a missing key or
//! character is reported as a precondition failure before anything is sent.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;

use engine_logging::{engine_info, engine_warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::persist::{AtomicFileWriter, PersistError};
use crate::store::sha256_hex;
use crate::MigrateError;
use migrator_core::MessageId;

pub type CharacterId = u64;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("{0}")]
    NotInitialized(String),
    #[error("invalid private key: {0}")]
    InvalidKey(String),
    #[error("transaction rejected: {0}")]
    Rejected(String),
    #[error("chain backend unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

impl ChainError {
    /// Maps into the driver's error kinds; note posts name the message they were for.
    pub fn into_migrate(self, message_id: Option<MessageId>) -> MigrateError {
        match (self, message_id) {
            (err @ (ChainError::NotInitialized(_) | ChainError::InvalidKey(_)), _) => {
                MigrateError::Precondition(err.to_string())
            }
            (err, Some(message_id)) => MigrateError::Publish {
                message_id,
                message: err.to_string(),
            },
            (err, None) => MigrateError::Chain(err.to_string()),
        }
    }
}

/// A loaded signing key and the address derived from it.
#[derive(Clone)]
pub struct Signer {
    address: String,
    key: String,
}

impl Signer {
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("address", &self.address)
            .field("key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: String,
    pub note_id: Option<u64>,
}

/// The on-chain side of the social graph.
#[async_trait::async_trait]
pub trait ChainBackend: Send + Sync {
    /// Validates a private key and derives the signer address from it.
    fn load_key(&self, private_key: &str) -> Result<Signer, ChainError>;

    async fn is_operator(
        &self,
        character: CharacterId,
        operator: &str,
    ) -> Result<bool, ChainError>;

    async fn add_operator(
        &self,
        signer: &Signer,
        character: CharacterId,
        operator: &str,
    ) -> Result<TxReceipt, ChainError>;

    async fn remove_operator(
        &self,
        signer: &Signer,
        character: CharacterId,
        operator: &str,
    ) -> Result<TxReceipt, ChainError>;

    async fn post_note(
        &self,
        signer: &Signer,
        character: CharacterId,
        content_uri: &str,
    ) -> Result<TxReceipt, ChainError>;
}

pub struct SigningContext {
    backend: Box<dyn ChainBackend>,
    signer: Option<Signer>,
    character: Option<CharacterId>,
}

impl SigningContext {
    pub fn new(backend: Box<dyn ChainBackend>) -> Self {
        Self {
            backend,
            signer: None,
            character: None,
        }
    }

    pub fn init_with_private_key(&mut self, private_key: &str) -> Result<String, ChainError> {
        let private_key = private_key.trim();
        if private_key.is_empty() {
            return Err(ChainError::NotInitialized(
                "no private key supplied".to_string(),
            ));
        }
        let signer = self.backend.load_key(private_key)?;
        let address = signer.address().to_string();
        engine_info!("Signing context initialized for {}", address);
        self.signer = Some(signer);
        Ok(address)
    }

    pub fn select_character(&mut self, character: CharacterId) {
        self.character = Some(character);
    }

    pub fn character(&self) -> Option<CharacterId> {
        self.character
    }

    pub fn is_ready(&self) -> bool {
        self.signer.is_some() && self.character.is_some()
    }

    /// Fails with the error a note post would hit when the key or character is missing.
    pub fn ensure_ready(&self) -> Result<(), ChainError> {
        self.scoped().map(|_| ())
    }

    pub fn signer_address(&self) -> Result<String, ChainError> {
        Ok(self.signer()?.address().to_string())
    }

    fn signer(&self) -> Result<&Signer, ChainError> {
        self.signer.as_ref().ok_or_else(|| {
            ChainError::NotInitialized("signing context is not initialized".to_string())
        })
    }

    fn scoped(&self) -> Result<(&Signer, CharacterId), ChainError> {
        let signer = self.signer()?;
        let character = self.character.ok_or_else(|| {
            ChainError::NotInitialized("no target character selected".to_string())
        })?;
        Ok((signer, character))
    }

    pub async fn check_operator(&self, operator: &str) -> Result<bool, ChainError> {
        let (_, character) = self.scoped()?;
        self.backend.is_operator(character, operator).await
    }

    pub async fn add_operator(&self, operator: &str) -> Result<TxReceipt, ChainError> {
        let (signer, character) = self.scoped()?;
        self.backend.add_operator(signer, character, operator).await
    }

    pub async fn remove_operator(&self, operator: &str) -> Result<TxReceipt, ChainError> {
        let (signer, character) = self.scoped()?;
        self.backend.remove_operator(signer, character, operator).await
    }

    pub async fn post_note(&self, content_uri: &str) -> Result<TxReceipt, ChainError> {
        let (signer, character) = self.scoped()?;
        self.backend.post_note(signer, character, content_uri).await
    }
}

const LEDGER_FILENAME: &str = "ledger.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerNote {
    pub note_id: u64,
    pub character_id: CharacterId,
    pub signer: String,
    pub content_uri: String,
    pub transaction_hash: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LedgerState {
    #[serde(default)]
    operators: BTreeMap<CharacterId, BTreeSet<String>>,
    #[serde(default)]
    notes: Vec<LedgerNote>,
    #[serde(default)]
    transactions: u64,
}

/// Local dry-run chain: records transactions in a JSON ledger instead of broadcasting them.
pub struct LedgerChain {
    writer: Option<AtomicFileWriter>,
    state: Mutex<LedgerState>,
}

impl LedgerChain {
    /// Opens or creates `ledger.json` in `dir`.
    pub fn open(dir: PathBuf) -> Result<Self, ChainError> {
        let path = dir.join(LEDGER_FILENAME);
        let state = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|err| ChainError::Unavailable(format!("{}: {err}", path.display())))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => LedgerState::default(),
            Err(err) => return Err(ChainError::Persist(PersistError::Io(err))),
        };
        Ok(Self {
            writer: Some(AtomicFileWriter::new(dir)),
            state: Mutex::new(state),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            writer: None,
            state: Mutex::new(LedgerState::default()),
        }
    }

    pub fn notes(&self) -> Vec<LedgerNote> {
        self.lock().notes.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Applies `apply` to a copy of the ledger and keeps it only once it is on disk.
    fn transact<R>(
        &self,
        apply: impl FnOnce(&mut LedgerState) -> Result<R, ChainError>,
    ) -> Result<R, ChainError> {
        let mut guard = self.lock();
        let mut next = guard.clone();
        let result = apply(&mut next)?;
        if let Some(writer) = &self.writer {
            let text = serde_json::to_string_pretty(&next)
                .map_err(|err| ChainError::Persist(PersistError::Serialize(err.to_string())))?;
            writer.write(LEDGER_FILENAME, text)?;
        }
        *guard = next;
        Ok(result)
    }
}

impl LedgerState {
    /// Hash of a transaction signed with the signer's key.
    fn next_hash(&mut self, signer: &Signer, payload: &str) -> String {
        self.transactions += 1;
        let seed = format!("{}:{}:{}", signer.key, self.transactions, payload);
        format!("0x{}", sha256_hex(seed.as_bytes()))
    }
}

fn normalize_address(address: &str) -> Result<String, ChainError> {
    let hex = address.strip_prefix("0x").unwrap_or(address);
    if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ChainError::Rejected(format!("malformed address {address}")));
    }
    Ok(format!("0x{}", hex.to_ascii_lowercase()))
}

#[async_trait::async_trait]
impl ChainBackend for LedgerChain {
    fn load_key(&self, private_key: &str) -> Result<Signer, ChainError> {
        let hex = private_key.strip_prefix("0x").unwrap_or(private_key);
        if hex.len() != 64 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ChainError::InvalidKey(
                "expected 32 bytes of hex".to_string(),
            ));
        }
        let key = hex.to_ascii_lowercase();
        let digest = sha256_hex(key.as_bytes());
        Ok(Signer {
            address: format!("0x{}", &digest[..40]),
            key,
        })
    }

    async fn is_operator(
        &self,
        character: CharacterId,
        operator: &str,
    ) -> Result<bool, ChainError> {
        let operator = normalize_address(operator)?;
        Ok(self
            .lock()
            .operators
            .get(&character)
            .is_some_and(|set| set.contains(&operator)))
    }

    async fn add_operator(
        &self,
        signer: &Signer,
        character: CharacterId,
        operator: &str,
    ) -> Result<TxReceipt, ChainError> {
        let operator = normalize_address(operator)?;
        let hash = self.transact(|state| {
            state
                .operators
                .entry(character)
                .or_default()
                .insert(operator.clone());
            Ok(state.next_hash(
                signer,
                &format!("grant:{}:{character}:{operator}", signer.address()),
            ))
        })?;
        engine_info!("Ledger: granted {} on character {}", operator, character);
        Ok(TxReceipt {
            transaction_hash: hash,
            note_id: None,
        })
    }

    async fn remove_operator(
        &self,
        signer: &Signer,
        character: CharacterId,
        operator: &str,
    ) -> Result<TxReceipt, ChainError> {
        let operator = normalize_address(operator)?;
        let (removed, hash) = self.transact(|state| {
            let removed = state
                .operators
                .get_mut(&character)
                .is_some_and(|set| set.remove(&operator));
            let hash = state.next_hash(
                signer,
                &format!("revoke:{}:{character}:{operator}", signer.address()),
            );
            Ok((removed, hash))
        })?;
        if !removed {
            engine_warn!("Ledger: {} was not an operator of {}", operator, character);
        }
        Ok(TxReceipt {
            transaction_hash: hash,
            note_id: None,
        })
    }

    async fn post_note(
        &self,
        signer: &Signer,
        character: CharacterId,
        content_uri: &str,
    ) -> Result<TxReceipt, ChainError> {
        if content_uri.is_empty() {
            return Err(ChainError::Rejected("empty content uri".to_string()));
        }
        self.transact(|state| {
            let note_id = state
                .notes
                .iter()
                .filter(|n| n.character_id == character)
                .count() as u64
                + 1;
            let hash = state.next_hash(
                signer,
                &format!("note:{}:{character}:{content_uri}", signer.address()),
            );
            state.notes.push(LedgerNote {
                note_id,
                character_id: character,
                signer: signer.address().to_string(),
                content_uri: content_uri.to_string(),
                transaction_hash: hash.clone(),
            });
            Ok(TxReceipt {
                transaction_hash: hash,
                note_id: Some(note_id),
            })
        })
    }
}
