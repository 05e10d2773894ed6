//! Migrator engine: export loading, media transfer and note publishing.
mod attachments;
mod engine;
mod export;
mod fetch;
mod identity;
mod note;
mod persist;
mod publish;
mod store;
mod types;

pub use attachments::{effective_mime_type, upload_attachments, AttachmentRecord, MediaRef};
pub use engine::EngineHandle;
pub use export::{load_export, parse_export};
pub use fetch::{
    ChannelProgressSink, FetchSettings, Fetcher, NullProgressSink, ProgressSink, ReqwestFetcher,
};
pub use identity::{
    ChainBackend, ChainError, CharacterId, LedgerChain, LedgerNote, Signer, SigningContext,
    TxReceipt,
};
pub use note::{external_link, publish_timestamp, NoteDocument};
pub use persist::{ensure_state_dir, AtomicFileWriter, PersistError};
pub use publish::{NotePublisher, PublishSettings, Publisher};
pub use store::{ContentStore, IpfsRelayStore, LocalContentStore, StoreError};
pub use types::{
    EngineEvent, FailureKind, FetchError, FetchMetadata, FetchOutput, IdentityOutcome,
    IdentityRequest, MigrateError, PublishProgress, PublishReceipt, Stage,
};
