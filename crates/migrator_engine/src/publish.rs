use std::sync::Arc;

use engine_logging::{engine_info, engine_warn};
use migrator_core::Message;

use crate::attachments::{upload_attachments, MediaRef};
use crate::fetch::{Fetcher, ProgressSink};
use crate::identity::SigningContext;
use crate::note::NoteDocument;
use crate::store::ContentStore;
use crate::{EngineEvent, MigrateError, PublishProgress, PublishReceipt, Stage};

#[derive(Debug, Clone)]
pub struct PublishSettings {
    /// Base of the external link back to the original post.
    pub channel_prefix: String,
    pub sources: Vec<String>,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            channel_prefix: "https://t.me".to_string(),
            sources: vec!["Telegram".to_string()],
        }
    }
}

/// Turns one message into an on-chain note.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(
        &self,
        message: &Message,
        channel: &str,
        sink: &dyn ProgressSink,
    ) -> Result<PublishReceipt, MigrateError>;
}

pub struct NotePublisher {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn ContentStore>,
    identity: Arc<SigningContext>,
    settings: PublishSettings,
}

impl NotePublisher {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn ContentStore>,
        identity: Arc<SigningContext>,
        settings: PublishSettings,
    ) -> Self {
        Self {
            fetcher,
            store,
            identity,
            settings,
        }
    }
}

fn stage(sink: &dyn ProgressSink, message: &Message, stage: Stage) {
    sink.emit(EngineEvent::Progress(PublishProgress {
        message_id: message.id,
        stage,
        bytes: None,
    }));
}

#[async_trait::async_trait]
impl Publisher for NotePublisher {
    async fn publish(
        &self,
        message: &Message,
        channel: &str,
        sink: &dyn ProgressSink,
    ) -> Result<PublishReceipt, MigrateError> {
        if !self.identity.is_ready() {
            return Err(MigrateError::Precondition(
                "signing context is not initialized".to_string(),
            ));
        }

        stage(sink, message, Stage::Formatting);
        let photos: Vec<MediaRef> = message.photos.iter().map(MediaRef::from).collect();
        let mut attachments = upload_attachments(
            self.fetcher.as_ref(),
            self.store.as_ref(),
            message.id,
            &photos,
            sink,
        )
        .await?;
        if let Some(file) = &message.file {
            let files = [MediaRef::from(file)];
            attachments.extend(
                upload_attachments(
                    self.fetcher.as_ref(),
                    self.store.as_ref(),
                    message.id,
                    &files,
                    sink,
                )
                .await?,
            );
        }

        let document = NoteDocument::build(
            message,
            attachments,
            &self.settings.sources,
            &self.settings.channel_prefix,
            channel,
        );

        let document = document.to_json().map_err(|err| MigrateError::Publish {
            message_id: message.id,
            message: format!("note document did not serialize: {err}"),
        })?;

        stage(sink, message, Stage::Storing);
        let content_pointer = self
            .store
            .upload_json(&document)
            .await
            .map_err(|err| MigrateError::Transfer {
                address: format!("note document for message {}", message.id),
                message: err.to_string(),
            })?;

        stage(sink, message, Stage::Submitting);
        let receipt = self
            .identity
            .post_note(&content_pointer)
            .await
            .map_err(|err| {
                engine_warn!("Message {}: postNote failed: {}", message.id, err);
                err.into_migrate(Some(message.id))
            })?;

        stage(sink, message, Stage::Done);
        engine_info!(
            "Message {} published as {} (tx {})",
            message.id,
            content_pointer,
            receipt.transaction_hash
        );
        Ok(PublishReceipt {
            message_id: message.id,
            content_pointer,
            transaction_hash: receipt.transaction_hash,
            note_id: receipt.note_id,
        })
    }
}
