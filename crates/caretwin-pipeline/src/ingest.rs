//! Pipeline entry point: raw transport bytes in, terminal-or-routable
//! units of work out.

use std::sync::Arc;

use tracing::{debug, info};

use caretwin_broker::TopicRegistry;
use caretwin_core::{
    BridgeError, DataParcelToken, DataSubcategory, Payload, RawEvent, UnitOfWork,
};

use crate::classifier::{classify_event, interest_tokens};
use crate::normalizer::Normalizer;

/// The assembled normalization pipeline.
///
/// Holds one normalizer per event family and dispatches each ingested
/// event to the first normalizer accepting its token.
pub struct NormalizationPipeline {
    normalizers: Vec<Arc<dyn Normalizer>>,
}

impl NormalizationPipeline {
    pub fn new(normalizers: Vec<Arc<dyn Normalizer>>) -> Self {
        Self { normalizers }
    }

    /// The accepting function exposed to the inbound transport.
    ///
    /// Never returns an error: unparseable input becomes a FAILED unit of
    /// work so the transport can apply its retry/dead-letter policy.
    pub async fn ingest(&self, raw: &[u8]) -> UnitOfWork {
        let event = match RawEvent::parse(raw) {
            Ok(event) => event,
            Err(error) => {
                return Self::rejected(raw, &error);
            }
        };

        let token = classify_event(&event);
        debug!(token = %token, "Classified inbound event");

        let content = match serde_json::to_value(&event) {
            Ok(content) => content,
            Err(error) => {
                return Self::rejected(raw, &BridgeError::from(error));
            }
        };
        let mut uow = UnitOfWork::new(Payload::new(token, content));

        match self.normalizer_for(&uow.ingress().token) {
            Some(normalizer) => {
                debug!(uow = %uow.id(), normalizer = normalizer.name(), "Dispatching to normalizer");
                normalizer.normalize(uow).await
            }
            None => {
                // No normalizer covers the General subcategory.
                uow.mark_no_processing_required();
                uow
            }
        }
    }

    /// Publish the tokens this pipeline is interested in. Static,
    /// load-time declaration.
    pub fn publish_interest(&self, registry: &dyn TopicRegistry) {
        let tokens = interest_tokens();
        info!(count = tokens.len(), "Publishing data parcel interests");
        registry.publish_interest(&tokens);
    }

    fn normalizer_for(&self, token: &DataParcelToken) -> Option<&Arc<dyn Normalizer>> {
        self.normalizers.iter().find(|n| n.accepts(token))
    }

    fn rejected(raw: &[u8], error: &BridgeError) -> UnitOfWork {
        let token = DataParcelToken::new(DataSubcategory::General, "unknown", None);
        let content = serde_json::Value::String(String::from_utf8_lossy(raw).into_owned());
        let mut uow = UnitOfWork::new(Payload::new(token, content));
        uow.fail(format!("ingress payload rejected: {error}"));
        uow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::{RoomEventNormalizer, UserEventNormalizer};
    use async_trait::async_trait;
    use caretwin_broker::{BrokerError, RoomDetail, RoomDirectory};
    use caretwin_cache::IdentityMappings;
    use caretwin_core::{ProcessingOutcome, RoomId};
    use std::sync::Mutex;
    use std::time::Duration;

    struct EmptyDirectory;

    #[async_trait]
    impl RoomDirectory for EmptyDirectory {
        async fn room_detail(&self, room: &RoomId) -> Result<RoomDetail, BrokerError> {
            Ok(RoomDetail::new(room.clone()).with_name("Ward 7"))
        }
    }

    struct RecordingRegistry {
        published: Mutex<Vec<DataParcelToken>>,
    }

    impl TopicRegistry for RecordingRegistry {
        fn publish_interest(&self, tokens: &[DataParcelToken]) {
            self.published
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .extend_from_slice(tokens);
        }
    }

    fn pipeline() -> NormalizationPipeline {
        let mappings = Arc::new(IdentityMappings::new(Duration::from_secs(60)));
        NormalizationPipeline::new(vec![
            Arc::new(RoomEventNormalizer::new(
                mappings.clone(),
                Arc::new(EmptyDirectory),
                Duration::from_millis(200),
            )),
            Arc::new(UserEventNormalizer::new(mappings)),
        ])
    }

    #[tokio::test]
    async fn test_ingest_room_event() {
        let uow = pipeline()
            .ingest(br#"{"type":"m.room.create","room_id":"!abc:server","sender":"@a:server","content":{}}"#)
            .await;
        assert!(uow.is_success());
        assert_eq!(uow.egress().len(), 1);
    }

    #[tokio::test]
    async fn test_ingest_unknown_event_kind_is_noop() {
        let uow = pipeline()
            .ingest(br#"{"type":"org.custom.audit","content":{}}"#)
            .await;
        assert_eq!(uow.outcome(), Some(ProcessingOutcome::NoProcessingRequired));
    }

    #[tokio::test]
    async fn test_ingest_garbage_fails() {
        let uow = pipeline().ingest(b"not json at all").await;
        assert!(uow.is_failed());
        assert!(
            uow.failure_description()
                .unwrap()
                .contains("ingress payload rejected")
        );
    }

    #[tokio::test]
    async fn test_publish_interest() {
        let registry = RecordingRegistry {
            published: Mutex::new(Vec::new()),
        };
        pipeline().publish_interest(&registry);

        let published = registry.published.lock().unwrap();
        assert_eq!(published.len(), interest_tokens().len());
    }
}
