//! The data-parcel classifier: assigns every event kind its token.
//!
//! Pure functions of their inputs, stable across process restarts, so
//! that subscription matching stays reliable.

use caretwin_core::{DataParcelToken, Discriminator, ProtocolEventKind, RawEvent};

/// Build the token for an event kind, with an optional sub-kind
/// discriminator.
pub fn classify(kind: &ProtocolEventKind, discriminator: Option<Discriminator>) -> DataParcelToken {
    DataParcelToken::new(kind.subcategory(), kind.as_type(), discriminator)
}

/// Classify a parsed raw event, deriving the discriminator from the event
/// content where the kind has sub-kinds.
pub fn classify_event(event: &RawEvent) -> DataParcelToken {
    let kind = event.kind();
    let discriminator = match kind {
        ProtocolEventKind::RoomMessage => event
            .msgtype()
            .map(|msgtype| Discriminator::new("msgtype", msgtype)),
        ProtocolEventKind::RoomMember => event
            .membership()
            .map(|membership| Discriminator::new("membership", membership)),
        _ => None,
    };
    classify(&kind, discriminator)
}

/// The set of data parcel tokens this bridge is interested in, published
/// to the topic/subscription registry at startup.
pub fn interest_tokens() -> Vec<DataParcelToken> {
    [
        ProtocolEventKind::RoomCreate,
        ProtocolEventKind::RoomMember,
        ProtocolEventKind::RoomName,
        ProtocolEventKind::RoomTopic,
        ProtocolEventKind::RoomMessage,
        ProtocolEventKind::Presence,
        ProtocolEventKind::Typing,
        ProtocolEventKind::Receipt,
    ]
    .iter()
    .map(|kind| classify(kind, None))
    .collect()
}
