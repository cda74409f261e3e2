//! The event normalization pipeline.
//!
//! A raw protocol event arrives, the classifier assigns it a data parcel
//! token, and a normalizer consults the identity mapping caches to decide
//! whether enrichment is needed, emitting a unit of work with an updated
//! outcome. Side effects are confined to the identity mapping cache;
//! normalizers never touch twin or outcome state.

pub mod classifier;
pub mod ingest;
pub mod normalizer;

pub use classifier::{classify, classify_event, interest_tokens};
pub use ingest::NormalizationPipeline;
pub use normalizer::{
    Normalizer, RoomClassification, RoomEventNormalizer, UserEventNormalizer,
    classify_room_detail,
};
