//! Media module for asset representation and payload parsing.

pub mod fingerprint;
pub mod item;
pub mod parser;

pub use fingerprint::fingerprint;
pub use item::{ContentLabel, MediaAsset, MediaKind, PostRecord, QualityMap, QualityTier};
pub use parser::{normalize_payload, parse_payload, ParsedMedia, ParsedPost};
