//! Marketing campaign detection
//!
//! Maps a tracking request's landing URL, or failing that the visit and
//! visitor history, to canonical campaign dimensions (name, source, medium...).

pub mod detector;
pub mod fields;
pub mod landing;
pub mod query;

pub use detector::CampaignDetector;
pub use fields::{CampaignDimensions, CampaignField, CampaignParameterMap};
pub use landing::{PageUrlCleaner, UrlCleaner, UrlParts};
pub use query::{value_from_query_string, MAX_VALUE_LENGTH};
