mod visit;

pub use visit::{StoredCampaign, TrackingRequest, VisitorInfo};
