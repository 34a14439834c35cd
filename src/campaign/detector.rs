//! Campaign attribution for tracked visits
//!
//! Detection runs in fixed priority order:
//! 1. campaign parameters in the landing URL fragment (client-side routers)
//! 2. campaign parameters in the landing URL query string
//! 3. a Google Ads click id, which implies `google` / `adwords`
//!
//! When the landing URL carries nothing, the campaign already stored on the
//! current visit is used, and failing that the visitor's first or most recent
//! attributed visit from the visit log.

use std::sync::Arc;
use tracing::debug;

use crate::campaign::fields::{CampaignDimensions, CampaignField, CampaignParameterMap};
use crate::campaign::landing::{fragment_query_string, PageUrlCleaner, UrlCleaner, UrlParts};
use crate::campaign::query::value_from_query_string;
use crate::models::{TrackingRequest, VisitorInfo};
use crate::storage::{SortDirection, Storage, StorageResult};

/// Google Ads auto-tagging parameter
const CLICK_ID_PARAM: &str = "gclid";
const CLICK_ID_SOURCE: &str = "google";
const CLICK_ID_MEDIUM: &str = "adwords";

/// Visitor-level lookup, resolved at most once per detector
#[derive(Debug, Clone, PartialEq, Eq)]
enum VisitorLookup {
    Unresolved,
    /// `None` when the visitor has no attributed visit
    Resolved(Option<CampaignDimensions>),
}

/// Detects the campaign a visit belongs to
///
/// Holds the memoized visitor lookup, so a detector must not be shared
/// between visitors; create one per tracking request.
pub struct CampaignDetector {
    cleaner: Arc<dyn UrlCleaner>,
    visitor_lookup: VisitorLookup,
}

impl Default for CampaignDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl CampaignDetector {
    pub fn new() -> Self {
        Self::with_cleaner(Arc::new(PageUrlCleaner))
    }

    pub fn with_cleaner(cleaner: Arc<dyn UrlCleaner>) -> Self {
        Self {
            cleaner,
            visitor_lookup: VisitorLookup::Unresolved,
        }
    }

    /// Detect a campaign from the request's landing URL
    ///
    /// Returns `None` when the URL has neither a query string nor a fragment,
    /// otherwise the (possibly empty) detected dimensions.
    pub fn detect_campaign_from_request(
        &self,
        request: &TrackingRequest,
        params: &CampaignParameterMap,
    ) -> Option<CampaignDimensions> {
        let landing_url = self.cleaner.cleanup(request.url.as_deref().unwrap_or_default());
        let parts = UrlParts::parse(&landing_url);

        if parts.is_empty() {
            return None;
        }

        let mut dimensions = CampaignDimensions::new();

        if let Some(fragment) = parts.fragment.as_deref() {
            dimensions = self.detect_campaign_from_string(&fragment_query_string(fragment), params);
            if !dimensions.is_empty() {
                debug!(url = %landing_url, "campaign detected from url fragment");
            }
        }

        if let Some(query) = parts.query.as_deref() {
            if dimensions.is_empty() {
                dimensions = self.detect_campaign_from_string(query, params);
                if !dimensions.is_empty() {
                    debug!(url = %landing_url, "campaign detected from query string");
                }
            }

            if dimensions.is_empty() && value_from_query_string(CLICK_ID_PARAM, query).is_some() {
                debug!(url = %landing_url, "campaign inferred from google click id");
                dimensions.insert(CampaignField::Source, CLICK_ID_SOURCE.to_string());
                dimensions.insert(CampaignField::Medium, CLICK_ID_MEDIUM.to_string());
            }
        }

        Some(dimensions)
    }

    /// Detect campaign values in a query string
    ///
    /// Every field is attempted; for each one the first alias carrying a
    /// non-empty value wins.
    pub fn detect_campaign_from_string(
        &self,
        query_string: &str,
        params: &CampaignParameterMap,
    ) -> CampaignDimensions {
        let mut dimensions = CampaignDimensions::new();
        for (field, aliases) in params.iter() {
            if let Some(value) = aliases
                .iter()
                .find_map(|alias| value_from_query_string(alias, query_string))
            {
                dimensions.insert(field, value);
            }
        }
        dimensions
    }

    /// Campaign already stored on a visit, without null or empty values
    pub fn detect_campaign_from_visit(&self, visit: &VisitorInfo) -> CampaignDimensions {
        visit.campaign.to_dimensions()
    }

    /// Campaign of the visitor's first (or most recent) attributed visit
    ///
    /// The visit log is queried on the first call only; later calls return
    /// the cached answer. A storage error leaves the lookup unresolved.
    pub async fn detect_campaign_from_visitor(
        &mut self,
        storage: &dyn Storage,
        visitor: &VisitorInfo,
        attribute_first_referrer: bool,
    ) -> StorageResult<Option<CampaignDimensions>> {
        if let VisitorLookup::Resolved(cached) = &self.visitor_lookup {
            return Ok(cached.clone());
        }

        let direction = if attribute_first_referrer {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        };

        let row = storage
            .fetch_visitor_campaign(&visitor.idvisitor, direction)
            .await?;
        let detected = row.map(|stored| stored.to_dimensions());

        debug!(
            idvisitor = %hex::encode(&visitor.idvisitor),
            found = detected.is_some(),
            "resolved visitor campaign"
        );

        self.visitor_lookup = VisitorLookup::Resolved(detected.clone());
        Ok(detected)
    }

    /// Whether the visitor lookup has already hit storage
    pub fn visitor_resolved(&self) -> bool {
        matches!(self.visitor_lookup, VisitorLookup::Resolved(_))
    }

    /// Run the full attribution chain for a tracking request
    ///
    /// Landing URL first, then the campaign stored on the current visit, then
    /// the visitor's history. Returns `None` when nothing is attributed.
    pub async fn attribute(
        &mut self,
        storage: &dyn Storage,
        request: &TrackingRequest,
        visitor: &VisitorInfo,
        params: &CampaignParameterMap,
        attribute_first_referrer: bool,
    ) -> StorageResult<Option<CampaignDimensions>> {
        if let Some(dimensions) = self.detect_campaign_from_request(request, params) {
            if !dimensions.is_empty() {
                return Ok(Some(dimensions));
            }
        }

        let from_visit = self.detect_campaign_from_visit(visitor);
        if !from_visit.is_empty() {
            debug!("campaign taken from current visit");
            return Ok(Some(from_visit));
        }

        let from_visitor = self
            .detect_campaign_from_visitor(storage, visitor, attribute_first_referrer)
            .await?;
        Ok(from_visitor.filter(|dimensions| !dimensions.is_empty()))
    }
}
