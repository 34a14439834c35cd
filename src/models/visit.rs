use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::campaign::{CampaignDimensions, CampaignField};

/// Incoming tracking hit; only the landing URL matters for attribution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackingRequest {
    pub url: Option<String>,
}

impl TrackingRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
        }
    }
}

/// Campaign columns as stored on a visit row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct StoredCampaign {
    pub campaign_name: Option<String>,
    pub campaign_keyword: Option<String>,
    pub campaign_source: Option<String>,
    pub campaign_medium: Option<String>,
    pub campaign_content: Option<String>,
    pub campaign_id: Option<String>,
    pub campaign_group: Option<String>,
    pub campaign_placement: Option<String>,
}

impl StoredCampaign {
    pub fn get(&self, field: CampaignField) -> Option<&str> {
        match field {
            CampaignField::Name => self.campaign_name.as_deref(),
            CampaignField::Keyword => self.campaign_keyword.as_deref(),
            CampaignField::Source => self.campaign_source.as_deref(),
            CampaignField::Medium => self.campaign_medium.as_deref(),
            CampaignField::Content => self.campaign_content.as_deref(),
            CampaignField::Id => self.campaign_id.as_deref(),
            CampaignField::Group => self.campaign_group.as_deref(),
            CampaignField::Placement => self.campaign_placement.as_deref(),
        }
    }

    pub fn set(&mut self, field: CampaignField, value: Option<String>) {
        let slot = match field {
            CampaignField::Name => &mut self.campaign_name,
            CampaignField::Keyword => &mut self.campaign_keyword,
            CampaignField::Source => &mut self.campaign_source,
            CampaignField::Medium => &mut self.campaign_medium,
            CampaignField::Content => &mut self.campaign_content,
            CampaignField::Id => &mut self.campaign_id,
            CampaignField::Group => &mut self.campaign_group,
            CampaignField::Placement => &mut self.campaign_placement,
        };
        *slot = value;
    }

    /// Stored values that are neither null nor empty
    pub fn to_dimensions(&self) -> CampaignDimensions {
        CampaignField::ALL
            .into_iter()
            .filter_map(|field| match self.get(field) {
                Some(value) if !value.is_empty() => Some((field, value.to_string())),
                _ => None,
            })
            .collect()
    }
}

/// A visit (or the visitor it belongs to) as known to the tracker
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisitorInfo {
    /// Visit row id, absent for a visit not yet persisted
    #[serde(default)]
    pub idvisit: Option<i64>,
    /// Opaque visitor identifier (8 bytes in practice)
    #[serde(with = "hex_bytes")]
    pub idvisitor: Vec<u8>,
    #[serde(flatten)]
    pub campaign: StoredCampaign,
}

impl VisitorInfo {
    pub fn new(idvisitor: impl Into<Vec<u8>>) -> Self {
        Self {
            idvisit: None,
            idvisitor: idvisitor.into(),
            campaign: StoredCampaign::default(),
        }
    }

    pub fn with_campaign(mut self, campaign: StoredCampaign) -> Self {
        self.campaign = campaign;
        self
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}
