//! Campaign field vocabulary and alias tables

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Canonical campaign attribute, independent of how a site spells it in URLs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignField {
    Name,
    Keyword,
    Source,
    Medium,
    Content,
    Id,
    Group,
    Placement,
}

impl CampaignField {
    /// Every field stored on a visit, in column order
    pub const ALL: [CampaignField; 8] = [
        CampaignField::Name,
        CampaignField::Keyword,
        CampaignField::Source,
        CampaignField::Medium,
        CampaignField::Content,
        CampaignField::Id,
        CampaignField::Group,
        CampaignField::Placement,
    ];

    /// Column holding this field in the visit log
    pub const fn column_name(self) -> &'static str {
        match self {
            CampaignField::Name => "campaign_name",
            CampaignField::Keyword => "campaign_keyword",
            CampaignField::Source => "campaign_source",
            CampaignField::Medium => "campaign_medium",
            CampaignField::Content => "campaign_content",
            CampaignField::Id => "campaign_id",
            CampaignField::Group => "campaign_group",
            CampaignField::Placement => "campaign_placement",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            CampaignField::Name => "name",
            CampaignField::Keyword => "keyword",
            CampaignField::Source => "source",
            CampaignField::Medium => "medium",
            CampaignField::Content => "content",
            CampaignField::Id => "id",
            CampaignField::Group => "group",
            CampaignField::Placement => "placement",
        }
    }

    const fn default_aliases(self) -> &'static [&'static str] {
        match self {
            CampaignField::Name => &[
                "pk_campaign",
                "mtm_campaign",
                "matomo_campaign",
                "utm_campaign",
                "pk_cpn",
                "mtm_cpn",
                "matomo_cpn",
                "piwik_campaign",
            ],
            CampaignField::Keyword => &[
                "pk_kwd",
                "mtm_kwd",
                "matomo_kwd",
                "pk_keyword",
                "mtm_keyword",
                "matomo_keyword",
                "utm_term",
                "piwik_kwd",
            ],
            CampaignField::Source => &["pk_source", "mtm_source", "matomo_source", "utm_source"],
            CampaignField::Medium => &["pk_medium", "mtm_medium", "matomo_medium", "utm_medium"],
            CampaignField::Content => {
                &["pk_content", "mtm_content", "matomo_content", "utm_content"]
            }
            CampaignField::Id => &["pk_cid", "mtm_cid", "matomo_cid", "utm_id"],
            CampaignField::Group => &["pk_group", "mtm_group", "matomo_group"],
            CampaignField::Placement => &["pk_placement", "mtm_placement", "matomo_placement"],
        }
    }
}

impl fmt::Display for CampaignField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CampaignField::ALL
            .into_iter()
            .find(|field| {
                field.as_str().eq_ignore_ascii_case(s) || field.column_name().eq_ignore_ascii_case(s)
            })
            .ok_or_else(|| anyhow::anyhow!("unknown campaign field '{s}'"))
    }
}

/// Detected campaign values keyed by canonical field
pub type CampaignDimensions = BTreeMap<CampaignField, String>;

/// Ordered table of canonical fields to the query parameters that may carry them
///
/// Both the field order and each alias list order are significant: fields are
/// scanned in insertion order and the first alias yielding a value wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignParameterMap {
    entries: Vec<(CampaignField, Vec<String>)>,
}

impl CampaignParameterMap {
    /// An empty table; detection against it never matches anything
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Builder-style insert, see [`CampaignParameterMap::set`]
    pub fn with<I, S>(mut self, field: CampaignField, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set(field, aliases);
        self
    }

    /// Replace the aliases for `field`, keeping its position if already present
    pub fn set<I, S>(&mut self, field: CampaignField, aliases: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let aliases: Vec<String> = aliases.into_iter().map(Into::into).collect();
        match self.entries.iter_mut().find(|(f, _)| *f == field) {
            Some((_, existing)) => *existing = aliases,
            None => self.entries.push((field, aliases)),
        }
    }

    pub fn aliases(&self, field: CampaignField) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, aliases)| aliases.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (CampaignField, &[String])> {
        self.entries
            .iter()
            .map(|(field, aliases)| (*field, aliases.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CampaignParameterMap {
    fn default() -> Self {
        CampaignField::ALL
            .into_iter()
            .fold(Self::empty(), |map, field| {
                map.with(field, field.default_aliases().iter().copied())
            })
    }
}
