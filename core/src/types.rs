//! Domain types for campaign and lead operations.
//!
//! # Design
//! Campaigns stay `serde_json::Value`: the client only reads `_id`, `name`,
//! and pagination metadata, and passes everything else through untouched.
//! Leads are typed because they are built by the caller, but any custom
//! variable the account defines rides along in `variables`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An outreach contact, as submitted to a campaign.
///
/// Field names match the API's wire format, which mixes camelCase and
/// snake_case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub email: String,
    #[serde(rename = "firstName", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(rename = "companyName", skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icebreaker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(rename = "linkedinUrl", skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    #[serde(rename = "companyDomain", skip_serializing_if = "Option::is_none")]
    pub company_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub g2_main_sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub g2_sub_sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    /// Custom variables, sent as extra top-level fields.
    #[serde(flatten)]
    pub variables: Map<String, Value>,
}

impl Lead {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Self::default()
        }
    }
}

/// Server-side behaviour requested when adding a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddLeadOptions {
    /// Skip the lead if the email already exists in another campaign.
    pub deduplicate: bool,
    pub find_email: bool,
    pub linkedin_enrichment: bool,
    pub verify_email: bool,
}

impl Default for AddLeadOptions {
    fn default() -> Self {
        Self {
            deduplicate: true,
            find_email: false,
            linkedin_enrichment: false,
            verify_email: false,
        }
    }
}

impl AddLeadOptions {
    pub(crate) fn to_query(self) -> Vec<(&'static str, String)> {
        vec![
            ("deduplicate", self.deduplicate.to_string()),
            ("findEmail", self.find_email.to_string()),
            ("linkedinEnrichment", self.linkedin_enrichment.to_string()),
            ("verifyEmail", self.verify_email.to_string()),
        ]
    }
}
