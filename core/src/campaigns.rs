//! Campaign and lead operations.
//!
//! # Design
//! `Campaigns` wraps a `Gateway` and shapes parameters for each endpoint.
//! Responses pass through as `Payload` except where the client has to read
//! them: the name lookup walks the paginated campaign list, and `get_leads`
//! turns the CSV export into `LeadExportRecord`s.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ApiError;
use crate::export::{normalize_export, LeadExportRecord};
use crate::gateway::{Gateway, Payload};
use crate::http::{HttpMethod, Transport};
use crate::types::{AddLeadOptions, Lead};

/// API version sent with campaign list requests.
pub const DEFAULT_API_VERSION: u32 = 2;

/// Page size used while looking a campaign up by name.
pub const LOOKUP_PAGE_LIMIT: u32 = 10;

/// Progress of a campaign lookup by name.
#[derive(Debug)]
enum Scan {
    Scanning { offset: u32, page: u32 },
    Found(Value),
    Exhausted,
}

/// Campaign and lead operations over an authenticated gateway.
#[derive(Debug, Clone)]
pub struct Campaigns<T> {
    gateway: Gateway<T>,
    version: u32,
}

impl<T: Transport> Campaigns<T> {
    pub fn new(gateway: Gateway<T>) -> Self {
        Self::with_version(gateway, DEFAULT_API_VERSION)
    }

    pub fn with_version(gateway: Gateway<T>, version: u32) -> Self {
        Self { gateway, version }
    }

    pub fn gateway(&self) -> &Gateway<T> {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut Gateway<T> {
        &mut self.gateway
    }

    /// One page of campaigns, as returned by the server (`campaigns` plus
    /// `pagination`).
    pub fn list_campaigns(&self, offset: u32, limit: u32, page: u32) -> Result<Payload, ApiError> {
        let query = [
            ("version", format!("v{}", self.version)),
            ("offset", offset.to_string()),
            ("limit", limit.to_string()),
            ("page", page.to_string()),
        ];
        self.gateway.execute(HttpMethod::Get, &["campaigns"], &query, None)
    }

    /// Fetch a campaign by id, or find the first one named `name`.
    ///
    /// Exactly one of `id` and `name` must be given. A lookup by id fails
    /// with the server's 404 when the campaign does not exist; a lookup by
    /// name returns `Ok(None)` once every page has been scanned.
    /// An empty string counts as not given.
    pub fn get_campaign(
        &self,
        id: Option<&str>,
        name: Option<&str>,
    ) -> Result<Option<Value>, ApiError> {
        let id = id.filter(|id| !id.is_empty());
        let name = name.filter(|name| !name.is_empty());
        match (id, name) {
            (Some(id), None) => self
                .gateway
                .execute(HttpMethod::Get, &["campaigns", id], &[], None)?
                .into_json()
                .map(Some),
            (None, Some(name)) => self.find_campaign_by_name(name),
            (Some(_), Some(_)) => Err(ApiError::InvalidArgument(
                "pass either a campaign id or a campaign name, not both".to_string(),
            )),
            (None, None) => Err(ApiError::InvalidArgument(
                "either a campaign id or a campaign name must be provided".to_string(),
            )),
        }
    }

    /// Scan the campaign list page by page for an exact, case-sensitive
    /// name match. Names are not unique; the first match in list order wins.
    pub fn find_campaign_by_name(&self, name: &str) -> Result<Option<Value>, ApiError> {
        let mut state = Scan::Scanning { offset: 0, page: 1 };
        loop {
            state = match state {
                Scan::Scanning { offset, page } => self.scan_page(name, offset, page)?,
                Scan::Found(campaign) => return Ok(Some(campaign)),
                Scan::Exhausted => return Ok(None),
            };
        }
    }

    fn scan_page(&self, name: &str, mut offset: u32, page: u32) -> Result<Scan, ApiError> {
        let response = self.list_campaigns(offset, LOOKUP_PAGE_LIMIT, page)?.into_json()?;
        let campaigns = response
            .get("campaigns")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ApiError::MalformedResponse("campaign list has no `campaigns` array".to_string())
            })?;
        debug!(page, offset, count = campaigns.len(), "scanning campaign page");

        for campaign in campaigns {
            offset += 1;
            if campaign.get("name").and_then(Value::as_str) == Some(name) {
                return Ok(Scan::Found(campaign.clone()));
            }
        }

        let next_page = response
            .get("pagination")
            .and_then(|p| p.get("nextPage"))
            .and_then(Value::as_u64);
        match next_page {
            Some(next) if !campaigns.is_empty() && next > u64::from(page) => Ok(Scan::Scanning {
                offset,
                page: page + 1,
            }),
            _ => Ok(Scan::Exhausted),
        }
    }

    pub fn delete_campaign(&self, campaign_id: &str) -> Result<Payload, ApiError> {
        self.gateway
            .execute(HttpMethod::Delete, &["campaigns", campaign_id], &[], None)
    }

    /// Add `lead` to a campaign. The lead must carry a non-empty email.
    pub fn add_lead(
        &self,
        campaign_id: &str,
        lead: &Lead,
        options: AddLeadOptions,
    ) -> Result<Payload, ApiError> {
        if lead.email.trim().is_empty() {
            return Err(ApiError::InvalidArgument("email is required for a lead".to_string()));
        }
        let body = serde_json::to_value(lead).map_err(|e| ApiError::Serialization(e.to_string()))?;
        self.gateway.execute(
            HttpMethod::Post,
            &["campaigns", campaign_id, "leads"],
            &options.to_query(),
            Some(&body),
        )
    }

    /// Partially update the lead identified by `email`. Only the given
    /// fields change; the server rejects an empty object with a 400.
    pub fn update_lead(
        &self,
        campaign_id: &str,
        email: &str,
        fields: &Map<String, Value>,
    ) -> Result<Payload, ApiError> {
        let body = Value::Object(fields.clone());
        self.gateway.execute(
            HttpMethod::Patch,
            &["campaigns", campaign_id, "leads", email],
            &[],
            Some(&body),
        )
    }

    /// Remove a lead and all of its statistics from a campaign.
    pub fn delete_lead(&self, campaign_id: &str, email: &str) -> Result<Payload, ApiError> {
        self.gateway.execute(
            HttpMethod::Delete,
            &["campaigns", campaign_id, "leads", email],
            &[("action", "remove".to_string())],
            None,
        )
    }

    /// Every lead of a campaign, from the CSV export.
    pub fn get_leads(&self, campaign_id: &str) -> Result<Vec<LeadExportRecord>, ApiError> {
        let text = self.gateway.execute_text(
            HttpMethod::Get,
            &["campaigns", campaign_id, "export", "leads"],
            &[("state", "all".to_string())],
            None,
        )?;
        // A quoted one-column export is also a valid JSON string; only
        // objects and arrays are treated as a JSON answer.
        let is_json_document = serde_json::from_str::<Value>(&text)
            .is_ok_and(|value| value.is_object() || value.is_array());
        if is_json_document {
            return Err(ApiError::MalformedResponse(
                "lead export returned JSON instead of CSV".to_string(),
            ));
        }
        normalize_export(&text)
    }

    pub fn add_lead_variables(
        &self,
        lead_id: &str,
        variables: &[(&str, String)],
    ) -> Result<Payload, ApiError> {
        self.lead_variables(HttpMethod::Post, lead_id, variables)
    }

    pub fn update_lead_variables(
        &self,
        lead_id: &str,
        variables: &[(&str, String)],
    ) -> Result<Payload, ApiError> {
        self.lead_variables(HttpMethod::Patch, lead_id, variables)
    }

    pub fn delete_lead_variables(
        &self,
        lead_id: &str,
        variables: &[(&str, String)],
    ) -> Result<Payload, ApiError> {
        self.lead_variables(HttpMethod::Delete, lead_id, variables)
    }

    // Variables travel in the query string, not the body.
    fn lead_variables(
        &self,
        method: HttpMethod,
        lead_id: &str,
        variables: &[(&str, String)],
    ) -> Result<Payload, ApiError> {
        if variables.is_empty() {
            return Err(ApiError::InvalidArgument(
                "list of variables must not be empty".to_string(),
            ));
        }
        self.gateway
            .execute(method, &["leads", lead_id, "variables"], variables, None)
    }
}
