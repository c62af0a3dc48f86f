//! API request and response types
//!
//! Shared types for API endpoints including query parameters and response wrappers.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use drift_analytics::ATTRIBUTION_PLATFORM;
use drift_sources::Platform;

use crate::error::{ApiError, Result};

/// Longest tag name accepted, in characters
pub const MAX_TAG_CHARS: usize = 20;

/// Standard success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// `needRefresh` query flag shared by the read endpoints
#[derive(Debug, Default, Deserialize)]
pub struct RefreshParams {
    #[serde(default, rename = "needRefresh")]
    pub need_refresh: bool,
}

pub(crate) fn require_tenant_id(tenant_id: i64) -> Result<i64> {
    if tenant_id <= 0 {
        return Err(ApiError::validation("tenant_id", "must be a positive integer"));
    }
    Ok(tenant_id)
}

pub(crate) fn require_platform(platform: &str) -> Result<&str> {
    let platform = platform.trim();
    if platform.is_empty() {
        return Err(ApiError::validation("platform", "must not be empty"));
    }
    Ok(platform)
}

/// A platform tags can be attached to: a registered platform or `attribution`
pub(crate) fn require_tag_platform(platform: &str) -> Result<&str> {
    let platform = require_platform(platform)?;
    if platform == ATTRIBUTION_PLATFORM {
        return Ok(platform);
    }
    Platform::lookup(platform)?;
    Ok(platform)
}

/// Body of `POST /api/tags` and `DELETE /api/tags`
#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub tenant_id: i64,
    pub platform: String,
    pub tag_name: String,
}

impl TagRequest {
    /// Validated `(tenant_id, platform, tag_name)`
    pub fn validate(&self) -> Result<(i64, &str, &str)> {
        let tenant_id = require_tenant_id(self.tenant_id)?;
        let platform = require_tag_platform(&self.platform)?;

        let tag_name = self.tag_name.trim();
        if tag_name.is_empty() {
            return Err(ApiError::validation("tag_name", "must not be empty"));
        }
        if tag_name.chars().count() > MAX_TAG_CHARS {
            return Err(ApiError::validation(
                "tag_name",
                format!("must be at most {} characters", MAX_TAG_CHARS),
            ));
        }

        Ok((tenant_id, platform, tag_name))
    }
}

/// Body of `POST /api/remove-data`
#[derive(Debug, Deserialize)]
pub struct RemoveDataRequest {
    pub tenant_id: i64,
    pub platform: String,
    /// Day (`YYYY-MM-DD`) to value; replaces whatever was recorded before
    #[serde(default)]
    pub values: BTreeMap<NaiveDate, i64>,
}
