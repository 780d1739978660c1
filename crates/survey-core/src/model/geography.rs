// SPDX-License-Identifier: BUSL-1.1
//! Administrative geography: division → district → block → school.
//!
//! Children carry their ancestors' names as plain strings.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{require_non_empty, require_non_empty_opt, Document};
use crate::error::CoreResult;

/// Top-level administrative division.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Division {
    pub division_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division_code: Option<String>,
}

impl Document for Division {
    const COLLECTION: &'static str = "divisions";
    const FILTER_FIELDS: &'static [&'static str] = &["divisionName", "divisionCode"];

    fn validate(&self) -> CoreResult<()> {
        require_non_empty("divisionName", &self.division_name)?;
        require_non_empty_opt("divisionCode", self.division_code.as_deref())
    }
}

/// District inside a division.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct District {
    pub district_name: String,
    pub division_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district_code: Option<String>,
}

impl Document for District {
    const COLLECTION: &'static str = "districts";
    const FILTER_FIELDS: &'static [&'static str] =
        &["districtName", "divisionName", "districtCode"];

    fn validate(&self) -> CoreResult<()> {
        require_non_empty("districtName", &self.district_name)?;
        require_non_empty("divisionName", &self.division_name)?;
        require_non_empty_opt("districtCode", self.district_code.as_deref())
    }
}

/// Block inside a district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub block_name: String,
    pub district_name: String,
    pub division_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_code: Option<String>,
}

impl Document for Block {
    const COLLECTION: &'static str = "blocks";
    const FILTER_FIELDS: &'static [&'static str] =
        &["blockName", "districtName", "divisionName", "blockCode"];

    fn validate(&self) -> CoreResult<()> {
        require_non_empty("blockName", &self.block_name)?;
        require_non_empty("districtName", &self.district_name)?;
        require_non_empty("divisionName", &self.division_name)?;
        require_non_empty_opt("blockCode", self.block_code.as_deref())
    }
}

/// A school, identified externally by its UDISE code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct School {
    pub school_name: String,
    pub udise_code: String,
    pub block_name: String,
    pub district_name: String,
    pub division_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_type: Option<String>,
}

impl Document for School {
    const COLLECTION: &'static str = "schools";
    const FILTER_FIELDS: &'static [&'static str] = &[
        "schoolName",
        "udiseCode",
        "blockName",
        "districtName",
        "divisionName",
        "schoolType",
    ];
    const SEARCH_FIELDS: &'static [&'static str] = &["schoolName", "udiseCode"];

    fn validate(&self) -> CoreResult<()> {
        require_non_empty("schoolName", &self.school_name)?;
        require_non_empty("udiseCode", &self.udise_code)?;
        require_non_empty("blockName", &self.block_name)?;
        require_non_empty("districtName", &self.district_name)?;
        require_non_empty("divisionName", &self.division_name)
    }
}
