// SPDX-License-Identifier: BUSL-1.1
//! Non-academic audit hierarchy: department → sub-department →
//! sub-sub-department → category → sub-category.
//!
//! Field names are PascalCase on the wire. Each level repeats its ancestors'
//! codes; [`SubCategory`] additionally repeats every ancestor's description
//! and weightage so that reporting can read one row. Keeping those copies in
//! step is the job of [`crate::hierarchy`].

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{require_display_order, require_non_empty, require_weightage, Document};
use crate::error::CoreResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct Department {
    pub department_code: String,
    pub department_group_code: String,
    pub department_description: String,
    pub department_weightage: f64,
}

impl Document for Department {
    const COLLECTION: &'static str = "departments";
    const FILTER_FIELDS: &'static [&'static str] = &["DepartmentCode", "DepartmentGroupCode"];
    const SEARCH_FIELDS: &'static [&'static str] = &["DepartmentCode", "DepartmentDescription"];

    fn validate(&self) -> CoreResult<()> {
        require_non_empty("DepartmentCode", &self.department_code)?;
        require_non_empty("DepartmentGroupCode", &self.department_group_code)?;
        require_non_empty("DepartmentDescription", &self.department_description)?;
        require_weightage("DepartmentWeightage", self.department_weightage)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct SubDepartment {
    pub department_code: String,
    pub sub_department_code: String,
    pub sub_department_description: String,
    pub sub_department_weightage: f64,
}

impl Document for SubDepartment {
    const COLLECTION: &'static str = "sub_departments";
    const FILTER_FIELDS: &'static [&'static str] = &["DepartmentCode", "SubDepartmentCode"];
    const SEARCH_FIELDS: &'static [&'static str] =
        &["SubDepartmentCode", "SubDepartmentDescription"];

    fn validate(&self) -> CoreResult<()> {
        require_non_empty("DepartmentCode", &self.department_code)?;
        require_non_empty("SubDepartmentCode", &self.sub_department_code)?;
        require_non_empty("SubDepartmentDescription", &self.sub_department_description)?;
        require_weightage("SubDepartmentWeightage", self.sub_department_weightage)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct SubSubDepartment {
    pub department_code: String,
    pub sub_department_code: String,
    pub sub_sub_department_code: String,
    pub sub_sub_department_description: String,
    pub sub_sub_department_weightage: f64,
}

impl Document for SubSubDepartment {
    const COLLECTION: &'static str = "sub_sub_departments";
    const FILTER_FIELDS: &'static [&'static str] =
        &["DepartmentCode", "SubDepartmentCode", "SubSubDepartmentCode"];
    const SEARCH_FIELDS: &'static [&'static str] =
        &["SubSubDepartmentCode", "SubSubDepartmentDescription"];

    fn validate(&self) -> CoreResult<()> {
        require_non_empty("DepartmentCode", &self.department_code)?;
        require_non_empty("SubDepartmentCode", &self.sub_department_code)?;
        require_non_empty("SubSubDepartmentCode", &self.sub_sub_department_code)?;
        require_non_empty(
            "SubSubDepartmentDescription",
            &self.sub_sub_department_description,
        )?;
        require_weightage("SubSubDepartmentWeightage", self.sub_sub_department_weightage)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct Category {
    pub department_code: String,
    pub sub_department_code: String,
    pub sub_sub_department_code: String,
    pub category_code: String,
    pub category_description: String,
    pub category_weightage: f64,
    pub category_display_order: i64,
}

impl Document for Category {
    const COLLECTION: &'static str = "categories";
    const FILTER_FIELDS: &'static [&'static str] = &[
        "DepartmentCode",
        "SubDepartmentCode",
        "SubSubDepartmentCode",
        "CategoryCode",
    ];
    const SEARCH_FIELDS: &'static [&'static str] = &["CategoryCode", "CategoryDescription"];

    fn validate(&self) -> CoreResult<()> {
        require_non_empty("DepartmentCode", &self.department_code)?;
        require_non_empty("SubDepartmentCode", &self.sub_department_code)?;
        require_non_empty("SubSubDepartmentCode", &self.sub_sub_department_code)?;
        require_non_empty("CategoryCode", &self.category_code)?;
        require_non_empty("CategoryDescription", &self.category_description)?;
        require_weightage("CategoryWeightage", self.category_weightage)?;
        require_display_order("CategoryDisplayOrder", self.category_display_order)
    }
}

/// Leaf row of the hierarchy with every ancestor flattened in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct SubCategory {
    pub department_code: String,
    pub department_group_code: String,
    pub department_description: String,
    pub department_weightage: f64,
    pub sub_department_code: String,
    pub sub_department_description: String,
    pub sub_department_weightage: f64,
    pub sub_sub_department_code: String,
    pub sub_sub_department_description: String,
    pub sub_sub_department_weightage: f64,
    pub category_code: String,
    pub category_description: String,
    pub category_weightage: f64,
    pub category_display_order: i64,
    pub sub_category_code: String,
    pub sub_category_description: String,
    pub sub_category_weightage: f64,
    pub sub_category_display_order: i64,
}

impl Document for SubCategory {
    const COLLECTION: &'static str = "sub_categories";
    const FILTER_FIELDS: &'static [&'static str] = &[
        "DepartmentCode",
        "SubDepartmentCode",
        "SubSubDepartmentCode",
        "CategoryCode",
        "SubCategoryCode",
    ];
    const SEARCH_FIELDS: &'static [&'static str] = &[
        "DepartmentCode",
        "SubDepartmentCode",
        "SubSubDepartmentCode",
        "CategoryCode",
        "SubCategoryCode",
        "SubCategoryDescription",
    ];

    fn validate(&self) -> CoreResult<()> {
        for (field, value) in [
            ("DepartmentCode", &self.department_code),
            ("DepartmentGroupCode", &self.department_group_code),
            ("DepartmentDescription", &self.department_description),
            ("SubDepartmentCode", &self.sub_department_code),
            ("SubDepartmentDescription", &self.sub_department_description),
            ("SubSubDepartmentCode", &self.sub_sub_department_code),
            ("SubSubDepartmentDescription", &self.sub_sub_department_description),
            ("CategoryCode", &self.category_code),
            ("CategoryDescription", &self.category_description),
            ("SubCategoryCode", &self.sub_category_code),
            ("SubCategoryDescription", &self.sub_category_description),
        ] {
            require_non_empty(field, value)?;
        }
        for (field, value) in [
            ("DepartmentWeightage", self.department_weightage),
            ("SubDepartmentWeightage", self.sub_department_weightage),
            ("SubSubDepartmentWeightage", self.sub_sub_department_weightage),
            ("CategoryWeightage", self.category_weightage),
            ("SubCategoryWeightage", self.sub_category_weightage),
        ] {
            require_weightage(field, value)?;
        }
        require_display_order("CategoryDisplayOrder", self.category_display_order)?;
        require_display_order("SubCategoryDisplayOrder", self.sub_category_display_order)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn department_uses_pascal_case_fields() {
        let v = serde_json::to_value(department("D01")).unwrap();
        assert_eq!(v["DepartmentCode"], "D01");
        assert_eq!(v["DepartmentWeightage"], 40.0);
        assert!(v.get("department_code").is_none());
    }

    #[test]
    fn department_weightage_out_of_range() {
        let mut d = department("D01");
        d.department_weightage = 120.0;
        let err = d.validate().unwrap_err();
        assert!(err.to_string().contains("DepartmentWeightage"));
    }

    #[test]
    fn sub_category_fixture_is_valid() {
        assert!(sub_category("D", "S", "SS", "C", "SC").validate().is_ok());
    }

    #[test]
    fn sub_category_negative_display_order_rejected() {
        let mut sc = sub_category("D", "S", "SS", "C", "SC");
        sc.sub_category_display_order = -1;
        assert!(sc.validate().is_err());
    }

    #[test]
    fn sub_category_missing_ancestor_field_fails_to_parse() {
        let mut v = serde_json::to_value(sub_category("D", "S", "SS", "C", "SC")).unwrap();
        v.as_object_mut().unwrap().remove("DepartmentDescription");
        assert!(serde_json::from_value::<SubCategory>(v).is_err());
    }
}
