// SPDX-License-Identifier: BUSL-1.1
//! # Route Policy Table
//!
//! Which roles may read or write under each `/v1` route prefix. `GET`,
//! `HEAD` and `OPTIONS` are reads; every other method is a write.
//!
//! Prefixes match on whole path segments, and the longest match wins.
//! A path no prefix covers is let through to the router, which answers 404.

use axum::http::Method;

use crate::auth::Role;
use crate::auth::Role::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl Access {
    pub fn of(method: &Method) -> Self {
        match *method {
            Method::GET | Method::HEAD | Method::OPTIONS => Self::Read,
            _ => Self::Write,
        }
    }
}

#[derive(Debug)]
pub struct RoutePolicy {
    pub prefix: &'static str,
    pub read: &'static [Role],
    pub write: &'static [Role],
}

impl RoutePolicy {
    fn covers(&self, path: &str) -> bool {
        path.strip_prefix(self.prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    pub fn allows(&self, access: Access, role: Role) -> bool {
        match access {
            Access::Read => self.read.contains(&role),
            Access::Write => self.write.contains(&role),
        }
    }
}

const EVERYONE: &[Role] = &Role::ALL;
const ADMINS: &[Role] = &[Admin, SuperAdmin];
const SURVEY_ADMINS: &[Role] = &[Admin, SuperAdmin, SurveyAdmin];
const COORDINATOR_ROLES: &[Role] = &[SurveyAdmin, District, Division, Block, Sme, SuperAdmin];
const DASHBOARD_ROLES: &[Role] = &[Admin, SuperAdmin, SurveyAdmin, Division, District, Block];

pub const POLICIES: &[RoutePolicy] = &[
    RoutePolicy { prefix: "/v1/division", read: EVERYONE, write: ADMINS },
    RoutePolicy { prefix: "/v1/district", read: EVERYONE, write: ADMINS },
    RoutePolicy { prefix: "/v1/block", read: EVERYONE, write: ADMINS },
    RoutePolicy { prefix: "/v1/school", read: EVERYONE, write: ADMINS },
    RoutePolicy { prefix: "/v1/department", read: EVERYONE, write: ADMINS },
    RoutePolicy { prefix: "/v1/sub-department", read: EVERYONE, write: ADMINS },
    RoutePolicy { prefix: "/v1/sub-sub-department", read: EVERYONE, write: ADMINS },
    RoutePolicy { prefix: "/v1/category", read: EVERYONE, write: ADMINS },
    RoutePolicy { prefix: "/v1/sub-category", read: EVERYONE, write: ADMINS },
    RoutePolicy { prefix: "/v1/survey-questions", read: EVERYONE, write: SURVEY_ADMINS },
    RoutePolicy { prefix: "/v1/master-project", read: EVERYONE, write: SURVEY_ADMINS },
    RoutePolicy { prefix: "/v1/audit-answer", read: EVERYONE, write: EVERYONE },
    RoutePolicy {
        prefix: "/v1/assign-coordinators",
        read: COORDINATOR_ROLES,
        write: COORDINATOR_ROLES,
    },
    RoutePolicy { prefix: "/v1/dashboard", read: DASHBOARD_ROLES, write: &[] },
];

/// Longest-prefix policy covering `path`.
pub fn lookup(path: &str) -> Option<&'static RoutePolicy> {
    POLICIES
        .iter()
        .filter(|p| p.covers(path))
        .max_by_key(|p| p.prefix.len())
}

pub fn is_allowed(method: &Method, path: &str, role: Role) -> bool {
    match lookup(path) {
        Some(policy) => policy.allows(Access::of(method), role),
        None => true,
    }
}
