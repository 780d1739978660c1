// SPDX-License-Identifier: BUSL-1.1
//! # Application State
//!
//! Shared state passed to all route handlers via Axum's `State` extractor:
//! one [`Collection`] per entity, the optional Postgres pool, and the
//! configuration read at startup.

use sqlx::PgPool;
use survey_core::model::{
    AuditAnswer, Block, Category, CoordinatorAssignment, Department, District, Division,
    MasterProject, School, SubCategory, SubDepartment, SubSubDepartment, SurveyQuestions,
};
use survey_core::{Collection, Document};

use crate::middleware::metrics::ApiMetrics;

/// Default cap on bulk-upload request bodies (5 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Application configuration.
///
/// Custom `Debug` redacts the JWT secret to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// HS256 secret for bearer tokens. If `None`, authentication is disabled.
    pub jwt_secret: Option<String>,
    pub metrics_enabled: bool,
    /// Body limit for the CSV bulk-upload route.
    pub max_upload_bytes: usize,
    /// Emit logs as JSON lines.
    pub log_json: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "[REDACTED]"))
            .field("metrics_enabled", &self.metrics_enabled)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("log_json", &self.log_json)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            jwt_secret: None,
            metrics_enabled: true,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            log_json: false,
        }
    }
}

impl AppConfig {
    /// Read configuration from `SURVEY_*` environment variables.
    ///
    /// Unparsable values fall back to the default with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let port = parse_or(&get, "SURVEY_PORT", defaults.port);
        let max_upload_bytes = parse_or(&get, "SURVEY_MAX_UPLOAD_BYTES", defaults.max_upload_bytes);
        let jwt_secret = get("SURVEY_JWT_SECRET").filter(|s| !s.is_empty());
        let metrics_enabled = get("SURVEY_METRICS_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(defaults.metrics_enabled);
        let log_json = get("SURVEY_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(defaults.log_json);

        Self {
            port,
            jwt_secret,
            metrics_enabled,
            max_upload_bytes,
            log_json,
        }
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match get(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, fallback = %default, "invalid config value, using default");
            default
        }),
    }
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    // -- Geography --
    pub divisions: Collection<Division>,
    pub districts: Collection<District>,
    pub blocks: Collection<Block>,
    pub schools: Collection<School>,

    // -- Department hierarchy --
    pub departments: Collection<Department>,
    pub sub_departments: Collection<SubDepartment>,
    pub sub_sub_departments: Collection<SubSubDepartment>,
    pub categories: Collection<Category>,
    pub sub_categories: Collection<SubCategory>,

    // -- Surveys and answers --
    pub survey_questions: Collection<SurveyQuestions>,
    pub master_projects: Collection<MasterProject>,
    pub audit_answers: Collection<AuditAnswer>,
    pub coordinator_assignments: Collection<CoordinatorAssignment>,

    /// PostgreSQL pool. `None` runs in-memory only.
    pub db_pool: Option<PgPool>,
    /// Prometheus registry. `None` when metrics are disabled.
    pub metrics: Option<ApiMetrics>,
    pub config: AppConfig,
}

impl AppState {
    /// In-memory state with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        let metrics = if config.metrics_enabled {
            match ApiMetrics::new() {
                Ok(m) => Some(m),
                Err(e) => {
                    tracing::error!(error = %e, "failed to register metrics, continuing without them");
                    None
                }
            }
        } else {
            None
        };

        Self {
            divisions: Collection::new(),
            districts: Collection::new(),
            blocks: Collection::new(),
            schools: Collection::new(),
            departments: Collection::new(),
            sub_departments: Collection::new(),
            sub_sub_departments: Collection::new(),
            categories: Collection::new(),
            sub_categories: Collection::new(),
            survey_questions: Collection::new(),
            master_projects: Collection::new(),
            audit_answers: Collection::new(),
            coordinator_assignments: Collection::new(),
            db_pool,
            metrics,
            config,
        }
    }

    /// `(collection, document count)` for every entity, in a fixed order.
    pub fn collection_counts(&self) -> Vec<(&'static str, usize)> {
        vec![
            (Division::COLLECTION, self.divisions.len()),
            (District::COLLECTION, self.districts.len()),
            (Block::COLLECTION, self.blocks.len()),
            (School::COLLECTION, self.schools.len()),
            (Department::COLLECTION, self.departments.len()),
            (SubDepartment::COLLECTION, self.sub_departments.len()),
            (SubSubDepartment::COLLECTION, self.sub_sub_departments.len()),
            (Category::COLLECTION, self.categories.len()),
            (SubCategory::COLLECTION, self.sub_categories.len()),
            (SurveyQuestions::COLLECTION, self.survey_questions.len()),
            (MasterProject::COLLECTION, self.master_projects.len()),
            (AuditAnswer::COLLECTION, self.audit_answers.len()),
            (CoordinatorAssignment::COLLECTION, self.coordinator_assignments.len()),
        ]
    }

    /// Load every collection from the database into memory.
    ///
    /// No-op without a pool. Called once at startup, before serving.
    pub async fn hydrate_from_db(&self) -> Result<(), String> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        hydrate(pool, &self.divisions).await?;
        hydrate(pool, &self.districts).await?;
        hydrate(pool, &self.blocks).await?;
        hydrate(pool, &self.schools).await?;
        hydrate(pool, &self.departments).await?;
        hydrate(pool, &self.sub_departments).await?;
        hydrate(pool, &self.sub_sub_departments).await?;
        hydrate(pool, &self.categories).await?;
        hydrate(pool, &self.sub_categories).await?;
        hydrate(pool, &self.survey_questions).await?;
        hydrate(pool, &self.master_projects).await?;
        hydrate(pool, &self.audit_answers).await?;
        hydrate(pool, &self.coordinator_assignments).await?;

        let total: usize = self.collection_counts().iter().map(|(_, n)| n).sum();
        tracing::info!(documents = total, "Hydrated in-memory stores from database");
        Ok(())
    }
}

async fn hydrate<T: Document>(pool: &PgPool, collection: &Collection<T>) -> Result<(), String> {
    let records = crate::db::documents::load_all::<T>(pool)
        .await
        .map_err(|e| format!("failed to load {}: {e}", T::COLLECTION))?;
    let count = records.len();
    for record in records {
        collection.restore(record);
    }
    tracing::debug!(collection = T::COLLECTION, count, "hydrated collection");
    Ok(())
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn config_defaults_when_env_empty() {
        let cfg = AppConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg.port, 3000);
        assert!(cfg.jwt_secret.is_none());
        assert!(cfg.metrics_enabled);
        assert_eq!(cfg.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert!(!cfg.log_json);
    }

    #[test]
    fn config_reads_overrides() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("SURVEY_PORT", "8081"),
            ("SURVEY_JWT_SECRET", "s3cret"),
            ("SURVEY_METRICS_ENABLED", "FALSE"),
            ("SURVEY_MAX_UPLOAD_BYTES", "1024"),
            ("SURVEY_LOG_FORMAT", "json"),
        ]));
        assert_eq!(cfg.port, 8081);
        assert_eq!(cfg.jwt_secret.as_deref(), Some("s3cret"));
        assert!(!cfg.metrics_enabled);
        assert_eq!(cfg.max_upload_bytes, 1024);
        assert!(cfg.log_json);
    }

    #[test]
    fn config_invalid_port_falls_back() {
        let cfg = AppConfig::from_lookup(lookup(&[("SURVEY_PORT", "not-a-port")]));
        assert_eq!(cfg.port, 3000);
    }

    #[test]
    fn config_empty_secret_disables_auth() {
        let cfg = AppConfig::from_lookup(lookup(&[("SURVEY_JWT_SECRET", "")]));
        assert!(cfg.jwt_secret.is_none());
    }

    #[test]
    fn config_debug_redacts_secret() {
        let cfg = AppConfig {
            jwt_secret: Some("super-secret-value".into()),
            ..AppConfig::default()
        };
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("super-secret-value"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn state_clones_share_collections() {
        let state = AppState::new();
        let clone = state.clone();
        state
            .divisions
            .create(Division {
                division_name: "North".into(),
                division_code: None,
            })
            .unwrap();
        assert_eq!(clone.divisions.len(), 1);
    }

    #[test]
    fn collection_counts_cover_every_entity() {
        let state = AppState::new();
        let counts = state.collection_counts();
        assert_eq!(counts.len(), 13);
        assert!(counts.iter().all(|(_, n)| *n == 0));
        assert!(counts.iter().any(|(c, _)| *c == "audit_answers"));
    }

    #[test]
    fn metrics_follow_config() {
        assert!(AppState::new().metrics.is_some());
        let off = AppConfig {
            metrics_enabled: false,
            ..AppConfig::default()
        };
        assert!(AppState::with_config(off, None).metrics.is_none());
    }

    #[tokio::test]
    async fn hydrate_without_pool_is_noop() {
        assert!(AppState::new().hydrate_from_db().await.is_ok());
    }
}
