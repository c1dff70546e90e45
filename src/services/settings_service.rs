use std::sync::RwLock;

use serde_json::json;
use tracing::{info, warn};

use crate::db::repositories::settings_repository::SettingsRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::settings::{
    LevelCutoffs, OverallWeights, RecommendationThresholds, ScoringConfig, ScoringConfigUpdate,
};

const KEY_SCORING_CONFIG: &str = "scoring_config";
const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Scoring constants persisted in `app_settings`, cached after first read.
pub struct SettingsService {
    db: DbPool,
    cache: RwLock<Option<ScoringConfig>>,
}

impl SettingsService {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            cache: RwLock::new(None),
        }
    }

    pub fn get(&self) -> AppResult<ScoringConfig> {
        if let Ok(guard) = self.cache.read() {
            if let Some(config) = guard.as_ref() {
                return Ok(*config);
            }
        }

        let config = self.load_from_db()?;
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(config);
        }
        Ok(config)
    }

    pub fn update(&self, input: ScoringConfigUpdate) -> AppResult<ScoringConfig> {
        let mut current = self.get()?;

        if let Some(weights) = input.weights {
            ensure_valid_weights(&weights)?;
            current.weights = weights;
        }

        if let Some(thresholds) = input.thresholds {
            ensure_valid_thresholds(&thresholds)?;
            current.thresholds = thresholds;
        }

        if let Some(cutoffs) = input.level_cutoffs {
            ensure_valid_cutoffs(&cutoffs)?;
            current.level_cutoffs = cutoffs;
        }

        if let Some(limit) = input.max_upload_bytes {
            if limit == 0 {
                return Err(AppError::invalid_input("max upload size must be positive"));
            }
            current.max_upload_bytes = limit;
        }

        let payload = serde_json::to_string(&current)?;
        self.db
            .with_connection(|conn| SettingsRepository::upsert(conn, KEY_SCORING_CONFIG, &payload))?;

        info!(target: "app::settings", "scoring configuration updated");
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(current);
        }
        Ok(current)
    }

    /// Drop stored overrides and fall back to the built-in defaults.
    pub fn reset(&self) -> AppResult<ScoringConfig> {
        self.db
            .with_connection(|conn| SettingsRepository::delete(conn, KEY_SCORING_CONFIG))?;

        let defaults = ScoringConfig::default();
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(defaults);
        }
        Ok(defaults)
    }

    fn load_from_db(&self) -> AppResult<ScoringConfig> {
        let stored = self
            .db
            .with_connection(|conn| SettingsRepository::get(conn, KEY_SCORING_CONFIG))?;

        let Some(row) = stored else {
            return Ok(ScoringConfig::default());
        };

        match serde_json::from_str::<ScoringConfig>(&row.value) {
            Ok(config) if validate(&config).is_ok() => Ok(config),
            Ok(_) => {
                warn!(
                    target: "app::settings",
                    "stored scoring configuration is out of range; using defaults"
                );
                Ok(ScoringConfig::default())
            }
            Err(err) => {
                warn!(
                    target: "app::settings",
                    error = %err,
                    "failed to decode stored scoring configuration; using defaults"
                );
                Ok(ScoringConfig::default())
            }
        }
    }
}

pub fn validate(config: &ScoringConfig) -> AppResult<()> {
    ensure_valid_weights(&config.weights)?;
    ensure_valid_thresholds(&config.thresholds)?;
    ensure_valid_cutoffs(&config.level_cutoffs)?;
    if config.max_upload_bytes == 0 {
        return Err(AppError::invalid_input("max upload size must be positive"));
    }
    Ok(())
}

fn ensure_valid_weights(weights: &OverallWeights) -> AppResult<()> {
    let parts = [weights.composition, weights.color, weights.technique];
    if parts.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(AppError::invalid_input_with_details(
            "weights must be non-negative",
            json!({ "weights": parts }),
        ));
    }
    if (weights.total() - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(AppError::invalid_input_with_details(
            "overall weights must sum to 1",
            json!({ "total": weights.total() }),
        ));
    }
    Ok(())
}

fn ensure_valid_thresholds(thresholds: &RecommendationThresholds) -> AppResult<()> {
    let values = [
        ("compositionBalance", thresholds.composition_balance),
        ("colorHarmony", thresholds.color_harmony),
        ("techniquePrecision", thresholds.technique_precision),
    ];
    for (name, value) in values {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(AppError::invalid_input_with_details(
                "recommendation thresholds must be within [0, 1]",
                json!({ "threshold": name, "value": value }),
            ));
        }
    }
    Ok(())
}

fn ensure_valid_cutoffs(cutoffs: &LevelCutoffs) -> AppResult<()> {
    let ordered = cutoffs.intermediate.is_finite()
        && cutoffs.advanced.is_finite()
        && cutoffs.intermediate > 0.0
        && cutoffs.intermediate < cutoffs.advanced
        && cutoffs.advanced <= 1.0;
    if !ordered {
        return Err(AppError::invalid_input_with_details(
            "level cutoffs must satisfy 0 < intermediate < advanced <= 1",
            json!({ "intermediate": cutoffs.intermediate, "advanced": cutoffs.advanced }),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::error::ErrorKind;

    fn service() -> (tempfile::TempDir, SettingsService) {
        let dir = tempdir().unwrap();
        let pool = DbPool::new(dir.path().join("settings.sqlite")).unwrap();
        (dir, SettingsService::new(pool))
    }

    #[test]
    fn defaults_when_nothing_stored() {
        let (_dir, settings) = service();
        assert_eq!(settings.get().unwrap(), ScoringConfig::default());
    }

    #[test]
    fn update_persists_across_instances() {
        let (dir, settings) = service();
        let weights = OverallWeights {
            composition: 0.5,
            color: 0.25,
            technique: 0.25,
        };
        settings
            .update(ScoringConfigUpdate {
                weights: Some(weights),
                ..Default::default()
            })
            .unwrap();

        let reopened =
            SettingsService::new(DbPool::new(dir.path().join("settings.sqlite")).unwrap());
        assert_eq!(reopened.get().unwrap().weights, weights);
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let (_dir, settings) = service();
        let err = settings
            .update(ScoringConfigUpdate {
                weights: Some(OverallWeights {
                    composition: 0.5,
                    color: 0.5,
                    technique: 0.5,
                }),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(settings.get().unwrap(), ScoringConfig::default());
    }

    #[test]
    fn rejects_unordered_cutoffs() {
        let (_dir, settings) = service();
        let err = settings
            .update(ScoringConfigUpdate {
                level_cutoffs: Some(LevelCutoffs {
                    intermediate: 0.8,
                    advanced: 0.7,
                }),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn reset_restores_defaults() {
        let (_dir, settings) = service();
        settings
            .update(ScoringConfigUpdate {
                max_upload_bytes: Some(1024),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(settings.get().unwrap().max_upload_bytes, 1024);

        assert_eq!(settings.reset().unwrap(), ScoringConfig::default());
        assert_eq!(settings.get().unwrap(), ScoringConfig::default());
    }
}
