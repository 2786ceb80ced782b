//! Best-effort plan persistence with retry

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use fjall::Keyspace;
use serde::{Deserialize, Serialize};
use tokio::task;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::PersistenceConfig;
use crate::models::PassagePlan;

/// Storage backend for assembled plans; the planner only needs success or failure
#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn save(&self, plan: &PassagePlan) -> Result<()>;
}

/// Result of a save attempt sequence
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SaveOutcome {
    pub saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Retries [`PlanStore::save`] with exponential backoff
pub struct PersistenceGateway {
    store: Arc<dyn PlanStore>,
    max_attempts: u32,
    base_delay: Duration,
    attempt_timeout: Duration,
}

impl PersistenceGateway {
    #[must_use]
    pub fn new(store: Arc<dyn PlanStore>, config: &PersistenceConfig) -> Self {
        Self {
            store,
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay(),
            attempt_timeout: config.attempt_timeout(),
        }
    }

    /// Save `plan`, retrying failures.
    ///
    /// Never fails: exhaustion yields `saved: false` with a message for the
    /// user and a critical audit log entry.
    #[instrument(name = "save_plan", skip(self, plan), fields(plan_id = %plan.id))]
    pub async fn save(&self, plan: &PassagePlan) -> SaveOutcome {
        let mut delay = self.base_delay;
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            let attempt_result = tokio::time::timeout(self.attempt_timeout, self.store.save(plan))
                .await
                .unwrap_or_else(|_| {
                    Err(anyhow::anyhow!(
                        "save timed out after {} ms",
                        self.attempt_timeout.as_millis()
                    ))
                });
            match attempt_result {
                Ok(()) => {
                    info!(attempt, "Passage plan saved");
                    return SaveOutcome {
                        saved: true,
                        error: None,
                    };
                }
                Err(e) => {
                    warn!(attempt, max_attempts = self.max_attempts, "Saving plan failed: {e:#}");
                    last_error = format!("{e:#}");
                    if attempt < self.max_attempts {
                        tokio::time::sleep(delay).await;
                        delay = delay.saturating_mul(2);
                    }
                }
            }
        }

        error!(
            target: "audit",
            plan_id = %plan.id,
            user_id = plan.request.user_id.as_deref().unwrap_or("unknown"),
            attempts = self.max_attempts,
            error = %last_error,
            "CRITICAL: passage plan not persisted, potential data loss"
        );

        SaveOutcome {
            saved: false,
            error: Some(format!(
                "Plan could not be saved after {} attempts. Export a local backup of this plan.",
                self.max_attempts
            )),
        }
    }
}

/// Plan store on an embedded fjall keyspace
pub struct FjallPlanStore {
    store: Keyspace,
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> Result<Option<Vec<u8>>> {
    Ok(store.get(key)?.map(|v| v.to_vec()))
}

fn plan_key(id: Uuid) -> Vec<u8> {
    format!("plan:{id}").into_bytes()
}

impl FjallPlanStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = fjall::Database::builder(path)
            .open()
            .with_context(|| format!("Failed to open plan store at {}", path.display()))?;
        let items = db.keyspace("plans", fjall::KeyspaceCreateOptions::default)?;
        Ok(Self { store: items })
    }

    /// Open the store at the configured location
    pub fn from_config(config: &PersistenceConfig) -> Result<Self> {
        Self::open(config.store_path())
    }

    /// Load a previously saved plan
    pub async fn load(&self, id: Uuid) -> Result<Option<PassagePlan>> {
        let store = self.store.clone();
        let key = plan_key(id);

        let maybe_bytes = task::spawn_blocking(move || get_from_store(store, key)).await??;
        maybe_bytes
            .map(|bytes| serde_json::from_slice(&bytes).context("Stored plan is corrupt"))
            .transpose()
    }
}

#[async_trait]
impl PlanStore for FjallPlanStore {
    async fn save(&self, plan: &PassagePlan) -> Result<()> {
        let store = self.store.clone();
        let key = plan_key(plan.id);
        let bytes = serde_json::to_vec(plan).context("Failed to serialize plan")?;

        task::spawn_blocking(move || store.insert(key, bytes)).await??;
        Ok(())
    }
}
