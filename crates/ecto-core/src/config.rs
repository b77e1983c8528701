//! Run configuration.
//!
//! Loaded once before the scheduler starts and never mutated afterwards.
//! Every section defaults, so an empty file (or none at all) is a valid
//! configuration.

use crate::items::{
    BONEMEAL, BUCKET_OF_SLIME, BankLocation, BoneType, ECTOPHIAL, EMPTY_BUCKET, EMPTY_POT,
};
use ecto_proto::{ResourceKind, SupplyRequirement, SupplyRole};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Slots in the bounded container.
pub const CONTAINER_CAPACITY: u32 = 28;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EctoConfig {
    pub activity: ActivityConfig,
    pub watchdog: WatchdogConfig,
    pub scheduler: SchedulerConfig,
}

/// What the cycle consumes and where it restocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityConfig {
    pub bone_type: BoneType,
    pub bank_location: BankLocation,
    /// Target quantity of the primary resource and of each container kind.
    pub supplies_per_type: u32,
    /// Store category tab holding the supplies.
    pub store_category: u32,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            bone_type: BoneType::default(),
            bank_location: BankLocation::default(),
            supplies_per_type: 8,
            store_category: 0,
        }
    }
}

/// Progress watchdog settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    pub enabled: bool,
    pub timeout_minutes: u64,
    /// Exclude disconnected time from the progress timeout.
    pub pause_during_logout: bool,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_minutes: 5,
            pause_during_logout: true,
        }
    }
}

impl WatchdogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_minutes * 60)
    }
}

/// Scheduler cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Suspension returned when no task is eligible.
    pub idle_suspension_ms: u64,
    /// Suspension returned after an unexpected fault.
    pub fault_suspension_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            idle_suspension_ms: 500,
            fault_suspension_ms: 1000,
        }
    }
}

/// Resource kinds the recovery routine and production tasks read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityKinds {
    pub primary: ResourceKind,
    pub pot: ResourceKind,
    pub bucket: ResourceKind,
    pub slime: ResourceKind,
    pub bonemeal: ResourceKind,
    pub anchors: Vec<ResourceKind>,
}

impl ActivityKinds {
    /// Empty containers, filled during the cycle.
    pub fn containers(&self) -> [ResourceKind; 2] {
        [self.pot, self.bucket]
    }

    /// Primary resource and empty containers.
    pub fn supplies(&self) -> impl Iterator<Item = ResourceKind> + '_ {
        std::iter::once(self.primary).chain(self.containers())
    }

    /// Every kind the activity tracks.
    pub fn all(&self) -> Vec<ResourceKind> {
        let mut kinds: Vec<ResourceKind> = self.supplies().collect();
        kinds.push(self.slime);
        kinds.push(self.bonemeal);
        kinds.extend(self.anchors.iter().copied());
        kinds
    }
}

impl EctoConfig {
    /// Loads and validates configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_yaml(&content)
    }

    /// Parses and validates configuration from a YAML string.
    pub fn parse_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let per_type = self.activity.supplies_per_type;
        if per_type == 0 {
            return Err(ConfigError::Invalid(
                "activity.supplies_per_type must be positive".to_string(),
            ));
        }

        let kinds = self.activity_kinds();
        let slots = u64::from(per_type) * (1 + kinds.containers().len() as u64)
            + kinds.anchors.len() as u64;
        if slots > u64::from(CONTAINER_CAPACITY) {
            return Err(ConfigError::Invalid(format!(
                "activity needs {slots} slots but the container holds {CONTAINER_CAPACITY}"
            )));
        }

        if self.watchdog.enabled && self.watchdog.timeout_minutes == 0 {
            return Err(ConfigError::Invalid(
                "watchdog.timeout_minutes must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Kinds tracked by the activity.
    pub fn activity_kinds(&self) -> ActivityKinds {
        let mut anchors = vec![ECTOPHIAL];
        anchors.extend(self.activity.bank_location.teleport_item());

        ActivityKinds {
            primary: self.activity.bone_type.resource(),
            pot: EMPTY_POT,
            bucket: EMPTY_BUCKET,
            slime: BUCKET_OF_SLIME,
            bonemeal: BONEMEAL,
            anchors,
        }
    }

    /// Ordered targets: primary first, then containers, then anchors.
    pub fn supply_requirement(&self) -> SupplyRequirement {
        let kinds = self.activity_kinds();
        let per_type = self.activity.supplies_per_type;

        let mut requirement = SupplyRequirement::new().with(kinds.primary, SupplyRole::Primary, per_type);
        for container in kinds.containers() {
            requirement = requirement.with(container, SupplyRole::Container, per_type);
        }
        for anchor in &kinds.anchors {
            requirement = requirement.with(*anchor, SupplyRole::Anchor, 1);
        }
        requirement
    }
}
