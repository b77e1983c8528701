//! Item catalogue for the activity.

use ecto_proto::ResourceKind;
use serde::{Deserialize, Serialize};

pub const ECTOPHIAL: ResourceKind = ResourceKind::new(4251, "Ectophial");
pub const EMPTY_POT: ResourceKind = ResourceKind::new(1931, "Pot");
pub const EMPTY_BUCKET: ResourceKind = ResourceKind::new(1925, "Bucket");
pub const BUCKET_OF_SLIME: ResourceKind = ResourceKind::new(4286, "Bucket of slime");
pub const BONEMEAL: ResourceKind = ResourceKind::new(1854, "Bonemeal");

/// Bones that can be ground and offered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoneType {
    #[default]
    Bones,
    BigBones,
    BabydragonBones,
    DragonBones,
    WyvernBones,
    DagannothBones,
    LavaDragonBones,
    SuperiorDragonBones,
}

impl BoneType {
    pub fn resource(self) -> ResourceKind {
        match self {
            BoneType::Bones => ResourceKind::new(526, "Bones"),
            BoneType::BigBones => ResourceKind::new(532, "Big bones"),
            BoneType::BabydragonBones => ResourceKind::new(534, "Babydragon bones"),
            BoneType::DragonBones => ResourceKind::new(536, "Dragon bones"),
            BoneType::WyvernBones => ResourceKind::new(6812, "Wyvern bones"),
            BoneType::DagannothBones => ResourceKind::new(6729, "Dagannoth bones"),
            BoneType::LavaDragonBones => ResourceKind::new(11943, "Lava dragon bones"),
            BoneType::SuperiorDragonBones => ResourceKind::new(22124, "Superior dragon bones"),
        }
    }
}

/// Where the restock happens, and what it takes to get back there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankLocation {
    /// Bank reachable on foot from the altar.
    #[default]
    PortPhasmatys,
    Varrock,
    Falador,
    CastleWars,
}

impl BankLocation {
    /// Teleport item the return trip depends on, if any.
    pub fn teleport_item(self) -> Option<ResourceKind> {
        match self {
            BankLocation::PortPhasmatys => None,
            BankLocation::Varrock => Some(ResourceKind::new(8007, "Varrock teleport")),
            BankLocation::Falador => Some(ResourceKind::new(8009, "Falador teleport")),
            BankLocation::CastleWars => Some(ResourceKind::new(2552, "Ring of dueling(8)")),
        }
    }

    pub fn requires_item(self) -> bool {
        self.teleport_item().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bone_type_deserializes_snake_case() {
        let bone: BoneType = serde_yaml::from_str("dragon_bones").unwrap();
        assert_eq!(bone.resource().id, 536);
    }

    #[test]
    fn test_only_remote_banks_need_teleport() {
        assert!(!BankLocation::PortPhasmatys.requires_item());
        assert!(BankLocation::Varrock.requires_item());
        assert_eq!(BankLocation::CastleWars.teleport_item().unwrap().id, 2552);
    }
}
