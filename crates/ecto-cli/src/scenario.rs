//! Starting worlds for simulated runs.

use clap::ValueEnum;
use ecto_core::EctoConfig;
use ecto_core::items::{BUCKET_OF_SLIME, ECTOPHIAL, EMPTY_POT};
use ecto_core::testing::SimWorld;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Empty container, fully stocked store
    #[default]
    Fresh,
    /// Container caught between collecting slime and grinding
    MidCycle,
    /// Store holds no anchor item
    MissingAnchor,
    /// Container holds items the activity does not use
    Unwanted,
}

impl Scenario {
    pub fn build(self, config: &EctoConfig) -> SimWorld {
        let kinds = config.activity_kinds();
        let per_type = config.activity.supplies_per_type;
        let world = SimWorld::new(kinds.clone()).with_full_store();

        match self {
            Scenario::Fresh => world,
            Scenario::MidCycle => world
                .with_held(ECTOPHIAL, 1)
                .with_held(kinds.primary, per_type)
                .with_held(EMPTY_POT, per_type)
                .with_held(BUCKET_OF_SLIME, per_type / 2),
            Scenario::MissingAnchor => kinds
                .anchors
                .iter()
                .fold(world, |world, anchor| world.with_stored(*anchor, 0)),
            Scenario::Unwanted => world.with_held(kinds.primary, 3).with_junk(5),
        }
    }
}
