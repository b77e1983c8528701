//! `ecto check-config`: validate and print the resolved configuration.

use anyhow::Result;
use ecto_core::EctoConfig;
use ecto_proto::SupplyRole;

pub fn execute(config: &EctoConfig) -> Result<()> {
    let activity = &config.activity;
    println!("Bones:          {}", activity.bone_type.resource());
    println!("Bank location:  {:?}", activity.bank_location);
    println!("Store category: {}", activity.store_category);

    println!("Supplies:");
    for entry in config.supply_requirement().entries() {
        let role = match entry.role {
            SupplyRole::Primary => "primary",
            SupplyRole::Container => "container",
            SupplyRole::Anchor => "anchor",
        };
        println!("  {:<10} {} x{}", role, entry.kind, entry.target);
    }

    if config.watchdog.enabled {
        println!(
            "Watchdog:       {} min{}",
            config.watchdog.timeout_minutes,
            if config.watchdog.pause_during_logout {
                ", paused while disconnected"
            } else {
                ""
            }
        );
    } else {
        println!("Watchdog:       disabled");
    }

    println!(
        "Scheduler:      idle {} ms, fault {} ms",
        config.scheduler.idle_suspension_ms, config.scheduler.fault_suspension_ms
    );
    Ok(())
}
