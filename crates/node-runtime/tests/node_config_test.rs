//! Environment-driven node configuration.
//!
//! Environment variables are process-global, so every case runs inside one
//! test function.

use node_runtime::{ConfigError, NodeConfig};
use shared_types::NodeId;

const KEY: &str = "3d4017c3e843895a92b70aa74d1b7ebc9c982ccf2ec4968cc0cd55f12af4660c";

#[test]
fn test_node_config_from_env() {
    std::env::set_var("QC_ADDRESS_BOOK", format!("0:3:{KEY},1:4:{KEY}"));
    std::env::set_var(
        "QC_INTAKE_ORPHAN_BUFFER_SCHEDULER",
        "SEQUENTIAL CAPACITY(64) FLUSHABLE SQUELCHABLE",
    );
    let config = NodeConfig::from_env().unwrap();
    assert_eq!(config.address_book.len(), 2);
    assert_eq!(config.address_book.get(NodeId(1)).unwrap().weight, 4);
    assert_eq!(
        config.intake.schedulers.orphan_buffer.unhandled_task_capacity,
        Some(64)
    );

    std::env::set_var("QC_INTAKE_ORPHAN_BUFFER_SCHEDULER", "SEQUENTIAL FLUSHABLE");
    assert!(matches!(NodeConfig::from_env(), Err(ConfigError::Intake(_))));
    std::env::remove_var("QC_INTAKE_ORPHAN_BUFFER_SCHEDULER");

    std::env::set_var("QC_ADDRESS_BOOK", "0:3:nothex");
    assert!(matches!(
        NodeConfig::from_env(),
        Err(ConfigError::InvalidAddressBookEntry { .. })
    ));
    std::env::remove_var("QC_ADDRESS_BOOK");

    assert!(NodeConfig::from_env().unwrap().address_book.is_empty());
}
