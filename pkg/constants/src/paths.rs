//! Filesystem path constants.

/// Default config file path for the operator.
pub const DEFAULT_OPERATOR_CONFIG: &str = "/etc/appset-operator/config.yaml";

/// Default data directory for the SlateDB state store.
pub const DEFAULT_OPERATOR_DATA_DIR: &str = "/tmp/appset-operator-data";
