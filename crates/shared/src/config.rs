//! Runtime configuration for the payment engine.
//!
//! The reconciliation policy used to live in ambient system parameters in
//! the host ERP. It is modelled here as explicit configuration handed to
//! the orchestrator at construction so the policy is testable without a
//! shared mutable store.

use serde::Deserialize;

/// Policy controlling which payment directions defer reconciliation to a
/// background process instead of reconciling inline.
///
/// Deferring avoids contention when another process posts against the same
/// invoices concurrently.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ReconcilePolicy {
    /// Defer reconciliation of outbound supplier payments.
    #[serde(default)]
    pub skip_supplier_reconciliation: bool,
    /// Defer reconciliation of inbound customer payments.
    #[serde(default)]
    pub skip_customer_reconciliation: bool,
}

impl ReconcilePolicy {
    /// Loads the policy from `COBRO_*` environment variables and optional
    /// config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("COBRO").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_reconciles_inline() {
        let policy = ReconcilePolicy::default();
        assert!(!policy.skip_supplier_reconciliation);
        assert!(!policy.skip_customer_reconciliation);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let policy: ReconcilePolicy = serde_json::from_str("{}").unwrap();
        assert!(!policy.skip_supplier_reconciliation);

        let policy: ReconcilePolicy =
            serde_json::from_str(r#"{"skip_supplier_reconciliation": true}"#).unwrap();
        assert!(policy.skip_supplier_reconciliation);
        assert!(!policy.skip_customer_reconciliation);
    }
}
