//! # Prometheus Metrics
//!
//! Counters and gauges for ledger activity, registered in a dedicated
//! [`prometheus::Registry`] so an embedder can merge them into whatever it
//! already scrapes.
//!
//! Handles are cheap clones around `Arc`s. Metric updates are observational
//! only: rolling back an aborted transaction does not roll back the counters
//! it touched, and `aborted_transactions_total` counts exactly those.

use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// All metric handles for one ledger instance.
#[derive(Clone)]
pub struct LedgerMetrics {
    registry: Registry,
    /// Currencies registered.
    pub currencies_registered_total: IntCounter,
    /// Accounts created, by role name.
    pub accounts_created_total: IntCounterVec,
    /// Value minted, by currency code.
    pub minted_value_total: IntCounterVec,
    /// Value burned, by currency code.
    pub burned_value_total: IntCounterVec,
    /// Successful payments.
    pub payments_total: IntCounter,
    /// Transactions whose effects were discarded.
    pub aborted_transactions_total: IntCounterVec,
    /// Entries currently waiting in preburn queues, across all dealers.
    pub preburn_queue_entries: IntGauge,
}

fn counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
    let metric = IntCounter::new(name, help).expect("metric creation");
    registry
        .register(Box::new(metric.clone()))
        .expect("metric registration");
    metric
}

fn counter_vec(registry: &Registry, name: &str, help: &str, label: &str) -> IntCounterVec {
    let metric = IntCounterVec::new(Opts::new(name, help), &[label]).expect("metric creation");
    registry
        .register(Box::new(metric.clone()))
        .expect("metric registration");
    metric
}

impl LedgerMetrics {
    /// Creates and registers all metrics under `namespace`.
    ///
    /// `namespace` must be a valid Prometheus identifier;
    /// [`LedgerConfig::validate`](crate::config::LedgerConfig::validate)
    /// checks this.
    pub fn new(namespace: &str) -> Self {
        let registry = Registry::new_custom(Some(namespace.to_string()), None)
            .expect("failed to create prometheus registry");

        let currencies_registered_total = counter(
            &registry,
            "currencies_registered_total",
            "Number of currencies registered",
        );
        let accounts_created_total = counter_vec(
            &registry,
            "accounts_created_total",
            "Number of accounts created, by role",
            "role",
        );
        let minted_value_total = counter_vec(
            &registry,
            "minted_value_total",
            "Total value minted, in base units, by currency",
            "currency",
        );
        let burned_value_total = counter_vec(
            &registry,
            "burned_value_total",
            "Total value burned, in base units, by currency",
            "currency",
        );
        let payments_total = counter(&registry, "payments_total", "Number of completed payments");
        let aborted_transactions_total = counter_vec(
            &registry,
            "aborted_transactions_total",
            "Transactions aborted with all effects discarded, by error category",
            "category",
        );

        let preburn_queue_entries = IntGauge::new(
            "preburn_queue_entries",
            "Entries currently queued for burning across all dealers",
        )
        .expect("metric creation");
        registry
            .register(Box::new(preburn_queue_entries.clone()))
            .expect("metric registration");

        Self {
            registry,
            currencies_registered_total,
            accounts_created_total,
            minted_value_total,
            burned_value_total,
            payments_total,
            aborted_transactions_total,
            preburn_queue_entries,
        }
    }

    /// The registry owning every metric above.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all registered metrics into the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

impl Default for LedgerMetrics {
    fn default() -> Self {
        Self::new("meridian")
    }
}

impl std::fmt::Debug for LedgerMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerMetrics")
            .field("payments_total", &self.payments_total.get())
            .field("preburn_queue_entries", &self.preburn_queue_entries.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_contains_namespaced_metrics() {
        let metrics = LedgerMetrics::new("test_ledger");
        metrics.payments_total.inc();
        metrics
            .minted_value_total
            .with_label_values(&["XUS"])
            .inc_by(500);

        let text = metrics.encode().unwrap();
        assert!(text.contains("test_ledger_payments_total 1"));
        assert!(text.contains("test_ledger_minted_value_total{currency=\"XUS\"} 500"));
    }

    #[test]
    fn independent_instances_do_not_collide() {
        let a = LedgerMetrics::default();
        let b = LedgerMetrics::default();
        a.payments_total.inc();
        assert_eq!(b.payments_total.get(), 0);
    }
}
