//! Prometheus metrics for the canteen engine.
//!
//! This module provides metric collection for every engine component:
//! - Cart mutations
//! - Checkouts and order amounts
//! - Payment outcomes
//! - Order status transitions
//! - Optimistic concurrency retries
//!
//! Recording is a no-op until a recorder is installed, so tests and embedders
//! that don't care about metrics pay nothing.
//!
//! # Example
//!
//! ```rust,no_run
//! use canteen_engine::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // Serve `server.render()` at /metrics
//! # Ok(())
//! # }
//! ```

use canteen_core::order::OrderStatus;
use canteen_core::payment::PaymentOutcome;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics recorder handle.
///
/// Installs the global recorder; the web layer serves [`MetricsServer::render`]
/// on the configured address.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Socket address the scrape endpoint is served on (e.g., `0.0.0.0:9090`)
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Address the scrape endpoint should be served on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Describe all metrics and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g., in tests), this logs a
    /// warning and leaves [`MetricsServer::handle`] empty.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full("canteen_checkout_amount_cents".to_string()),
                &[
                    250.0, 500.0, 1_000.0, 2_000.0, 3_000.0, 5_000.0, 10_000.0, 20_000.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                register_metrics();
                self.handle = Some(handle);
                tracing::info!(
                    addr = %self.addr,
                    "Metrics recorder installed - scrape at http://{}/metrics",
                    self.addr
                );
                Ok(())
            },
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            },
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the recorder hasn't been installed by this server.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "canteen_cart_mutations_total",
        "Cart changes that were stored"
    );
    describe_counter!(
        "canteen_checkouts_total",
        "Orders created from a cart"
    );
    describe_histogram!(
        "canteen_checkout_amount_cents",
        "Order totals at checkout, in cents"
    );
    describe_counter!(
        "canteen_payments_total",
        "Payment resolutions by outcome"
    );
    describe_counter!(
        "canteen_order_transitions_total",
        "Order status changes by target status"
    );
    describe_counter!(
        "canteen_cas_retries_total",
        "Read-reduce-write cycles repeated after a version conflict"
    );
}

/// Cart metrics recorder.
pub struct CartMetrics;

impl CartMetrics {
    /// Record a stored cart change.
    pub fn record_mutation() {
        counter!("canteen_cart_mutations_total").increment(1);
    }
}

/// Ledger metrics recorder.
pub struct LedgerMetrics;

impl LedgerMetrics {
    /// Record a successful checkout.
    #[allow(clippy::cast_precision_loss)] // Cents fit comfortably in f64 for a histogram
    pub fn record_checkout(amount_cents: i64) {
        counter!("canteen_checkouts_total").increment(1);
        histogram!("canteen_checkout_amount_cents").record(amount_cents as f64);
    }
}

/// Payment metrics recorder.
pub struct PaymentMetrics;

impl PaymentMetrics {
    /// Record a payment resolution.
    pub fn record(outcome: &PaymentOutcome) {
        let label = match outcome {
            PaymentOutcome::Success => "success",
            PaymentOutcome::Failure { .. } => "failure",
        };
        counter!("canteen_payments_total", "outcome" => label).increment(1);
    }
}

/// Fulfillment metrics recorder.
pub struct FulfillmentMetrics;

impl FulfillmentMetrics {
    /// Record a status transition.
    pub fn record_transition(to: OrderStatus) {
        counter!("canteen_order_transitions_total", "to" => to.as_str()).increment(1);
    }
}

/// Optimistic concurrency metrics recorder.
pub struct CasMetrics;

impl CasMetrics {
    /// Record a conflicting attempt.
    pub fn record_retry(operation: &'static str) {
        counter!("canteen_cas_retries_total", "operation" => operation).increment(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_server_creation() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let server = MetricsServer::new(addr);
        assert!(server.handle().is_none());
        assert!(server.render().is_none());
    }

    #[test]
    fn test_metrics_server_render() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let mut server = MetricsServer::new(addr);
        server.start().unwrap();

        CartMetrics::record_mutation();
        LedgerMetrics::record_checkout(1997);
        PaymentMetrics::record(&PaymentOutcome::Success);
        FulfillmentMetrics::record_transition(OrderStatus::Ready);

        // Another test may have installed the recorder first; metrics are
        // still recorded, just not rendered through this handle.
        if let Some(rendered) = server.render() {
            assert!(rendered.contains("canteen_cart_mutations_total"));
            assert!(rendered.contains("canteen_checkouts_total"));
            assert!(rendered.contains("canteen_payments_total"));
            assert!(rendered.contains("canteen_order_transitions_total"));
        }
    }
}
