//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Login metrics
    pub static ref LOGINS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("authgate_logins_total", "Login attempts by outcome"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref LOGOUTS_TOTAL: IntCounter = IntCounter::new(
        "authgate_logouts_total",
        "Total number of logout requests"
    ).expect("metric can be created");

    // Session metrics
    pub static ref SESSIONS_CREATED_TOTAL: IntCounter = IntCounter::new(
        "authgate_sessions_created_total",
        "Total number of sessions created"
    ).expect("metric can be created");
    pub static ref SESSIONS_EXPIRED_TOTAL: IntCounter = IntCounter::new(
        "authgate_sessions_expired_total",
        "Total number of sessions reaped after expiry"
    ).expect("metric can be created");
    pub static ref SESSIONS_ACTIVE: IntGauge = IntGauge::new(
        "authgate_sessions_active",
        "Current number of live sessions in the store"
    ).expect("metric can be created");

    // Error metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("authgate_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(LOGINS_TOTAL.clone()))
        .expect("LOGINS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(LOGOUTS_TOTAL.clone()))
        .expect("LOGOUTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(SESSIONS_CREATED_TOTAL.clone()))
        .expect("SESSIONS_CREATED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(SESSIONS_EXPIRED_TOTAL.clone()))
        .expect("SESSIONS_EXPIRED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(SESSIONS_ACTIVE.clone()))
        .expect("SESSIONS_ACTIVE can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
