use std::sync::Arc;

use crate::config::Config;
use crate::ratelimit::{AdmissionControl, InMemoryRateLimiter, RateLimitConfig};
use crate::reconcile::Reconciler;

#[derive(Clone)]
pub struct HandlerState {
    pub reconciler: Arc<Reconciler>,

    pub admission: Arc<dyn AdmissionControl>,

    /// Attach error details to failure bodies (development only).
    pub expose_details: bool,
}

impl HandlerState {
    pub fn new(reconciler: Arc<Reconciler>, admission: Arc<dyn AdmissionControl>) -> Self {
        Self {
            reconciler,
            admission,
            expose_details: false,
        }
    }

    pub fn with_expose_details(mut self, expose_details: bool) -> Self {
        self.expose_details = expose_details;
        self
    }

    /// Gemini/Vertex predictors and an in-memory limiter, all from `config`.
    pub fn from_config(config: &Config) -> Self {
        let reconciler = Arc::new(Reconciler::from_config(config));
        let limiter = Arc::new(InMemoryRateLimiter::new(RateLimitConfig::from_config(config)));
        Self::new(reconciler, limiter).with_expose_details(config.is_development())
    }
}

impl std::fmt::Debug for HandlerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerState")
            .field("reconciler", &self.reconciler)
            .field("expose_details", &self.expose_details)
            .finish_non_exhaustive()
    }
}
