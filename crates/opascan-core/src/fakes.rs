//! In-memory evaluation gateway for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::gateway::{Binding, EvaluationGateway, EvaluationRequest, GatewayError};

/// Returns a canned outcome and remembers what it was asked.
pub struct StaticGateway {
    outcome: Result<Vec<Binding>, GatewayError>,
    last_request: Mutex<Option<EvaluationRequest>>,
}

impl StaticGateway {
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self {
            outcome: Ok(bindings),
            last_request: Mutex::new(None),
        }
    }

    /// A gateway that fails every evaluation with `error`.
    pub fn failing(error: GatewayError) -> Self {
        Self {
            outcome: Err(error),
            last_request: Mutex::new(None),
        }
    }

    pub fn last_request(&self) -> Option<EvaluationRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl EvaluationGateway for StaticGateway {
    async fn evaluate(&self, request: &EvaluationRequest) -> Result<Vec<Binding>, GatewayError> {
        *self.last_request.lock().unwrap() = Some(request.clone());
        self.outcome.clone()
    }
}
