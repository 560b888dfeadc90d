// src/scaling/batch.rs

//! Batch calculations with per-item failure isolation

use super::engine::elapsed_ms;
use super::{CalculationRequest, CalculationResult, ScalingEngine};
use crate::error::{Error, Result};
use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};

/// A failed item of a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchError {
    /// Position of the request in the batch
    pub index: usize,
    pub product_id: String,
    /// Stable error category, see [`crate::error::ErrorKind`]
    pub kind: String,
    /// Caller-safe message
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total_requests: usize,
    pub successful: usize,
    pub failed: usize,
    /// Requests not attempted because the deadline had passed
    pub skipped: usize,
    pub total_time_ms: f64,
    /// Mean time per attempted request
    pub average_time_ms: f64,
    pub errors: Vec<BatchError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    /// Successful results in request order
    pub results: Vec<CalculationResult>,
    pub summary: BatchSummary,
}

impl ScalingEngine {
    /// Run every request independently
    ///
    /// A failing item is reported in the summary and never affects the
    /// others. When `deadline` passes, the remaining items are skipped.
    pub fn calculate_batch(
        &self,
        requests: &[CalculationRequest],
        deadline: Option<Instant>,
    ) -> Result<BatchResult> {
        let max = self.limits().max_batch_size;
        if requests.is_empty() {
            return Err(Error::InvalidInput("Batch must contain at least one request".into()));
        }
        if requests.len() > max {
            return Err(Error::InvalidInput(format!(
                "Batch of {} requests exceeds the maximum of {}",
                requests.len(),
                max
            )));
        }

        let start = Instant::now();
        let mut results = Vec::with_capacity(requests.len());
        let mut errors = Vec::new();
        let mut skipped = 0;

        for (index, request) in requests.iter().enumerate() {
            if let Some(deadline) = deadline
                && Instant::now() >= deadline
            {
                skipped = requests.len() - index;
                warn!("Batch deadline reached, skipping {} remaining requests", skipped);
                break;
            }

            match self.calculate(request) {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!("Batch item {} ({}) failed: {}", index, request.product_id, e);
                    errors.push(BatchError {
                        index,
                        product_id: request.product_id.clone(),
                        kind: e.kind().as_str().to_string(),
                        error: e.public_message(),
                    });
                }
            }
        }

        let total_time_ms = elapsed_ms(start);
        let attempted = results.len() + errors.len();
        let average_time_ms = if attempted == 0 {
            0.0
        } else {
            crate::units::round_half_up(total_time_ms / attempted as f64, 2)
        };

        let summary = BatchSummary {
            total_requests: requests.len(),
            successful: results.len(),
            failed: errors.len(),
            skipped,
            total_time_ms,
            average_time_ms,
            errors,
        };

        info!(
            "Batch finished: {} ok, {} failed, {} skipped in {:.2} ms",
            summary.successful, summary.failed, summary.skipped, summary.total_time_ms
        );
        Ok(BatchResult { results, summary })
    }
}
