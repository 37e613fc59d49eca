//! Single-point propagation.

use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api::{PropPoint, PropRequest, PropResponse};
use crate::engine::TimeKind;
use crate::time::utc_to_ds50;

use super::{validate, PropagationService, ServiceError};

impl PropagationService {
    /// Propagate one satellite to a single point in time.
    pub async fn prop(
        &self,
        cancel: &CancellationToken,
        req: PropRequest,
    ) -> Result<PropResponse, ServiceError> {
        let _global = self.global_mu.lock().await;

        validate::validate_prop_request(&req).map_err(ServiceError::InvalidArgument)?;
        let started = Instant::now();

        let task = req
            .task
            .as_ref()
            .ok_or_else(|| ServiceError::InvalidArgument("task is required".to_string()))?;
        let sat = task
            .sat
            .as_ref()
            .ok_or_else(|| ServiceError::InvalidArgument("task must include a satellite".to_string()))?;

        // A UTC timestamp overrides the numeric time and forces DS50.
        let (time_kind, t) = match task.time_utc {
            Some(utc) => (TimeKind::Ds50, utc_to_ds50(utc)),
            None => {
                let kind = req.time_kind.ok_or_else(|| {
                    ServiceError::InvalidArgument("time must be specified as DS50/MSE or UTC".to_string())
                })?;
                (kind, task.time.unwrap_or(0.0))
            }
        };

        let lease = self
            .registry
            .acquire(cancel, &sat.tle_line1, &sat.tle_line2)
            .await
            .map_err(ServiceError::from)?;
        let key = lease.key();

        let mut raw: Option<[f64; 8]> = None;
        let adapter = self.adapter.clone();
        let result = self
            .gate
            .with_call(cancel, || {
                let (out, rc) = adapter.prop_all(key, time_kind, t);
                raw = out;
                rc
            })
            .await;
        drop(lease);
        result?;

        let raw = raw.ok_or_else(|| {
            ServiceError::Internal("propagation returned a short state vector".to_string())
        })?;

        info!(
            req_id = req.req_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "analytical propagation done"
        );

        Ok(PropResponse {
            req_id: req.req_id,
            result: PropPoint::from_raw(&raw),
        })
    }
}
