//! Streaming ephemeris generation.
//!
//! One request fans out over its tasks in order; each task drives the
//! engine's chunked generator and pushes response chunks into a bounded
//! channel. A dedicated sender task drains the channel into the
//! transport sink, so chunk production is never blocked directly on the
//! client - a slow client is handled by channel backpressure and, in
//! the limit, by cancellation.

use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api::{
    flat_to_points, EphemRequest, EphemResponse, EphemResult, EphemSink, EphemTask, SinkSendError,
    TimeGrid, TimeStep,
};
use crate::engine::{Frame, SatKey, RC_ALLOC_FAILED, RC_OK};
use crate::time::{parse_iso8601_minutes, utc_to_ds50};

use super::{validate, PropagationService, ServiceError};

/// The resolved span and step of one task's grid.
struct ResolvedGrid {
    start_ds50: f64,
    end_ds50: f64,
    /// Step in minutes; -1 selects the engine's dynamic step.
    step_minutes: f64,
}

impl PropagationService {
    /// Generate ephemerides for every task in the request, streaming
    /// chunks into `sink`.
    ///
    /// Within one task (one `stream_id`) chunks are strictly ordered and
    /// contiguous by `stream_chunk_id`. Tasks are processed in request
    /// order; a task's `stream_id` is its index.
    pub async fn ephem<S>(
        &self,
        cancel: &CancellationToken,
        req: EphemRequest,
        sink: S,
    ) -> Result<(), ServiceError>
    where
        S: EphemSink + 'static,
    {
        validate::validate_ephem_request(&req).map_err(ServiceError::InvalidArgument)?;

        let _global = self.global_mu.lock().await;
        let started = Instant::now();

        let frame = req.frame.ok_or_else(|| {
            ServiceError::InvalidArgument("invalid ephemerides type (valid types: ECI, J2K)".into())
        })?;

        let (results_tx, mut err_rx, sender) = start_result_sender(sink, self.chunk_size);

        for (task_idx, task) in req.tasks.iter().enumerate() {
            if cancel.is_cancelled() {
                drop(results_tx);
                let _ = sender.await;
                return Err(ServiceError::Cancelled);
            }

            let sat = match task.sat.as_ref() {
                Some(sat) => sat,
                None => {
                    drop(results_tx);
                    let _ = sender.await;
                    return Err(ServiceError::InvalidArgument(format!(
                        "task {task_idx} must include a satellite"
                    )));
                }
            };

            let lease = match self
                .registry
                .acquire(cancel, &sat.tle_line1, &sat.tle_line2)
                .await
            {
                Ok(lease) => lease,
                Err(e) => {
                    drop(results_tx);
                    let _ = sender.await;
                    return Err(ServiceError::from(e));
                }
            };

            let result = self
                .run_gen_ephems(cancel, &req, task, task_idx, frame, lease.key(), &results_tx)
                .await;
            drop(lease);

            if let Err(e) = result {
                drop(results_tx);
                let _ = sender.await;
                // A transport failure explains any downstream error best.
                if let Ok(send_err) = err_rx.try_recv() {
                    return Err(ServiceError::StreamSend(send_err));
                }
                return Err(e);
            }
        }

        drop(results_tx);
        let _ = sender.await;
        if let Ok(send_err) = err_rx.try_recv() {
            return Err(ServiceError::StreamSend(send_err));
        }

        info!(
            req_id = req.req_id,
            tasks = req.tasks.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ephemeris data generation done"
        );
        Ok(())
    }

    /// Drive the chunk loop for one task.
    async fn run_gen_ephems(
        &self,
        cancel: &CancellationToken,
        req: &EphemRequest,
        task: &EphemTask,
        task_idx: usize,
        frame: Frame,
        key: SatKey,
        results_tx: &mpsc::Sender<EphemResponse>,
    ) -> Result<(), ServiceError> {
        let grid = resolve_time_grid(task, req).ok_or_else(|| {
            ServiceError::InvalidArgument(format!("task {task_idx} has no resolvable time grid"))
        })?;
        let grid = resolve_grid_values(grid)?;

        let mut chunk_id: i64 = 0;
        let mut current_start = grid.start_ds50;

        loop {
            let adapter = self.adapter.clone();
            let chunk_cap = self.chunk_size;
            let out = self
                .gate
                .run(cancel, || {
                    adapter.gen_ephems(
                        key,
                        current_start,
                        grid.end_ds50,
                        grid.step_minutes,
                        frame,
                        chunk_cap,
                    )
                })
                .await
                .map_err(|_| ServiceError::Cancelled)?;

            if out.rc == RC_ALLOC_FAILED {
                return Err(ServiceError::Internal(
                    "failed to generate ephemeris data: failed to allocate result buffer".into(),
                ));
            }
            if out.rc != RC_OK && out.count == 0 {
                let msg = self.gate.last_error();
                let detail = if msg.is_empty() {
                    format!("rc={}", out.rc)
                } else {
                    msg
                };
                return Err(ServiceError::Internal(format!(
                    "failed to generate ephemeris data: {detail}"
                )));
            }

            if out.count > 0 {
                let points = flat_to_points(&out.flat)
                    .map_err(|e| ServiceError::Internal(e.to_string()))?;
                let response = EphemResponse {
                    req_id: req.req_id,
                    stream_id: task_idx as i64,
                    stream_chunk_id: chunk_id,
                    result: EphemResult {
                        task_id: task.task_id,
                        count: points.len() as i64,
                        points,
                    },
                };

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(ServiceError::Cancelled),
                    sent = results_tx.send(response) => {
                        if sent.is_err() {
                            // The sender exited after a transport failure;
                            // the latched error is reported by the caller.
                            return Err(ServiceError::Internal(
                                "ephemeris stream closed".into(),
                            ));
                        }
                        chunk_id += 1;
                    }
                }
            }

            if out.done {
                break;
            }
            current_start = out.next_start;
        }

        Ok(())
    }
}

/// A task's own grid supersedes the request-level common grid.
fn resolve_time_grid<'a>(task: &'a EphemTask, req: &'a EphemRequest) -> Option<&'a TimeGrid> {
    task.time_grid.as_ref().or(req.common_time_grid.as_ref())
}

/// Convert a grid's bounds to DS50 and its step policy to minutes.
fn resolve_grid_values(grid: &TimeGrid) -> Result<ResolvedGrid, ServiceError> {
    let start_ds50 = grid
        .start_utc
        .map(utc_to_ds50)
        .or(grid.start_ds50)
        .unwrap_or(0.0);
    let end_ds50 = grid
        .end_utc
        .map(utc_to_ds50)
        .or(grid.end_ds50)
        .unwrap_or(0.0);

    let step_minutes = match &grid.step {
        Some(TimeStep::Dynamic) => -1.0,
        Some(TimeStep::Period(period)) => parse_iso8601_minutes(period)
            .map_err(|e| ServiceError::InvalidArgument(e.to_string()))?,
        Some(TimeStep::Ds50Days(days)) => days * 1_440.0,
        None => 0.0,
    };

    Ok(ResolvedGrid {
        start_ds50,
        end_ds50,
        step_minutes,
    })
}

/// Spawn the sender task: drains the bounded results channel into the
/// sink in order, latching the first transport error in a single-slot
/// channel and stopping.
fn start_result_sender<S>(
    mut sink: S,
    buf_size: usize,
) -> (
    mpsc::Sender<EphemResponse>,
    mpsc::Receiver<SinkSendError>,
    JoinHandle<()>,
)
where
    S: EphemSink + 'static,
{
    let (results_tx, mut results_rx) = mpsc::channel::<EphemResponse>(buf_size.max(1));
    let (err_tx, err_rx) = mpsc::channel::<SinkSendError>(1);

    let handle = tokio::spawn(async move {
        while let Some(chunk) = results_rx.recv().await {
            if let Err(e) = sink.send(chunk) {
                let _ = err_tx.try_send(e);
                return;
            }
        }
    });

    (results_tx, err_rx, handle)
}
