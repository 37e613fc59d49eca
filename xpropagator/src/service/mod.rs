//! The propagation service: the operations consumed by the external
//! transport.
//!
//! [`PropagationService`] owns the engine gate, the satellite registry,
//! and the process-wide serialization mutex. Request handlers contend
//! for that mutex end-to-end: the engine holds process-global state, so
//! at most one request executes inside the core at a time.
//!
//! Operations:
//!
//! - [`PropagationService::info`] - service and engine identification
//! - [`PropagationService::prop`] - single-point propagation
//! - [`PropagationService::ephem`] - streaming ephemeris generation
//! - [`PropagationService::load_file`] - bulk elset file loading

mod ephem;
mod error;
mod file;
mod info;
mod prop;
mod validate;

pub use error::{ErrorCode, ServiceError};
pub use validate::{
    validate_ephem_request, validate_grid, validate_prop_request, validate_satellite,
};

use std::sync::Arc;

use tracing::info;

use crate::config::ConfigFile;
use crate::engine::{EngineAdapter, PropagationLibrary};
use crate::gate::EngineGate;
use crate::registry::SatRegistry;

/// The service core behind the transport.
pub struct PropagationService {
    chunk_size: usize,
    adapter: EngineAdapter,
    gate: Arc<EngineGate>,
    registry: SatRegistry,
    /// Serializes request execution end-to-end; see the module docs.
    global_mu: tokio::sync::Mutex<()>,
}

impl PropagationService {
    /// Build the service over a propagation library.
    ///
    /// Starts the registry sweeper; call [`PropagationService::shutdown`]
    /// to stop it.
    pub fn new(lib: Arc<dyn PropagationLibrary>, config: &ConfigFile) -> Self {
        let adapter = EngineAdapter::new(Arc::clone(&lib));
        let gate = Arc::new(EngineGate::new(lib, config.gate.permits));
        let registry = SatRegistry::start(
            adapter.clone(),
            Arc::clone(&gate),
            config.registry_config(),
        );

        info!(
            chunk_size = config.service.stream_chunk_size,
            gate_permits = gate.capacity(),
            "propagation service initialized"
        );

        Self {
            chunk_size: config.service.stream_chunk_size.max(1),
            adapter,
            gate,
            registry,
            global_mu: tokio::sync::Mutex::new(()),
        }
    }

    /// The satellite registry, for lifecycle control and introspection.
    pub fn registry(&self) -> &SatRegistry {
        &self.registry
    }

    /// Points per streamed ephemeris chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Stop background work (the registry sweeper) and wait for it.
    pub async fn shutdown(&self) {
        self.registry.close().await;
        info!("propagation service stopped");
    }
}
