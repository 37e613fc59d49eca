//! Service identification.

use chrono::Utc;

use crate::api::InfoResponse;

use super::PropagationService;

impl PropagationService {
    /// Identify the service and the engine behind it.
    ///
    /// Reads the engine's info strings directly; identification is
    /// read-only and does not mutate catalog state.
    pub fn info(&self) -> InfoResponse {
        let engine = self.adapter.info();
        InfoResponse {
            name: crate::SERVICE_NAME.to_string(),
            version: crate::VERSION.to_string(),
            commit: crate::COMMIT_HASH.to_string(),
            build_date: crate::BUILD_DATE.to_string(),
            astro_lib_info: engine.astro,
            sgp4_lib_info: engine.sgp4,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::PropagationService;
    use crate::config::ConfigFile;
    use crate::engine::AnalyticEngine;
    use std::sync::Arc;

    #[tokio::test]
    async fn info_reports_identity() {
        let service =
            PropagationService::new(Arc::new(AnalyticEngine::new()), &ConfigFile::default());

        let info = service.info();
        assert_eq!(info.name, crate::SERVICE_NAME);
        assert_eq!(info.version, crate::VERSION);
        assert!(!info.astro_lib_info.is_empty());
        assert!(!info.sgp4_lib_info.is_empty());

        service.shutdown().await;
    }
}
