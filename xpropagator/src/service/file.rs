//! Bulk elset file loading.

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{PropagationService, ServiceError};

impl PropagationService {
    /// Load a TLE file into the engine at both catalog layers.
    ///
    /// Satellites loaded this way are visible to subsequent acquires as
    /// cache hits.
    pub async fn load_file(
        &self,
        cancel: &CancellationToken,
        path: &str,
    ) -> Result<(), ServiceError> {
        if path.is_empty() {
            return Err(ServiceError::InvalidArgument(
                "file path is required".to_string(),
            ));
        }

        let adapter = self.adapter.clone();
        self.gate
            .with_call(cancel, || adapter.load_file_all(path))
            .await?;

        info!(path, "elset file loaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFile;
    use crate::engine::AnalyticEngine;
    use crate::service::ErrorCode;
    use std::sync::Arc;

    const ISS_LINE1: &str = "1 25544U 98067A   21275.52543210  .00016717  00000-0  10270-3 0  9042";
    const ISS_LINE2: &str = "2 25544  51.6442 208.5453 0003439  47.4501  63.9527 15.48881544315506";

    #[tokio::test]
    async fn empty_path_is_invalid_argument() {
        let service =
            PropagationService::new(Arc::new(AnalyticEngine::new()), &ConfigFile::default());
        let err = service
            .load_file(&CancellationToken::new(), "")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        service.shutdown().await;
    }

    #[tokio::test]
    async fn loaded_file_satellites_hit_the_registry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.tle");
        std::fs::write(&path, format!("{ISS_LINE1}\n{ISS_LINE2}\n")).unwrap();

        let service =
            PropagationService::new(Arc::new(AnalyticEngine::new()), &ConfigFile::default());
        let cancel = CancellationToken::new();
        service
            .load_file(&cancel, path.to_str().unwrap())
            .await
            .unwrap();

        // The registry sees the engine-resident satellite as a hit.
        let lease = service
            .registry()
            .acquire(&cancel, ISS_LINE1, ISS_LINE2)
            .await
            .unwrap();
        assert_eq!(service.registry().loaded_count(), 1);
        drop(lease);
        service.shutdown().await;
    }

    #[tokio::test]
    async fn missing_file_is_internal() {
        let service =
            PropagationService::new(Arc::new(AnalyticEngine::new()), &ConfigFile::default());
        let err = service
            .load_file(&CancellationToken::new(), "/nonexistent/catalog.tle")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Internal);
        service.shutdown().await;
    }
}
