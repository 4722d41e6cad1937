//! One-shot loading of reference data.

use std::time::Duration;

use maposter_core::catalog::{Catalog, Presets, Theme};

use crate::api::PosterApiError;
use crate::transport::PosterTransport;

/// Fetch themes and presets once and build an immutable snapshot.
///
/// Never fails: a catalog that cannot be fetched in time is replaced by its
/// fallback (the built-in theme, or empty presets) and the error is logged.
pub async fn load_catalog<T: PosterTransport + ?Sized>(transport: &T, timeout: Duration) -> Catalog {
    let (themes, presets) = tokio::join!(
        with_timeout(timeout, transport.themes()),
        with_timeout(timeout, transport.presets()),
    );

    let themes: Vec<Theme> = themes.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load themes, using built-in default");
        Vec::new()
    });
    let presets: Presets = presets.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load presets, continuing without them");
        Presets::default()
    });

    let catalog = Catalog::new(themes, presets);
    tracing::info!(
        themes = catalog.themes().len(),
        output_sizes = catalog.presets().output_sizes.len(),
        feature_sets = catalog.presets().feature_sets.len(),
        "Reference data loaded",
    );
    catalog
}

async fn with_timeout<V>(
    timeout: Duration,
    fut: impl std::future::Future<Output = Result<V, PosterApiError>>,
) -> Result<V, PosterApiError> {
    tokio::time::timeout(timeout, fut)
        .await
        .unwrap_or(Err(PosterApiError::Timeout(timeout)))
}
