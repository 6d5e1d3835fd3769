use std::sync::Arc;

use quarry_service::QuarryService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<QuarryService>,
}
impl AppState {
	/// Builds the service and probes the model once so the first request sees real readiness.
	pub async fn new(config: quarry_config::Config) -> Self {
		let service = QuarryService::new(config);
		let ready = service.refresh_model().await;

		tracing::info!(ready, "Initial model readiness probed.");

		Self::from_service(service)
	}

	pub fn from_service(service: QuarryService) -> Self {
		Self { service: Arc::new(service) }
	}
}
