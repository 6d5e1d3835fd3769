pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Reasons a semantic interpretation can fail. None of these cross the interpreter boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Model is not ready.")]
	ModelNotReady,
	#[error("Malformed model response: {message}")]
	MalformedResponse { message: String },
	#[error("Invalid model output: {message}")]
	Validation { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
}
impl Error {
	pub fn kind(&self) -> &'static str {
		match self {
			Self::ModelNotReady => "model_not_ready",
			Self::MalformedResponse { .. } => "malformed_response",
			Self::Validation { .. } => "validation_error",
			Self::Provider { .. } => "provider_error",
		}
	}
}

impl From<quarry_providers::Error> for Error {
	fn from(err: quarry_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
