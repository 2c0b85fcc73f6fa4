use crate::models::activation::ActivationRequest;
use crate::models::error::CaptureError;
use crate::traits::capture_endpoint::CaptureEndpoint;

/// Obtains a process-loopback capture endpoint.
///
/// Platform activation may complete asynchronously; implementations block
/// until it has, and fail with `ActivationFailed` or `UnsupportedEndpoint`.
pub trait EndpointActivator {
    type Endpoint: CaptureEndpoint;

    fn activate(&mut self, request: &ActivationRequest) -> Result<Self::Endpoint, CaptureError>;
}
