pub mod capture_endpoint;
pub mod endpoint_activator;
