pub mod rest_gateway;
pub mod rows;

pub use rest_gateway::RestGateway;
