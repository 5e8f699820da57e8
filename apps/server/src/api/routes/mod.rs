mod clinica;
mod health;

pub use clinica::api_routes;
pub use health::health_routes;
