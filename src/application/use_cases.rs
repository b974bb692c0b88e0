//! Use cases - Application business operations

pub mod health_check;

pub use health_check::HealthCheckUseCase;
