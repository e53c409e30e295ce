//! Application services.
//!
//! Services orchestrate repositories and hold the domain rules; route
//! handlers stay thin and translate between HTTP and service calls.

pub mod auth;
pub mod cart;
pub mod order;
