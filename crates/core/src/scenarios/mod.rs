//! Scenarios module - scenario and scenario template models, services, and traits.

mod scenarios_model;
mod scenarios_service;
mod scenarios_traits;

pub use scenarios_model::*;
pub use scenarios_service::ScenarioService;
pub use scenarios_traits::ScenarioServiceTrait;

#[cfg(test)]
mod scenarios_service_tests;
