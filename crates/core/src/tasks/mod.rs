//! Tasks module - task and result models, services, and traits.

mod tasks_model;
mod tasks_service;
mod tasks_traits;

pub use tasks_model::*;
pub use tasks_service::TaskService;
pub use tasks_traits::TaskServiceTrait;

#[cfg(test)]
mod tasks_service_tests;
