//! HR slice: the employee directory.
//!
//! Layers, leaves first: [`model`] defines the record, [`repository`] owns its
//! persistence, [`service`] applies the business rules on top.

#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod model;
pub mod repository;
pub mod service;

#[cfg(any(test, feature = "test-support"))]
pub use memory::InMemoryEmployeeRepository;
pub use model::{Employee, EmployeeId};
pub use repository::{EmployeeRepository, RepoError, RepoResult, SeaOrmEmployeeRepository};
pub use service::{EmployeeService, ServiceError, ServiceResult};
