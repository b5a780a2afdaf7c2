//! Employee use-case service.
//!
//! # Invariants
//! - No two employees share an email. The service checks before inserting; the
//!   store's unique index catches whatever slips past concurrently.
//! - Absence is `Ok(None)`; deciding what "not found" means is the caller's job.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::{
    model::{Employee, EmployeeId},
    repository::{EmployeeRepository, RepoError},
};

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Employee already exist with given email {email}")]
    AlreadyExists { email: String },
    #[error(transparent)]
    Repository(#[from] RepoError),
}

impl ServiceError {
    fn from_write(err: RepoError, email: String) -> Self {
        match err {
            RepoError::UniqueViolation(_) => Self::AlreadyExists { email },
            other => Self::Repository(other),
        }
    }
}

#[derive(Clone)]
pub struct EmployeeService {
    repo: Arc<dyn EmployeeRepository>,
}

impl EmployeeService {
    pub fn new(repo: Arc<dyn EmployeeRepository>) -> Self {
        Self { repo }
    }

    /// Persists a new employee after checking the email is free.
    ///
    /// Any id on the input is discarded; the store assigns one.
    #[instrument(name = "employees.create", skip_all, fields(email = %employee.email))]
    pub async fn create_employee(&self, mut employee: Employee) -> ServiceResult<Employee> {
        if self.repo.find_by_email(&employee.email).await?.is_some() {
            warn!("email already registered");
            return Err(ServiceError::AlreadyExists {
                email: employee.email,
            });
        }
        employee.id = None;
        let email = employee.email.clone();
        let created = self
            .repo
            .save(employee)
            .await
            .map_err(|err| ServiceError::from_write(err, email))?;
        info!(id = ?created.id, "employee created");
        Ok(created)
    }

    #[instrument(name = "employees.list", skip_all)]
    pub async fn list_employees(&self) -> ServiceResult<Vec<Employee>> {
        Ok(self.repo.find_all().await?)
    }

    #[instrument(name = "employees.get", skip(self))]
    pub async fn get_employee_by_id(&self, id: EmployeeId) -> ServiceResult<Option<Employee>> {
        Ok(self.repo.find_by_id(id).await?)
    }

    #[instrument(name = "employees.find_by_name", skip(self))]
    pub async fn find_employee_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> ServiceResult<Option<Employee>> {
        Ok(self
            .repo
            .find_by_first_and_last_name(first_name, last_name)
            .await?)
    }

    /// Overwrites an existing row in place. `employee.id` must be set.
    ///
    /// Email uniqueness is not pre-checked here; a collision is still
    /// rejected by the store and reported as [`ServiceError::AlreadyExists`].
    #[instrument(name = "employees.update", skip_all, fields(id = ?employee.id))]
    pub async fn update_employee(&self, employee: Employee) -> ServiceResult<Employee> {
        let email = employee.email.clone();
        let updated = self
            .repo
            .save(employee)
            .await
            .map_err(|err| ServiceError::from_write(err, email))?;
        info!("employee updated");
        Ok(updated)
    }

    #[instrument(name = "employees.delete", skip(self))]
    pub async fn delete_employee(&self, id: EmployeeId) -> ServiceResult<()> {
        self.repo.delete_by_id(id).await?;
        Ok(())
    }
}
