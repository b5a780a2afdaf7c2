//! In-memory [`EmployeeRepository`] for unit and web-layer tests.
//!
//! Mirrors the store's observable behavior: sequential ids starting at 1, a
//! unique `email`, and `RecordNotUpdated` when saving over a missing id.

use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use sea_orm::DbErr;

use crate::{
    model::{Employee, EmployeeId},
    repository::{EmployeeRepository, RepoError, RepoResult},
};

#[derive(Debug, Default)]
struct Rows {
    last_id: EmployeeId,
    by_id: BTreeMap<EmployeeId, Employee>,
}

#[derive(Debug, Default)]
pub struct InMemoryEmployeeRepository {
    rows: Mutex<Rows>,
}

impl InMemoryEmployeeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Rows> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl EmployeeRepository for InMemoryEmployeeRepository {
    async fn find_by_id(&self, id: EmployeeId) -> RepoResult<Option<Employee>> {
        Ok(self.lock().by_id.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<Employee>> {
        Ok(self
            .lock()
            .by_id
            .values()
            .find(|row| row.email == email)
            .cloned())
    }

    async fn find_all(&self) -> RepoResult<Vec<Employee>> {
        Ok(self.lock().by_id.values().cloned().collect())
    }

    async fn save(&self, mut employee: Employee) -> RepoResult<Employee> {
        let mut rows = self.lock();
        let taken = rows
            .by_id
            .values()
            .any(|row| row.email == employee.email && row.id != employee.id);
        if taken {
            return Err(RepoError::UniqueViolation(format!(
                "employees.email = {}",
                employee.email
            )));
        }
        let id = match employee.id {
            Some(id) if rows.by_id.contains_key(&id) => id,
            Some(_) => return Err(RepoError::Db(DbErr::RecordNotUpdated)),
            None => {
                rows.last_id += 1;
                rows.last_id
            }
        };
        employee.id = Some(id);
        rows.by_id.insert(id, employee.clone());
        Ok(employee)
    }

    async fn delete_by_id(&self, id: EmployeeId) -> RepoResult<()> {
        self.lock().by_id.remove(&id);
        Ok(())
    }

    async fn find_by_first_and_last_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> RepoResult<Option<Employee>> {
        Ok(self
            .lock()
            .by_id
            .values()
            .find(|row| row.first_name == first_name && row.last_name == last_name)
            .cloned())
    }
}
