//! Data access for the `employees` table.
//!
//! # Invariants
//! - Absent rows are `Ok(None)`, never an error.
//! - A unique-index violation on `email` is reported as
//!   [`RepoError::UniqueViolation`] so callers can tell it apart from transport
//!   failures.

use async_trait::async_trait;
use entity::employees;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, SqlErr,
};
use thiserror::Error;
use tracing::debug;

use crate::model::{Employee, EmployeeId};

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error(transparent)]
    Db(DbErr),
}

impl From<DbErr> for RepoError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => Self::UniqueViolation(detail),
            _ => Self::Db(err),
        }
    }
}

/// Persistence contract the employee service is written against.
#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    async fn find_by_id(&self, id: EmployeeId) -> RepoResult<Option<Employee>>;

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<Employee>>;

    /// Every row, ordered by id.
    async fn find_all(&self) -> RepoResult<Vec<Employee>>;

    /// Inserts when `employee.id` is `None`, otherwise overwrites that row.
    async fn save(&self, employee: Employee) -> RepoResult<Employee>;

    /// Removes the row if present; absent ids are not an error.
    async fn delete_by_id(&self, id: EmployeeId) -> RepoResult<()>;

    /// Exact match on both names, first row by id.
    async fn find_by_first_and_last_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> RepoResult<Option<Employee>>;
}

/// [`EmployeeRepository`] backed by a SeaORM connection.
#[derive(Clone, Debug)]
pub struct SeaOrmEmployeeRepository {
    db: DatabaseConnection,
}

impl SeaOrmEmployeeRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EmployeeRepository for SeaOrmEmployeeRepository {
    async fn find_by_id(&self, id: EmployeeId) -> RepoResult<Option<Employee>> {
        let row = employees::Entity::find_by_id(id).one(&self.db).await?;
        Ok(row.map(Employee::from))
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<Employee>> {
        let row = employees::Entity::find()
            .filter(employees::Column::Email.eq(email))
            .one(&self.db)
            .await?;
        Ok(row.map(Employee::from))
    }

    async fn find_all(&self) -> RepoResult<Vec<Employee>> {
        let rows = employees::Entity::find()
            .order_by_asc(employees::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Employee::from).collect())
    }

    async fn save(&self, employee: Employee) -> RepoResult<Employee> {
        let id = employee.id;
        let model = employees::ActiveModel {
            id: id.map_or(NotSet, Set),
            first_name: Set(employee.first_name),
            last_name: Set(employee.last_name),
            email: Set(employee.email),
        };
        let saved = match id {
            None => model.insert(&self.db).await?,
            Some(_) => model.update(&self.db).await?,
        };
        debug!(id = saved.id, inserted = id.is_none(), "employee row saved");
        Ok(saved.into())
    }

    async fn delete_by_id(&self, id: EmployeeId) -> RepoResult<()> {
        let result = employees::Entity::delete_by_id(id).exec(&self.db).await?;
        debug!(id, rows_affected = result.rows_affected, "employee delete executed");
        Ok(())
    }

    async fn find_by_first_and_last_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> RepoResult<Option<Employee>> {
        let row = employees::Entity::find()
            .filter(employees::Column::FirstName.eq(first_name))
            .filter(employees::Column::LastName.eq(last_name))
            .order_by_asc(employees::Column::Id)
            .one(&self.db)
            .await?;
        Ok(row.map(Employee::from))
    }
}
