//! Demo data for local development.

use anyhow::Result;
use products_hr::{Employee, EmployeeService, ServiceError};
use tracing::info;

fn demo_employees() -> Vec<Employee> {
    vec![
        Employee::new("Juan", "de la Rosa", "juan@example.com"),
        Employee::new("Rodrigo", "Sarabia", "rodrigo@example.com"),
    ]
}

/// Creates the demo employees, skipping emails that are already taken.
///
/// Returns how many rows were inserted.
pub async fn seed_demo_employees(service: &EmployeeService) -> Result<usize> {
    let mut inserted = 0;
    for employee in demo_employees() {
        match service.create_employee(employee).await {
            Ok(created) => {
                info!(id = ?created.id, email = %created.email, "seeded employee");
                inserted += 1;
            }
            Err(ServiceError::AlreadyExists { email }) => {
                info!(%email, "seed employee already present");
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(inserted)
}
