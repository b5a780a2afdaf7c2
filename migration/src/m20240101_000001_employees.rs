use sea_orm_migration::{prelude::*, sea_orm::DatabaseBackend};

#[derive(DeriveIden)]
enum Employees {
    Table,
    Id,
    FirstName,
    LastName,
    Email,
}

const EMAIL_INDEX: &str = "idx_employees_email";
const NAME_INDEX: &str = "idx_employees_name";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut id = ColumnDef::new(Employees::Id);
        // SQLite only auto-increments an INTEGER primary key, which is already 64-bit.
        match manager.get_database_backend() {
            DatabaseBackend::Sqlite => id.integer(),
            _ => id.big_integer(),
        };
        id.not_null().auto_increment().primary_key();

        manager
            .create_table(
                Table::create()
                    .table(Employees::Table)
                    .if_not_exists()
                    .col(&mut id)
                    .col(ColumnDef::new(Employees::FirstName).string_len(128).not_null())
                    .col(ColumnDef::new(Employees::LastName).string_len(128).not_null())
                    .col(ColumnDef::new(Employees::Email).string_len(320).not_null())
                    .to_owned(),
            )
            .await?;

        // Closes the check-then-insert window left open by the service pre-check.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name(EMAIL_INDEX)
                    .table(Employees::Table)
                    .col(Employees::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name(NAME_INDEX)
                    .table(Employees::Table)
                    .col(Employees::FirstName)
                    .col(Employees::LastName)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Employees::Table).if_exists().to_owned())
            .await
    }
}
