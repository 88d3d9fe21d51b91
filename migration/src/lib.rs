pub use sea_orm_migration::prelude::*;

mod m20251104_000001_create_flights;
mod m20251104_000002_create_bookings;
mod m20251104_000003_create_passengers;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251104_000001_create_flights::Migration),
            Box::new(m20251104_000002_create_bookings::Migration),
            Box::new(m20251104_000003_create_passengers::Migration),
        ]
    }
}
