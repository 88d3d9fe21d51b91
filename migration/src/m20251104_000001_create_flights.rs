use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Flight::Table)
                    .if_not_exists()
                    .col(uuid(Flight::Id).primary_key())
                    .col(string_len(Flight::FlightNumber, 16).not_null())
                    // Inventory must never go negative, whatever the caller does
                    .col(
                        integer(Flight::RemainingSeats)
                            .not_null()
                            .check(Expr::col(Flight::RemainingSeats).gte(0)),
                    )
                    .col(
                        timestamp_with_time_zone(Flight::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Flight::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Flight {
    Table,
    Id,
    FlightNumber,
    RemainingSeats,
    CreatedAt,
}
