use sea_orm_migration::{prelude::*, schema::*};

use super::m20251104_000002_create_bookings::Booking;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Passenger::Table)
                    .if_not_exists()
                    .col(uuid(Passenger::Id).primary_key())
                    .col(uuid(Passenger::BookingId).not_null())
                    .col(string_len(Passenger::FullName, 100).not_null())
                    .col(string_len(Passenger::NationalId, 64).not_null())
                    .col(string_len(Passenger::Phone, 32).not_null())
                    .col(double(Passenger::TicketPrice).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_passenger_booking")
                            .from(Passenger::Table, Passenger::BookingId)
                            .to(Booking::Table, Booking::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_passenger_booking_id")
                    .table(Passenger::Table)
                    .col(Passenger::BookingId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Passenger::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Passenger {
    Table,
    Id,
    BookingId,
    FullName,
    NationalId,
    Phone,
    TicketPrice,
}
