//! Database configuration module for the enrollment desk.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust models.
//! The one constraint entities cannot express, uniqueness of an attendance record per
//! (session, student) pair, is added as an explicit index.

use crate::entities::{Attendance, AttendanceColumn, Class, Enrollment, Order, Product, Session};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/enrollment_desk.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table_for<C, E>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables (if missing) plus the attendance uniqueness index.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_table_for(db, &schema, Class).await?;
    create_table_for(db, &schema, Session).await?;
    create_table_for(db, &schema, Enrollment).await?;
    create_table_for(db, &schema, Attendance).await?;
    create_table_for(db, &schema, Order).await?;
    create_table_for(db, &schema, Product).await?;

    let attendance_slot_index = Index::create()
        .name("idx_attendance_session_student")
        .table(Attendance)
        .col(AttendanceColumn::SessionId)
        .col(AttendanceColumn::StudentId)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&attendance_slot_index)).await?;

    info!("Database tables ensured.");
    Ok(())
}
