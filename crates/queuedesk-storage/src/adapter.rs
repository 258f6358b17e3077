// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the TicketStore trait.

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;

use queuedesk_config::model::StorageConfig;
use queuedesk_core::{
    AccountId, AdapterType, BoardRow, HealthStatus, Location, LocationId, NewTicket,
    PluginAdapter, QueueDeskError, Service, ServiceId, Ticket, TicketId, TicketStore,
    TransactionLogEntry, Transition,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed ticket store.
///
/// Wraps a [`Database`] handle and delegates all operations to the typed
/// query modules.
pub struct SqliteTicketStore {
    db: Database,
}

impl SqliteTicketStore {
    /// Opens the database described by `config`, running migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, QueueDeskError> {
        let db = Database::open(&config.database_path, config.wal_mode).await?;
        Ok(Self { db })
    }

    /// Wraps an already opened database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns the underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl PluginAdapter for SqliteTicketStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, QueueDeskError> {
        let probe = self
            .db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err);
        Ok(match probe {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), QueueDeskError> {
        self.db.checkpoint().await?;
        debug!("shutdown: WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl TicketStore for SqliteTicketStore {
    async fn location(&self, id: LocationId) -> Result<Option<Location>, QueueDeskError> {
        queries::directory::get_location(&self.db, id).await
    }

    async fn service(&self, id: ServiceId) -> Result<Option<Service>, QueueDeskError> {
        queries::directory::get_service(&self.db, id).await
    }

    async fn services_for_location(
        &self,
        location: LocationId,
    ) -> Result<Vec<Service>, QueueDeskError> {
        queries::directory::list_services(&self.db, location).await
    }

    async fn ticket(&self, id: TicketId) -> Result<Option<Ticket>, QueueDeskError> {
        queries::tickets::get_ticket(&self.db, id).await
    }

    async fn count_issued(
        &self,
        service: ServiceId,
        day: NaiveDate,
    ) -> Result<u32, QueueDeskError> {
        queries::tickets::count_issued(&self.db, service, day).await
    }

    async fn insert_ticket(
        &self,
        ticket: NewTicket,
        actor: AccountId,
    ) -> Result<Ticket, QueueDeskError> {
        queries::tickets::insert_ticket(&self.db, ticket, actor).await
    }

    async fn called_ticket(&self, service: ServiceId) -> Result<Option<Ticket>, QueueDeskError> {
        queries::tickets::called_ticket(&self.db, service).await
    }

    async fn next_waiting(
        &self,
        service: ServiceId,
        day: NaiveDate,
    ) -> Result<Option<Ticket>, QueueDeskError> {
        queries::tickets::next_waiting(&self.db, service, day).await
    }

    async fn apply(&self, transitions: Vec<Transition>) -> Result<Vec<Ticket>, QueueDeskError> {
        queries::tickets::apply(&self.db, transitions).await
    }

    async fn board(&self, day: NaiveDate) -> Result<Vec<BoardRow>, QueueDeskError> {
        queries::board::board(&self.db, day).await
    }

    async fn log_entries(
        &self,
        ticket: TicketId,
    ) -> Result<Vec<TransactionLogEntry>, QueueDeskError> {
        queries::tickets::log_entries(&self.db, ticket).await
    }

    async fn upsert_location(&self, location: Location) -> Result<(), QueueDeskError> {
        queries::directory::upsert_location(&self.db, location).await
    }

    async fn upsert_service(&self, service: Service) -> Result<(), QueueDeskError> {
        queries::directory::upsert_service(&self.db, service).await
    }
}
