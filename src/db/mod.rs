pub mod migrations;
pub mod queries;

use std::sync::Mutex;

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;

use crate::models::{
    Booking, BookingStatus, Package, Provider, RecurringSeries, Service, WaitlistEntry,
};

pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(path).context("failed to open database")?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        .context("failed to set database pragmas")?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}

/// Storage operations the scheduler relies on.
///
/// Implementations must be safe to share between tasks; atomicity of
/// check-then-write sequences is provided by the caller's per-key locks.
pub trait BookingStore: Send + Sync {
    fn get_service(&self, id: &str) -> anyhow::Result<Option<Service>>;
    fn save_service(&self, service: &Service) -> anyhow::Result<()>;
    fn get_provider(&self, id: &str) -> anyhow::Result<Option<Provider>>;
    fn save_provider(&self, provider: &Provider) -> anyhow::Result<()>;
    fn get_package(&self, id: &str) -> anyhow::Result<Option<Package>>;
    fn save_package(&self, package: &Package) -> anyhow::Result<()>;

    fn create_booking(&self, booking: &Booking) -> anyhow::Result<()>;
    fn get_booking(&self, id: &str) -> anyhow::Result<Option<Booking>>;
    fn update_booking_status(
        &self,
        id: &str,
        status: BookingStatus,
        updated_at: &NaiveDateTime,
    ) -> anyhow::Result<bool>;
    fn active_bookings_for_provider(
        &self,
        provider_id: &str,
        start: &NaiveDateTime,
        end: &NaiveDateTime,
    ) -> anyhow::Result<Vec<Booking>>;
    fn bookings_for_series(&self, series_id: &str) -> anyhow::Result<Vec<Booking>>;
    /// Demand signal: active bookings of a service starting on `date`.
    fn count_service_bookings_on(&self, service_id: &str, date: NaiveDate) -> anyhow::Result<i64>;
    fn count_user_bookings_between(
        &self,
        user_id: &str,
        start: &NaiveDateTime,
        end: &NaiveDateTime,
    ) -> anyhow::Result<i64>;

    fn create_series(&self, series: &RecurringSeries) -> anyhow::Result<()>;
    fn get_series(&self, id: &str) -> anyhow::Result<Option<RecurringSeries>>;

    fn create_waitlist_entry(&self, entry: &WaitlistEntry) -> anyhow::Result<()>;
    fn get_waitlist_entry(&self, id: &str) -> anyhow::Result<Option<WaitlistEntry>>;
    fn pending_waitlist_entries(&self, service_id: &str) -> anyhow::Result<Vec<WaitlistEntry>>;
    fn update_waitlist_entry(&self, entry: &WaitlistEntry) -> anyhow::Result<bool>;
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: &str) -> anyhow::Result<Self> {
        Ok(Self::new(init_db(path)?))
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> anyhow::Result<T>) -> anyhow::Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database connection mutex poisoned"))?;
        f(&conn)
    }
}

impl BookingStore for SqliteStore {
    fn get_service(&self, id: &str) -> anyhow::Result<Option<Service>> {
        self.with_conn(|c| queries::get_service(c, id))
    }

    fn save_service(&self, service: &Service) -> anyhow::Result<()> {
        self.with_conn(|c| queries::save_service(c, service))
    }

    fn get_provider(&self, id: &str) -> anyhow::Result<Option<Provider>> {
        self.with_conn(|c| queries::get_provider(c, id))
    }

    fn save_provider(&self, provider: &Provider) -> anyhow::Result<()> {
        self.with_conn(|c| queries::save_provider(c, provider))
    }

    fn get_package(&self, id: &str) -> anyhow::Result<Option<Package>> {
        self.with_conn(|c| queries::get_package(c, id))
    }

    fn save_package(&self, package: &Package) -> anyhow::Result<()> {
        self.with_conn(|c| queries::save_package(c, package))
    }

    fn create_booking(&self, booking: &Booking) -> anyhow::Result<()> {
        self.with_conn(|c| queries::create_booking(c, booking))
    }

    fn get_booking(&self, id: &str) -> anyhow::Result<Option<Booking>> {
        self.with_conn(|c| queries::get_booking_by_id(c, id))
    }

    fn update_booking_status(
        &self,
        id: &str,
        status: BookingStatus,
        updated_at: &NaiveDateTime,
    ) -> anyhow::Result<bool> {
        self.with_conn(|c| queries::update_booking_status(c, id, status, updated_at))
    }

    fn active_bookings_for_provider(
        &self,
        provider_id: &str,
        start: &NaiveDateTime,
        end: &NaiveDateTime,
    ) -> anyhow::Result<Vec<Booking>> {
        self.with_conn(|c| queries::get_active_bookings_for_provider(c, provider_id, start, end))
    }

    fn bookings_for_series(&self, series_id: &str) -> anyhow::Result<Vec<Booking>> {
        self.with_conn(|c| queries::get_bookings_for_series(c, series_id))
    }

    fn count_service_bookings_on(&self, service_id: &str, date: NaiveDate) -> anyhow::Result<i64> {
        self.with_conn(|c| queries::count_active_service_bookings_on(c, service_id, date))
    }

    fn count_user_bookings_between(
        &self,
        user_id: &str,
        start: &NaiveDateTime,
        end: &NaiveDateTime,
    ) -> anyhow::Result<i64> {
        self.with_conn(|c| queries::count_user_bookings_between(c, user_id, start, end))
    }

    fn create_series(&self, series: &RecurringSeries) -> anyhow::Result<()> {
        self.with_conn(|c| queries::create_series(c, series))
    }

    fn get_series(&self, id: &str) -> anyhow::Result<Option<RecurringSeries>> {
        self.with_conn(|c| queries::get_series(c, id))
    }

    fn create_waitlist_entry(&self, entry: &WaitlistEntry) -> anyhow::Result<()> {
        self.with_conn(|c| queries::create_waitlist_entry(c, entry))
    }

    fn get_waitlist_entry(&self, id: &str) -> anyhow::Result<Option<WaitlistEntry>> {
        self.with_conn(|c| queries::get_waitlist_entry(c, id))
    }

    fn pending_waitlist_entries(&self, service_id: &str) -> anyhow::Result<Vec<WaitlistEntry>> {
        self.with_conn(|c| queries::get_pending_waitlist_entries(c, service_id))
    }

    fn update_waitlist_entry(&self, entry: &WaitlistEntry) -> anyhow::Result<bool> {
        self.with_conn(|c| queries::update_waitlist_entry(c, entry))
    }
}
