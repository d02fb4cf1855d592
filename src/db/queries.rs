use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{
    Booking, BookingStatus, BusinessHours, Frequency, Package, Provider, RecurringSeries, Service,
    WaitlistEntry, WaitlistStatus,
};

// Fractional seconds are written only when present, so stored values still
// sort in time order as text.
const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";

fn fmt_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

fn parse_ts(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT).with_context(|| format!("bad timestamp: {s}"))
}

fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).with_context(|| format!("bad date: {s}"))
}

fn day_bounds(date: NaiveDate) -> (String, String) {
    let start = date.and_time(NaiveTime::MIN);
    let end = date
        .succ_opt()
        .map_or(NaiveDateTime::MAX, |next| next.and_time(NaiveTime::MIN));
    (fmt_ts(&start), fmt_ts(&end))
}

// ── Catalogue ──

pub fn save_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, business_id, name, duration_minutes, base_price, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
           business_id = excluded.business_id,
           name = excluded.name,
           duration_minutes = excluded.duration_minutes,
           base_price = excluded.base_price,
           active = excluded.active",
        params![
            service.id,
            service.business_id,
            service.name,
            service.duration_minutes,
            service.base_price,
            service.active as i32,
        ],
    )?;
    Ok(())
}

pub fn get_service(conn: &Connection, id: &str) -> anyhow::Result<Option<Service>> {
    let service = conn
        .query_row(
            "SELECT id, business_id, name, duration_minutes, base_price, active FROM services WHERE id = ?1",
            params![id],
            |row| {
                Ok(Service {
                    id: row.get(0)?,
                    business_id: row.get(1)?,
                    name: row.get(2)?,
                    duration_minutes: row.get(3)?,
                    base_price: row.get(4)?,
                    active: row.get::<_, i32>(5)? != 0,
                })
            },
        )
        .optional()?;
    Ok(service)
}

pub fn save_provider(conn: &Connection, provider: &Provider) -> anyhow::Result<()> {
    let hours = provider
        .business_hours
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    conn.execute(
        "INSERT INTO providers (id, name, business_hours) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET
           name = excluded.name,
           business_hours = excluded.business_hours",
        params![provider.id, provider.name, hours],
    )?;
    Ok(())
}

pub fn get_provider(conn: &Connection, id: &str) -> anyhow::Result<Option<Provider>> {
    let row = conn
        .query_row(
            "SELECT id, name, business_hours FROM providers WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((id, name, hours)) => {
            let business_hours = hours
                .as_deref()
                .map(BusinessHours::from_json)
                .transpose()
                .with_context(|| format!("bad business hours for provider {id}"))?;
            Ok(Some(Provider {
                id,
                name,
                business_hours,
            }))
        }
        None => Ok(None),
    }
}

pub fn save_package(conn: &Connection, package: &Package) -> anyhow::Result<()> {
    let service_ids = serde_json::to_string(&package.service_ids)?;
    conn.execute(
        "INSERT INTO packages (id, business_id, name, service_ids) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
           business_id = excluded.business_id,
           name = excluded.name,
           service_ids = excluded.service_ids",
        params![package.id, package.business_id, package.name, service_ids],
    )?;
    Ok(())
}

pub fn get_package(conn: &Connection, id: &str) -> anyhow::Result<Option<Package>> {
    let row = conn
        .query_row(
            "SELECT id, business_id, name, service_ids FROM packages WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((id, business_id, name, service_ids)) => Ok(Some(Package {
            service_ids: serde_json::from_str(&service_ids)
                .with_context(|| format!("bad service list for package {id}"))?,
            id,
            business_id,
            name,
        })),
        None => Ok(None),
    }
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, user_id, provider_id, service_id, start_time, end_time, duration_minutes, price, status, series_id, package_id, notes, created_at, updated_at";

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        &format!("INSERT INTO bookings ({BOOKING_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"),
        params![
            booking.id,
            booking.user_id,
            booking.provider_id,
            booking.service_id,
            fmt_ts(&booking.start_time),
            fmt_ts(&booking.end_time),
            booking.duration_minutes,
            booking.price,
            booking.status.as_str(),
            booking.series_id,
            booking.package_id,
            booking.notes,
            fmt_ts(&booking.created_at),
            fmt_ts(&booking.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            |row| Ok(parse_booking_row(row)),
        )
        .optional()?;
    result.transpose()
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
    updated_at: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), fmt_ts(updated_at), id],
    )?;
    Ok(count > 0)
}

/// Pending/confirmed bookings of a provider whose interval overlaps `[start, end)`.
pub fn get_active_bookings_for_provider(
    conn: &Connection,
    provider_id: &str,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE provider_id = ?1 AND start_time < ?3 AND end_time > ?2
           AND status IN ('pending', 'confirmed')
         ORDER BY start_time ASC"
    ))?;

    let rows = stmt.query_map(params![provider_id, fmt_ts(start), fmt_ts(end)], |row| {
        Ok(parse_booking_row(row))
    })?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn get_bookings_for_series(conn: &Connection, series_id: &str) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE series_id = ?1 ORDER BY start_time ASC"
    ))?;

    let rows = stmt.query_map(params![series_id], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn count_active_service_bookings_on(
    conn: &Connection,
    service_id: &str,
    date: NaiveDate,
) -> anyhow::Result<i64> {
    let (day_start, day_end) = day_bounds(date);
    let count = conn.query_row(
        "SELECT COUNT(*) FROM bookings
         WHERE service_id = ?1 AND start_time >= ?2 AND start_time < ?3
           AND status IN ('pending', 'confirmed')",
        params![service_id, day_start, day_end],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Non-cancelled bookings of a user starting in `[start, end)`.
pub fn count_user_bookings_between(
    conn: &Connection,
    user_id: &str,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
) -> anyhow::Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM bookings
         WHERE user_id = ?1 AND start_time >= ?2 AND start_time < ?3 AND status != 'cancelled'",
        params![user_id, fmt_ts(start), fmt_ts(end)],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let start_time: String = row.get(4)?;
    let end_time: String = row.get(5)?;
    let status: String = row.get(8)?;
    let created_at: String = row.get(12)?;
    let updated_at: String = row.get(13)?;

    Ok(Booking {
        id: row.get(0)?,
        user_id: row.get(1)?,
        provider_id: row.get(2)?,
        service_id: row.get(3)?,
        start_time: parse_ts(&start_time)?,
        end_time: parse_ts(&end_time)?,
        duration_minutes: row.get(6)?,
        price: row.get(7)?,
        status: BookingStatus::parse(&status)
            .with_context(|| format!("unknown booking status: {status}"))?,
        series_id: row.get(9)?,
        package_id: row.get(10)?,
        notes: row.get(11)?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

// ── Recurring Series ──

pub fn create_series(conn: &Connection, series: &RecurringSeries) -> anyhow::Result<()> {
    let skip_dates: Vec<String> = series
        .skip_dates
        .iter()
        .map(|d| d.format(DATE_FORMAT).to_string())
        .collect();
    conn.execute(
        "INSERT INTO recurring_series (id, user_id, service_id, frequency, start_date, end_date, start_time, skip_dates, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            series.id,
            series.user_id,
            series.service_id,
            series.frequency.as_str(),
            series.start_date.format(DATE_FORMAT).to_string(),
            series.end_date.format(DATE_FORMAT).to_string(),
            series.start_time.format("%H:%M:%S").to_string(),
            serde_json::to_string(&skip_dates)?,
            fmt_ts(&series.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_series(conn: &Connection, id: &str) -> anyhow::Result<Option<RecurringSeries>> {
    let row = conn
        .query_row(
            "SELECT id, user_id, service_id, frequency, start_date, end_date, start_time, skip_dates, created_at
             FROM recurring_series WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, String>(8)?,
                ))
            },
        )
        .optional()?;

    let Some((id, user_id, service_id, frequency, start_date, end_date, start_time, skip_dates, created_at)) =
        row
    else {
        return Ok(None);
    };

    let skip_dates: Vec<String> = serde_json::from_str(&skip_dates)?;
    Ok(Some(RecurringSeries {
        frequency: Frequency::parse(&frequency)
            .with_context(|| format!("unknown frequency: {frequency}"))?,
        start_date: parse_date(&start_date)?,
        end_date: parse_date(&end_date)?,
        start_time: NaiveTime::parse_from_str(&start_time, "%H:%M:%S")
            .with_context(|| format!("bad time: {start_time}"))?,
        skip_dates: skip_dates
            .iter()
            .map(|d| parse_date(d))
            .collect::<anyhow::Result<_>>()?,
        created_at: parse_ts(&created_at)?,
        id,
        user_id,
        service_id,
    }))
}

// ── Waitlist ──

const WAITLIST_COLUMNS: &str =
    "id, user_id, service_id, preferred_dates, priority, notes, status, created_at, updated_at";

pub fn create_waitlist_entry(conn: &Connection, entry: &WaitlistEntry) -> anyhow::Result<()> {
    let preferred: Vec<String> = entry
        .preferred_dates
        .iter()
        .map(|d| d.format(DATE_FORMAT).to_string())
        .collect();
    conn.execute(
        &format!("INSERT INTO waitlist_entries ({WAITLIST_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
        params![
            entry.id,
            entry.user_id,
            entry.service_id,
            serde_json::to_string(&preferred)?,
            entry.priority,
            entry.notes,
            entry.status.as_str(),
            fmt_ts(&entry.created_at),
            fmt_ts(&entry.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_waitlist_entry(conn: &Connection, id: &str) -> anyhow::Result<Option<WaitlistEntry>> {
    let result = conn
        .query_row(
            &format!("SELECT {WAITLIST_COLUMNS} FROM waitlist_entries WHERE id = ?1"),
            params![id],
            |row| Ok(parse_waitlist_row(row)),
        )
        .optional()?;
    result.transpose()
}

pub fn get_pending_waitlist_entries(
    conn: &Connection,
    service_id: &str,
) -> anyhow::Result<Vec<WaitlistEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WAITLIST_COLUMNS} FROM waitlist_entries
         WHERE service_id = ?1 AND status = 'pending'
         ORDER BY created_at ASC"
    ))?;

    let rows = stmt.query_map(params![service_id], |row| Ok(parse_waitlist_row(row)))?;

    let mut entries = vec![];
    for row in rows {
        entries.push(row??);
    }
    Ok(entries)
}

pub fn update_waitlist_entry(conn: &Connection, entry: &WaitlistEntry) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE waitlist_entries SET status = ?1, priority = ?2, updated_at = ?3 WHERE id = ?4",
        params![
            entry.status.as_str(),
            entry.priority,
            fmt_ts(&entry.updated_at),
            entry.id
        ],
    )?;
    Ok(count > 0)
}

fn parse_waitlist_row(row: &rusqlite::Row) -> anyhow::Result<WaitlistEntry> {
    let preferred: String = row.get(3)?;
    let status: String = row.get(6)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;

    let preferred: Vec<String> = serde_json::from_str(&preferred)?;

    Ok(WaitlistEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        service_id: row.get(2)?,
        preferred_dates: preferred
            .iter()
            .map(|d| parse_date(d))
            .collect::<anyhow::Result<_>>()?,
        priority: row.get(4)?,
        notes: row.get(5)?,
        status: WaitlistStatus::parse(&status)
            .with_context(|| format!("unknown waitlist status: {status}"))?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}
