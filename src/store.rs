//! Appointment persistence.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    auth::new_id,
    error::{AppError, Result},
    models::{Appointment, NewAppointment, Status},
};

const SELECT_APPOINTMENT: &str = r#"SELECT id, name, phone, email, service, date, time, notes,
                                           status, user_id, created_at
                                    FROM appointments"#;

/// Inserts a new booking. Every appointment starts out `pending`.
pub async fn insert(pool: &SqlitePool, new: NewAppointment) -> Result<Appointment> {
    let appointment = Appointment {
        id: new_id(),
        name: new.name,
        phone: new.phone,
        email: new.email,
        service: new.service,
        date: new.date,
        time: new.time,
        notes: new.notes,
        status: Status::Pending,
        user_id: new.user_id,
        created_at: Utc::now().to_rfc3339(),
    };

    sqlx::query(
        r#"INSERT INTO appointments
           (id, name, phone, email, service, date, time, notes, status, user_id, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&appointment.id)
    .bind(&appointment.name)
    .bind(&appointment.phone)
    .bind(&appointment.email)
    .bind(&appointment.service)
    .bind(appointment.date)
    .bind(&appointment.time)
    .bind(&appointment.notes)
    .bind(appointment.status)
    .bind(&appointment.user_id)
    .bind(&appointment.created_at)
    .execute(pool)
    .await?;

    Ok(appointment)
}

pub async fn get(pool: &SqlitePool, id: &str) -> Result<Option<Appointment>> {
    let row = sqlx::query_as::<_, Appointment>(&format!("{SELECT_APPOINTMENT} WHERE id = ? LIMIT 1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Full collection, newest booking first.
pub async fn list(pool: &SqlitePool) -> Result<Vec<Appointment>> {
    let rows = sqlx::query_as::<_, Appointment>(&format!(
        "{SELECT_APPOINTMENT} ORDER BY created_at DESC, rowid DESC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Moves an appointment through the status state machine and returns the
/// stored result. Repeating a transition leaves the row untouched.
pub async fn set_status(pool: &SqlitePool, id: &str, target: Status) -> Result<Appointment> {
    let mut appointment = get(pool, id).await?.ok_or(AppError::NotFound("Appointment"))?;
    let next = appointment.status.transition(target)?;

    if next != appointment.status {
        sqlx::query("UPDATE appointments SET status = ? WHERE id = ?")
            .bind(next)
            .bind(id)
            .execute(pool)
            .await?;
        appointment.status = next;
    }

    Ok(appointment)
}

pub async fn delete(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM appointments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Appointment"));
    }
    Ok(())
}

/// Number of bookings made by each signed-in account.
pub async fn count_by_user(pool: &SqlitePool) -> Result<Vec<(String, i64)>> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        r#"SELECT user_id, COUNT(*) FROM appointments
           WHERE user_id IS NOT NULL
           GROUP BY user_id"#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
