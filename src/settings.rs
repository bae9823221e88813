//! Shop settings: profile and schedule documents stored wholesale as JSON,
//! plus the editable service and portfolio collections.

use std::collections::HashMap;

use chrono::{NaiveTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;

use crate::{
    auth::new_id,
    error::{AppError, Result},
    models::{PortfolioImage, ServiceRow, SERVICE_CATALOG},
};

const PROFILE_KEY: &str = "barbershop";
const SCHEDULE_KEY: &str = "schedule";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarbershopProfile {
    pub name: String,
    pub description: String,
    pub phone: String,
    pub address: String,
    pub instagram: String,
    pub facebook: String,
}

impl Default for BarbershopProfile {
    fn default() -> Self {
        Self {
            name: "Barbearia Elite".to_string(),
            description: "Transformando visual e autoestima há mais de 10 anos com cortes clássicos e modernos."
                .to_string(),
            phone: "(11) 99999-9999".to_string(),
            address: "Rua das Flores, 123 - Centro - São Paulo/SP".to_string(),
            instagram: "@barbearia_elite".to_string(),
            facebook: "Barbearia Elite".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub enabled: bool,
    pub start: String,
    pub end: String,
}

impl WorkingHours {
    fn open(start: &str, end: &str) -> Self {
        Self {
            enabled: true,
            start: start.to_string(),
            end: end.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub monday: WorkingHours,
    pub tuesday: WorkingHours,
    pub wednesday: WorkingHours,
    pub thursday: WorkingHours,
    pub friday: WorkingHours,
    pub saturday: WorkingHours,
    pub sunday: WorkingHours,
    pub is_open: bool,
    pub closed_message: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            monday: WorkingHours::open("09:00", "18:00"),
            tuesday: WorkingHours::open("09:00", "18:00"),
            wednesday: WorkingHours::open("09:00", "18:00"),
            thursday: WorkingHours::open("09:00", "18:00"),
            friday: WorkingHours::open("09:00", "18:00"),
            saturday: WorkingHours::open("08:00", "17:00"),
            sunday: WorkingHours {
                enabled: false,
                start: "09:00".to_string(),
                end: "17:00".to_string(),
            },
            is_open: true,
            closed_message: "Barbearia temporariamente fechada".to_string(),
        }
    }
}

pub const WEEKDAYS: [(&str, &str); 7] = [
    ("monday", "Segunda-feira"),
    ("tuesday", "Terça-feira"),
    ("wednesday", "Quarta-feira"),
    ("thursday", "Quinta-feira"),
    ("friday", "Sexta-feira"),
    ("saturday", "Sábado"),
    ("sunday", "Domingo"),
];

impl ScheduleConfig {
    pub fn day(&self, key: &str) -> Option<&WorkingHours> {
        Some(match key {
            "monday" => &self.monday,
            "tuesday" => &self.tuesday,
            "wednesday" => &self.wednesday,
            "thursday" => &self.thursday,
            "friday" => &self.friday,
            "saturday" => &self.saturday,
            "sunday" => &self.sunday,
            _ => return None,
        })
    }

    pub fn day_mut(&mut self, key: &str) -> Option<&mut WorkingHours> {
        Some(match key {
            "monday" => &mut self.monday,
            "tuesday" => &mut self.tuesday,
            "wednesday" => &mut self.wednesday,
            "thursday" => &mut self.thursday,
            "friday" => &mut self.friday,
            "saturday" => &mut self.saturday,
            "sunday" => &mut self.sunday,
            _ => return None,
        })
    }

    /// Applies the weekly-hours form. A day is enabled only when its
    /// `<day>_enabled` checkbox was sent; the open switch is left alone.
    pub fn apply_form(&mut self, form: &HashMap<String, String>) -> Result<()> {
        for (key, label) in WEEKDAYS {
            let Some(day) = self.day_mut(key) else {
                continue;
            };
            day.enabled = form.contains_key(&format!("{key}_enabled"));
            if let Some(start) = form.get(&format!("{key}_start")) {
                day.start = start.trim().to_string();
            }
            if let Some(end) = form.get(&format!("{key}_end")) {
                day.end = end.trim().to_string();
            }

            let parse = |value: &str| NaiveTime::parse_from_str(value, "%H:%M");
            match (parse(&day.start), parse(&day.end)) {
                (Ok(start), Ok(end)) if start < end => {}
                (Ok(_), Ok(_)) => {
                    return Err(AppError::Validation(format!(
                        "{label}: closing time must be after opening time."
                    )))
                }
                _ => {
                    return Err(AppError::Validation(format!(
                        "{label}: use HH:MM for opening hours."
                    )))
                }
            }
        }

        if let Some(message) = form.get("closed_message") {
            let message = message.trim();
            if !message.is_empty() {
                self.closed_message = message.to_string();
            }
        }
        Ok(())
    }
}

/// Overlays `stored` onto `base`, descending into objects so fields missing
/// at any depth keep their base value.
fn merge_json(base: &mut Value, stored: Value) {
    match (base, stored) {
        (Value::Object(base), Value::Object(stored)) => {
            for (key, value) in stored {
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

async fn load_document<T>(pool: &SqlitePool, key: &str) -> Result<T>
where
    T: DeserializeOwned + Serialize + Default,
{
    let raw = sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    let Some(raw) = raw else {
        return Ok(T::default());
    };

    let merged = serde_json::to_value(T::default()).and_then(|mut document| {
        merge_json(&mut document, serde_json::from_str(&raw)?);
        serde_json::from_value::<T>(document)
    });

    match merged {
        Ok(value) => Ok(value),
        Err(err) => {
            log::warn!("Stored {key} settings are unreadable, using defaults: {err}");
            Ok(T::default())
        }
    }
}

async fn save_document<T: Serialize>(pool: &SqlitePool, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value).map_err(|err| AppError::Internal(err.to_string()))?;
    sqlx::query(
        r#"INSERT INTO settings (key, value, updated_at)
           VALUES (?, ?, ?)
           ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"#,
    )
    .bind(key)
    .bind(raw)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn load_profile(pool: &SqlitePool) -> Result<BarbershopProfile> {
    load_document(pool, PROFILE_KEY).await
}

pub async fn save_profile(pool: &SqlitePool, profile: &BarbershopProfile) -> Result<()> {
    save_document(pool, PROFILE_KEY, profile).await
}

pub async fn load_schedule(pool: &SqlitePool) -> Result<ScheduleConfig> {
    load_document(pool, SCHEDULE_KEY).await
}

pub async fn save_schedule(pool: &SqlitePool, schedule: &ScheduleConfig) -> Result<()> {
    save_document(pool, SCHEDULE_KEY, schedule).await
}

/// Flips the open/closed switch and returns the new state.
pub async fn toggle_open(pool: &SqlitePool) -> Result<bool> {
    let mut schedule = load_schedule(pool).await?;
    schedule.is_open = !schedule.is_open;
    save_schedule(pool, &schedule).await?;
    Ok(schedule.is_open)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceInput {
    pub name: String,
    pub description: String,
    pub price: i64,
    pub duration: i64,
}

impl ServiceInput {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() || self.description.trim().is_empty() || self.price <= 0 {
            return Err(AppError::Validation(
                "Fill in every service field with a positive price.".to_string(),
            ));
        }
        if self.duration <= 0 {
            return Err(AppError::Validation("Duration must be positive.".to_string()));
        }
        Ok(())
    }
}

pub async fn list_services(pool: &SqlitePool) -> Result<Vec<ServiceRow>> {
    let rows = sqlx::query_as::<_, ServiceRow>(
        "SELECT id, name, description, price, duration FROM services ORDER BY rowid",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Services shown to customers: the edited list, or the built-in catalog while
/// nothing has been configured.
pub async fn public_services(pool: &SqlitePool) -> Result<Vec<ServiceRow>> {
    let rows = list_services(pool).await?;
    if !rows.is_empty() {
        return Ok(rows);
    }
    Ok(SERVICE_CATALOG
        .iter()
        .map(|service| ServiceRow {
            id: service.id.to_string(),
            name: service.name.to_string(),
            description: service.description.to_string(),
            price: service.price,
            duration: service.duration,
        })
        .collect())
}

pub async fn create_service(pool: &SqlitePool, input: &ServiceInput) -> Result<ServiceRow> {
    input.validate()?;
    let row = ServiceRow {
        id: new_id(),
        name: input.name.trim().to_string(),
        description: input.description.trim().to_string(),
        price: input.price,
        duration: input.duration,
    };
    sqlx::query("INSERT INTO services (id, name, description, price, duration) VALUES (?, ?, ?, ?, ?)")
        .bind(&row.id)
        .bind(&row.name)
        .bind(&row.description)
        .bind(row.price)
        .bind(row.duration)
        .execute(pool)
        .await?;
    Ok(row)
}

pub async fn update_service(pool: &SqlitePool, id: &str, input: &ServiceInput) -> Result<()> {
    input.validate()?;
    let result = sqlx::query(
        "UPDATE services SET name = ?, description = ?, price = ?, duration = ? WHERE id = ?",
    )
    .bind(input.name.trim())
    .bind(input.description.trim())
    .bind(input.price)
    .bind(input.duration)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Service"));
    }
    Ok(())
}

pub async fn delete_service(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM services WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Service"));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioInput {
    pub url: String,
    pub category: String,
    pub alt: Option<String>,
}

pub async fn list_portfolio(pool: &SqlitePool) -> Result<Vec<PortfolioImage>> {
    let rows = sqlx::query_as::<_, PortfolioImage>(
        "SELECT id, url, category, alt FROM portfolio ORDER BY created_at, rowid",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub fn placeholder_portfolio() -> Vec<PortfolioImage> {
    [
        ("1", "cortes", "Corte clássico masculino"),
        ("2", "barbas", "Barba bem aparada"),
        ("3", "cortes", "Corte moderno fade"),
        ("4", "barbas", "Barba e bigode estilizados"),
        ("5", "cortes", "Corte social elegante"),
        ("6", "barbas", "Barba longa bem cuidada"),
        ("7", "cortes", "Corte degradê moderno"),
        ("8", "barbas", "Barba curta definida"),
    ]
    .into_iter()
    .map(|(id, category, alt)| PortfolioImage {
        id: id.to_string(),
        url: "/static/placeholder.svg".to_string(),
        category: category.to_string(),
        alt: alt.to_string(),
    })
    .collect()
}

/// Portfolio for the public page, filtered by category (`todos` keeps all).
pub async fn public_portfolio(pool: &SqlitePool, category: &str) -> Result<Vec<PortfolioImage>> {
    let mut images = list_portfolio(pool).await?;
    if images.is_empty() {
        images = placeholder_portfolio();
    }
    if category.is_empty() || category == "todos" {
        return Ok(images);
    }
    Ok(images
        .into_iter()
        .filter(|image| image.category == category)
        .collect())
}

pub async fn add_portfolio_image(pool: &SqlitePool, input: &PortfolioInput) -> Result<PortfolioImage> {
    let url = input.url.trim();
    let category = input.category.trim();
    if url.is_empty() || category.is_empty() {
        return Err(AppError::Validation("Image URL and category are required.".to_string()));
    }
    let alt = input
        .alt
        .as_deref()
        .map(str::trim)
        .filter(|alt| !alt.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{category} - {}", url.rsplit('/').next().unwrap_or(url)));

    let image = PortfolioImage {
        id: new_id(),
        url: url.to_string(),
        category: category.to_string(),
        alt,
    };
    sqlx::query("INSERT INTO portfolio (id, url, category, alt, created_at) VALUES (?, ?, ?, ?, ?)")
        .bind(&image.id)
        .bind(&image.url)
        .bind(&image.category)
        .bind(&image.alt)
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await?;
    Ok(image)
}

pub async fn delete_portfolio_image(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM portfolio WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Portfolio image"));
    }
    Ok(())
}
