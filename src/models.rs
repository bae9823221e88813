use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_CUSTOMER: &str = "customer";

pub const TIME_SLOTS: [&str; 14] = [
    "09:00", "09:30", "10:00", "10:30", "11:00", "11:30", "14:00", "14:30", "15:00", "15:30",
    "16:00", "16:30", "17:00", "17:30",
];

/// Lifecycle stage of an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum Status {
    Pending,
    Confirmed,
    Cancelled,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Pending, Status::Confirmed, Status::Cancelled];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Confirmed => "confirmed",
            Status::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "pending" => Some(Status::Pending),
            "confirmed" => Some(Status::Confirmed),
            "cancelled" => Some(Status::Cancelled),
            _ => None,
        }
    }

    /// Applies an admin transition. Only `pending` may move, and only to
    /// `confirmed` or `cancelled`; repeating the transition that produced the
    /// current state returns the same state.
    pub fn transition(self, target: Status) -> Result<Status, TransitionError> {
        match (self, target) {
            (Status::Pending, Status::Confirmed | Status::Cancelled) => Ok(target),
            (current, target) if current == target && current != Status::Pending => Ok(current),
            (from, to) => Err(TransitionError { from, to }),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot move appointment from {from} to {to}")]
pub struct TransitionError {
    pub from: Status,
    pub to: Status,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub price: i64,
    pub duration: i64,
}

pub const SERVICE_CATALOG: [ServiceInfo; 4] = [
    ServiceInfo {
        id: "corte",
        name: "Corte Tradicional",
        description: "Corte clássico com acabamento perfeito e lavagem",
        price: 35,
        duration: 45,
    },
    ServiceInfo {
        id: "barba",
        name: "Barba & Bigode",
        description: "Aparação e modelagem de barba com toalha quente",
        price: 25,
        duration: 30,
    },
    ServiceInfo {
        id: "completo",
        name: "Corte + Barba",
        description: "Pacote completo para um visual impecável",
        price: 55,
        duration: 75,
    },
    ServiceInfo {
        id: "express",
        name: "Corte Express",
        description: "Corte rápido para quem tem pressa, sem perder a qualidade",
        price: 25,
        duration: 25,
    },
];

pub fn catalog_entry(service_id: &str) -> Option<&'static ServiceInfo> {
    SERVICE_CATALOG.iter().find(|service| service.id == service_id)
}

/// Price of a catalog service; unknown identifiers are worth nothing.
pub fn service_price(service_id: &str) -> i64 {
    catalog_entry(service_id).map_or(0, |service| service.price)
}

pub fn service_name(service_id: &str) -> &str {
    catalog_entry(service_id).map_or(service_id, |service| service.name)
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Appointment {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub service: String,
    pub date: NaiveDate,
    pub time: String,
    pub notes: Option<String>,
    pub status: Status,
    pub user_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub service: String,
    pub date: NaiveDate,
    pub time: String,
    pub notes: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub role: String,
    pub password_hash: String,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActivityRow {
    pub message: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ServiceRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub duration: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PortfolioImage {
    pub id: String,
    pub url: String,
    pub category: String,
    pub alt: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_moves_to_confirmed_or_cancelled() {
        assert_eq!(Status::Pending.transition(Status::Confirmed), Ok(Status::Confirmed));
        assert_eq!(Status::Pending.transition(Status::Cancelled), Ok(Status::Cancelled));
    }

    #[test]
    fn repeating_a_transition_is_a_no_op() {
        let once = Status::Pending.transition(Status::Confirmed).unwrap();
        let twice = once.transition(Status::Confirmed).unwrap();
        assert_eq!(once, twice);
        assert_eq!(Status::Cancelled.transition(Status::Cancelled), Ok(Status::Cancelled));
    }

    #[test]
    fn settled_appointments_cannot_move() {
        assert!(Status::Confirmed.transition(Status::Cancelled).is_err());
        assert!(Status::Cancelled.transition(Status::Confirmed).is_err());
        assert!(Status::Confirmed.transition(Status::Pending).is_err());
        assert!(Status::Pending.transition(Status::Pending).is_err());
    }

    #[test]
    fn unknown_services_are_free_and_keep_their_id() {
        assert_eq!(service_price("corte"), 35);
        assert_eq!(service_price("completo"), 55);
        assert_eq!(service_price("massagem"), 0);
        assert_eq!(service_name("barba"), "Barba & Bigode");
        assert_eq!(service_name("massagem"), "massagem");
    }

    #[test]
    fn status_parses_lowercase_names() {
        for status in Status::ALL {
            assert_eq!(Status::parse(status.as_str()), Some(status));
        }
        assert_eq!(Status::parse("all"), None);
    }
}
