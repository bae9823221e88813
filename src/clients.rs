//! Per-client summaries derived from the appointment collection.
//!
//! Nothing here is persisted: every page view folds the full list again.

use std::collections::HashMap;

use chrono::{Months, NaiveDate};

use crate::{
    dashboard::matches_search,
    models::{service_price, Appointment, Status},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Active,
    Inactive,
}

impl Activity {
    pub fn is_active(self) -> bool {
        self == Activity::Active
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub email: String,
    pub name: String,
    pub phone: String,
    pub visit_count: usize,
    pub last_appointment: NaiveDate,
    pub total_spent: i64,
    pub activity: Activity,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientStats {
    pub total: usize,
    pub active: usize,
    pub revenue: i64,
    pub average: i64,
}

/// Groups appointments by email. Name and phone come from the first
/// appointment seen for that email; the result is ordered by visit count,
/// most frequent first, ties in encounter order.
pub fn aggregate(appointments: &[Appointment], today: NaiveDate) -> Vec<Client> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut clients: Vec<Client> = Vec::new();

    for appointment in appointments {
        let slot = *index.entry(appointment.email.as_str()).or_insert_with(|| {
            clients.push(Client {
                email: appointment.email.clone(),
                name: appointment.name.clone(),
                phone: appointment.phone.clone(),
                visit_count: 0,
                last_appointment: appointment.date,
                total_spent: 0,
                activity: Activity::Inactive,
            });
            clients.len() - 1
        });

        let client = &mut clients[slot];
        client.visit_count += 1;
        client.last_appointment = client.last_appointment.max(appointment.date);
        if appointment.status == Status::Confirmed {
            client.total_spent += service_price(&appointment.service);
        }
    }

    let cutoff = today.checked_sub_months(Months::new(3)).unwrap_or(NaiveDate::MIN);
    for client in &mut clients {
        client.activity = if client.last_appointment > cutoff {
            Activity::Active
        } else {
            Activity::Inactive
        };
    }

    clients.sort_by(|a, b| b.visit_count.cmp(&a.visit_count));
    clients
}

pub fn stats(clients: &[Client]) -> ClientStats {
    let total = clients.len();
    let revenue: i64 = clients.iter().map(|client| client.total_spent).sum();
    let average = if total == 0 {
        0
    } else {
        (revenue as f64 / total as f64).round() as i64
    };

    ClientStats {
        total,
        active: clients.iter().filter(|client| client.activity.is_active()).count(),
        revenue,
        average,
    }
}

pub fn search<'a>(clients: &'a [Client], term: &str) -> Vec<&'a Client> {
    clients
        .iter()
        .filter(|client| matches_search(term, &client.name, &client.email, &client.phone))
        .collect()
}
