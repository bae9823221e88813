//! In-memory filtering and stat cards for the admin appointment views.

use std::collections::HashSet;

use chrono::{Datelike, Days, NaiveDate};
use serde::Deserialize;

use crate::models::{service_price, Appointment, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilter {
    Today,
    Week,
    Month,
    On(NaiveDate),
    All,
}

impl DateFilter {
    /// Parses `today|week|month|all` or a `YYYY-MM-DD` date. Anything else,
    /// including an empty value, means no date restriction.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "today" => DateFilter::Today,
            "week" => DateFilter::Week,
            "month" => DateFilter::Month,
            other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
                .map(DateFilter::On)
                .unwrap_or(DateFilter::All),
        }
    }

    pub fn as_query(&self) -> String {
        match self {
            DateFilter::Today => "today".to_string(),
            DateFilter::Week => "week".to_string(),
            DateFilter::Month => "month".to_string(),
            DateFilter::On(date) => date.format("%Y-%m-%d").to_string(),
            DateFilter::All => "all".to_string(),
        }
    }

    pub fn matches(&self, date: NaiveDate, today: NaiveDate) -> bool {
        match self {
            DateFilter::Today => date == today,
            DateFilter::Week => date >= week_start(today),
            DateFilter::Month => date >= month_start(today),
            DateFilter::On(day) => date == *day,
            DateFilter::All => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Only(Status),
}

impl StatusFilter {
    pub fn parse(value: &str) -> Self {
        Status::parse(value).map_or(StatusFilter::All, StatusFilter::Only)
    }

    pub fn as_query(&self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Only(status) => status.as_str(),
        }
    }

    pub fn matches(&self, status: Status) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

/// Raw query string of the dashboard and appointments pages.
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub date: Option<String>,
    pub status: Option<String>,
    pub q: Option<String>,
}

impl FilterQuery {
    pub fn into_criteria(self, default_date: DateFilter) -> Criteria {
        Criteria {
            date: self
                .date
                .as_deref()
                .map_or(default_date, DateFilter::parse),
            status: self
                .status
                .as_deref()
                .map_or(StatusFilter::All, StatusFilter::parse),
            search: self.q.unwrap_or_default().trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criteria {
    pub date: DateFilter,
    pub status: StatusFilter,
    pub search: String,
}

impl Criteria {
    pub fn everything() -> Self {
        Self {
            date: DateFilter::All,
            status: StatusFilter::All,
            search: String::new(),
        }
    }

    pub fn matches(&self, appointment: &Appointment, today: NaiveDate) -> bool {
        self.date.matches(appointment.date, today)
            && self.status.matches(appointment.status)
            && matches_search(
                &self.search,
                &appointment.name,
                &appointment.email,
                &appointment.phone,
            )
    }
}

/// Calendar date in the server's local timezone.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Sunday of the current week.
pub fn week_start(today: NaiveDate) -> NaiveDate {
    let offset = today.weekday().num_days_from_sunday();
    today - Days::new(u64::from(offset))
}

pub fn month_start(today: NaiveDate) -> NaiveDate {
    today.with_day(1).unwrap_or(today)
}

/// Name and email match case-insensitively, phone matches as typed. An empty
/// term matches everything.
pub fn matches_search(term: &str, name: &str, email: &str, phone: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    name.to_lowercase().contains(&needle)
        || email.to_lowercase().contains(&needle)
        || phone.contains(term)
}

/// Appointments satisfying every predicate, in their original order.
pub fn filter<'a>(
    appointments: &'a [Appointment],
    criteria: &Criteria,
    today: NaiveDate,
) -> Vec<&'a Appointment> {
    appointments
        .iter()
        .filter(|appointment| criteria.matches(appointment, today))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub total: usize,
    pub today: usize,
    pub week: usize,
    pub month: usize,
    pub clients: usize,
    pub weekly_revenue: i64,
    pub monthly_revenue: i64,
    pub pending: usize,
    pub confirmed: usize,
    pub cancelled: usize,
}

pub fn stats(appointments: &[Appointment], today: NaiveDate) -> DashboardStats {
    let count = |filter: DateFilter| {
        appointments
            .iter()
            .filter(|apt| filter.matches(apt.date, today))
            .count()
    };
    let revenue = |filter: DateFilter| -> i64 {
        appointments
            .iter()
            .filter(|apt| apt.status == Status::Confirmed && filter.matches(apt.date, today))
            .map(|apt| service_price(&apt.service))
            .sum()
    };
    let with_status = |status: Status| appointments.iter().filter(|apt| apt.status == status).count();

    DashboardStats {
        total: appointments.len(),
        today: count(DateFilter::Today),
        week: count(DateFilter::Week),
        month: count(DateFilter::Month),
        clients: appointments
            .iter()
            .map(|apt| apt.email.as_str())
            .collect::<HashSet<_>>()
            .len(),
        weekly_revenue: revenue(DateFilter::Week),
        monthly_revenue: revenue(DateFilter::Month),
        pending: with_status(Status::Pending),
        confirmed: with_status(Status::Confirmed),
        cancelled: with_status(Status::Cancelled),
    }
}

#[cfg(test)]
pub(crate) fn sample(email: &str, service: &str, status: Status, date: NaiveDate) -> Appointment {
    Appointment {
        id: format!("{email}-{service}-{date}"),
        name: "Carlos Souza".to_string(),
        phone: "(11) 98888-7777".to_string(),
        email: email.to_string(),
        service: service.to_string(),
        date,
        time: "09:00".to_string(),
        notes: None,
        status,
        user_id: None,
        created_at: "2024-01-01T00:00:00+00:00".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // Wednesday.
    fn today() -> NaiveDate {
        day(2024, 5, 15)
    }

    #[test]
    fn week_starts_on_sunday() {
        assert_eq!(week_start(today()), day(2024, 5, 12));
        assert_eq!(week_start(day(2024, 5, 12)), day(2024, 5, 12));
        assert_eq!(week_start(day(2024, 5, 18)), day(2024, 5, 12));
        assert_eq!(month_start(today()), day(2024, 5, 1));
    }

    #[test]
    fn today_bucket_keeps_only_today() {
        let list = vec![
            sample("a@x.com", "corte", Status::Pending, today()),
            sample("b@x.com", "corte", Status::Pending, day(2024, 5, 14)),
        ];
        let criteria = Criteria {
            date: DateFilter::Today,
            ..Criteria::everything()
        };
        let result = filter(&list, &criteria, today());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].email, "a@x.com");
    }

    #[test]
    fn week_and_month_buckets_use_lower_bounds() {
        let list = vec![
            sample("a@x.com", "corte", Status::Pending, day(2024, 5, 11)),
            sample("b@x.com", "corte", Status::Pending, day(2024, 5, 12)),
            sample("c@x.com", "corte", Status::Pending, day(2024, 4, 30)),
            sample("d@x.com", "corte", Status::Pending, day(2024, 6, 2)),
        ];
        let emails = |date| {
            let criteria = Criteria {
                date,
                ..Criteria::everything()
            };
            filter(&list, &criteria, today())
                .into_iter()
                .map(|apt| apt.email.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(emails(DateFilter::Week), vec!["b@x.com", "d@x.com"]);
        assert_eq!(emails(DateFilter::Month), vec!["a@x.com", "b@x.com", "d@x.com"]);
        assert_eq!(emails(DateFilter::On(day(2024, 4, 30))), vec!["c@x.com"]);
    }

    #[test]
    fn search_folds_case_for_name_and_email_only() {
        let apt = sample("Carlos@Mail.com", "corte", Status::Pending, today());
        assert!(matches_search("carlos", &apt.name, &apt.email, &apt.phone));
        assert!(matches_search("MAIL.COM", &apt.name, &apt.email, &apt.phone));
        assert!(matches_search("98888", &apt.name, &apt.email, &apt.phone));
        assert!(!matches_search("joana", &apt.name, &apt.email, &apt.phone));
        assert!(matches_search("", &apt.name, &apt.email, &apt.phone));
    }

    #[test]
    fn predicates_combine_with_and() {
        let list = vec![
            sample("a@x.com", "corte", Status::Confirmed, today()),
            sample("b@x.com", "corte", Status::Pending, today()),
            sample("a@x.com", "barba", Status::Confirmed, day(2023, 1, 1)),
        ];
        let criteria = Criteria {
            date: DateFilter::Today,
            status: StatusFilter::Only(Status::Confirmed),
            search: "a@x".to_string(),
        };
        let result = filter(&list, &criteria, today());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].service, "corte");
    }

    #[test]
    fn filtered_results_are_a_subset_of_everything() {
        let list = vec![
            sample("a@x.com", "corte", Status::Confirmed, today()),
            sample("b@x.com", "barba", Status::Cancelled, day(2024, 5, 13)),
            sample("c@x.com", "express", Status::Pending, day(2022, 2, 2)),
        ];
        let all = filter(&list, &Criteria::everything(), today());
        assert_eq!(all.len(), list.len());

        for date in [DateFilter::Today, DateFilter::Week, DateFilter::Month, DateFilter::All] {
            for status in [StatusFilter::All, StatusFilter::Only(Status::Cancelled)] {
                let criteria = Criteria {
                    date,
                    status,
                    search: "x.com".to_string(),
                };
                for apt in filter(&list, &criteria, today()) {
                    assert!(all.iter().any(|other| other.id == apt.id));
                }
            }
        }
    }

    #[test]
    fn query_parsing_falls_back_to_all() {
        let criteria = FilterQuery {
            date: Some("yesterday".into()),
            status: Some("archived".into()),
            q: Some("  ana ".into()),
        }
        .into_criteria(DateFilter::Today);
        assert_eq!(criteria.date, DateFilter::All);
        assert_eq!(criteria.status, StatusFilter::All);
        assert_eq!(criteria.search, "ana");

        let defaults = FilterQuery::default().into_criteria(DateFilter::Today);
        assert_eq!(defaults.date, DateFilter::Today);
        assert_eq!(
            DateFilter::parse("2024-02-29"),
            DateFilter::On(day(2024, 2, 29))
        );
    }

    #[test]
    fn stats_count_buckets_and_confirmed_revenue() {
        let list = vec![
            sample("a@x.com", "corte", Status::Confirmed, today()),
            sample("a@x.com", "completo", Status::Pending, today()),
            sample("b@x.com", "barba", Status::Confirmed, day(2024, 5, 2)),
            sample("c@x.com", "express", Status::Cancelled, day(2024, 4, 2)),
        ];
        let stats = stats(&list, today());
        assert_eq!(
            stats,
            DashboardStats {
                total: 4,
                today: 2,
                week: 2,
                month: 3,
                clients: 3,
                weekly_revenue: 35,
                monthly_revenue: 60,
                pending: 1,
                confirmed: 2,
                cancelled: 1,
            }
        );
    }
}
