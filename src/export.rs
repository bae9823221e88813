use std::borrow::Cow;

use chrono::NaiveDate;

use crate::models::{service_name, Appointment};

pub const HEADER: [&str; 8] = [
    "Nome",
    "Telefone",
    "Email",
    "Serviço",
    "Data",
    "Horário",
    "Status",
    "Observações",
];

pub fn filename(today: NaiveDate) -> String {
    format!("agendamentos_{}.csv", today.format("%Y-%m-%d"))
}

/// Renders appointments as CSV, one row per appointment, rows separated by
/// `\n`. Fields are quoted when they contain a delimiter, quote or newline.
pub fn to_csv<'a, I>(appointments: I) -> String
where
    I: IntoIterator<Item = &'a Appointment>,
{
    let mut lines = vec![join_row(HEADER.iter().copied())];
    for appointment in appointments {
        let date = appointment.date.format("%Y-%m-%d").to_string();
        lines.push(join_row([
            appointment.name.as_str(),
            appointment.phone.as_str(),
            appointment.email.as_str(),
            service_name(&appointment.service),
            date.as_str(),
            appointment.time.as_str(),
            appointment.status.as_str(),
            appointment.notes.as_deref().unwrap_or(""),
        ]));
    }
    lines.join("\n")
}

fn join_row<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    fields.into_iter().map(quote).collect::<Vec<_>>().join(",")
}

fn quote(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dashboard::sample, models::Status};

    #[test]
    fn writes_header_and_rows_in_column_order() {
        let mut apt = sample(
            "a@x.com",
            "completo",
            Status::Confirmed,
            NaiveDate::from_ymd_opt(2024, 5, 15).unwrap(),
        );
        apt.notes = Some("Degradê".to_string());

        let csv = to_csv([&apt]);
        let lines: Vec<&str> = csv.split('\n').collect();
        assert_eq!(
            lines[0],
            "Nome,Telefone,Email,Serviço,Data,Horário,Status,Observações"
        );
        assert_eq!(
            lines[1],
            "Carlos Souza,(11) 98888-7777,a@x.com,Corte + Barba,2024-05-15,09:00,confirmed,Degradê"
        );
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn quotes_fields_with_delimiters() {
        let mut apt = sample(
            "a@x.com",
            "massagem",
            Status::Pending,
            NaiveDate::from_ymd_opt(2024, 5, 15).unwrap(),
        );
        apt.name = "Souza, Carlos".to_string();
        apt.notes = Some("disse \"rápido\"\nobrigado".to_string());

        let csv = to_csv([&apt]);
        assert!(csv.contains("\"Souza, Carlos\""));
        assert!(csv.contains(",massagem,"));
        assert!(csv.ends_with("\"disse \"\"rápido\"\"\nobrigado\""));
    }

    #[test]
    fn empty_export_is_just_the_header() {
        let csv = to_csv(std::iter::empty());
        assert!(!csv.contains('\n'));
    }

    #[test]
    fn filename_embeds_the_date() {
        let today = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();
        assert_eq!(filename(today), "agendamentos_2024-07-04.csv");
    }
}
