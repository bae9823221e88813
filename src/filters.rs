//! Custom askama filters shared by every template.

use std::fmt::Display;

use crate::models;

/// `35` → `R$ 35`
pub fn brl<T: Display>(value: T) -> askama::Result<String> {
    Ok(format!("R$ {value}"))
}

pub fn status_label<T: Display>(status: T) -> askama::Result<String> {
    let label = match status.to_string().as_str() {
        "confirmed" => "Confirmado",
        "cancelled" => "Cancelado",
        _ => "Pendente",
    };
    Ok(label.to_string())
}

pub fn service_name<T: Display>(service_id: T) -> askama::Result<String> {
    Ok(models::service_name(&service_id.to_string()).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_labels() {
        assert_eq!(brl(55).unwrap(), "R$ 55");
        assert_eq!(status_label("cancelled").unwrap(), "Cancelado");
        assert_eq!(status_label("pending").unwrap(), "Pendente");
        assert_eq!(service_name("express").unwrap(), "Corte Express");
    }
}
