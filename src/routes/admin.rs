use std::collections::HashMap;

use actix_web::{http::header, middleware::from_fn, web, HttpRequest, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;
use askama::Template;
use serde::Deserialize;

use crate::{
    auth::{self, admin_validator, logout_guard, AuthUser},
    clients::{self, Client},
    dashboard::{self, DateFilter, FilterQuery, StatusFilter},
    db::{log_activity, recent_activities},
    error::{AppError, Result},
    export, filters,
    models::{service_price, Appointment, PortfolioImage, ServiceRow, Status},
    settings::{self, BarbershopProfile, PortfolioInput, ServiceInput, WEEKDAYS},
    state::AppState,
    store,
    templates::render,
};

#[derive(Clone, Debug)]
struct StatCard {
    label: &'static str,
    value: String,
}

impl StatCard {
    fn new(label: &'static str, value: impl ToString) -> Self {
        Self {
            label,
            value: value.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
struct AppointmentView {
    id: String,
    name: String,
    phone: String,
    email: String,
    service: String,
    price: i64,
    date: String,
    time: String,
    notes: String,
    has_notes: bool,
    status: String,
    is_pending: bool,
}

#[derive(Clone, Debug)]
struct ActivityView {
    message: String,
    created_at: String,
}

#[derive(Clone, Debug)]
struct SelectOption {
    value: String,
    label: &'static str,
    selected: bool,
}

#[derive(Clone, Debug)]
struct ClientView {
    name: String,
    phone: String,
    email: String,
    visit_count: usize,
    last_appointment: String,
    total_spent: i64,
    active: bool,
}

#[derive(Clone, Debug)]
struct UserView {
    id: String,
    name: String,
    phone: String,
    email: String,
    created_at: String,
    appointments: i64,
}

#[derive(Clone, Debug)]
struct DayView {
    key: &'static str,
    label: &'static str,
    enabled: bool,
    start: String,
    end: String,
}

#[derive(Template)]
#[template(path = "admin_dashboard.html")]
struct AdminDashboardTemplate {
    admin_name: String,
    stats: Vec<StatCard>,
    appointments: Vec<AppointmentView>,
    activities: Vec<ActivityView>,
    date_options: Vec<SelectOption>,
    status_options: Vec<SelectOption>,
    search: String,
    next: String,
    default_password: bool,
}

#[derive(Template)]
#[template(path = "admin_appointments.html")]
struct AdminAppointmentsTemplate {
    appointments: Vec<AppointmentView>,
    status_options: Vec<SelectOption>,
    search: String,
    date: String,
    total: usize,
    next: String,
}

#[derive(Template)]
#[template(path = "admin_clients.html")]
struct AdminClientsTemplate {
    stats: Vec<StatCard>,
    clients: Vec<ClientView>,
    search: String,
}

#[derive(Template)]
#[template(path = "admin_users.html")]
struct AdminUsersTemplate {
    users: Vec<UserView>,
    search: String,
    total: usize,
}

#[derive(Template)]
#[template(path = "admin_barbershop.html")]
struct AdminBarbershopTemplate {
    profile: BarbershopProfile,
    services: Vec<ServiceRow>,
    portfolio: Vec<PortfolioImage>,
}

#[derive(Template)]
#[template(path = "admin_schedule.html")]
struct AdminScheduleTemplate {
    days: Vec<DayView>,
    is_open: bool,
    closed_message: String,
}

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

#[derive(Deserialize)]
struct StatusForm {
    status: String,
    next: Option<String>,
}

#[derive(Deserialize)]
struct RedirectForm {
    next: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .wrap(HttpAuthentication::basic(admin_validator))
            .wrap(from_fn(logout_guard))
            .service(web::resource("").route(web::get().to(index)))
            .service(web::resource("/").route(web::get().to(index)))
            .service(web::resource("/dashboard").route(web::get().to(dashboard)))
            .service(web::resource("/dashboard/export").route(web::get().to(export_csv)))
            .service(web::resource("/appointments").route(web::get().to(list_appointments)))
            .service(web::resource("/appointments/{id}/status").route(web::post().to(update_status)))
            .service(web::resource("/appointments/{id}/delete").route(web::post().to(delete_appointment)))
            .service(web::resource("/clients").route(web::get().to(list_clients)))
            .service(web::resource("/users").route(web::get().to(list_users)))
            .service(web::resource("/users/{id}/delete").route(web::post().to(delete_user)))
            .service(web::resource("/barbershop").route(web::get().to(barbershop)))
            .service(web::resource("/barbershop/profile").route(web::post().to(save_profile)))
            .service(web::resource("/barbershop/services").route(web::post().to(create_service)))
            .service(web::resource("/barbershop/services/{id}").route(web::post().to(update_service)))
            .service(
                web::resource("/barbershop/services/{id}/delete").route(web::post().to(delete_service)),
            )
            .service(web::resource("/barbershop/portfolio").route(web::post().to(add_portfolio_image)))
            .service(
                web::resource("/barbershop/portfolio/{id}/delete")
                    .route(web::post().to(delete_portfolio_image)),
            )
            .service(
                web::resource("/schedule")
                    .route(web::get().to(schedule))
                    .route(web::post().to(save_schedule)),
            )
            .service(web::resource("/schedule/toggle").route(web::post().to(toggle_schedule))),
    );
}

async fn index() -> HttpResponse {
    HttpResponse::Found()
        .append_header((header::LOCATION, "/admin/dashboard"))
        .finish()
}

fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .append_header((header::LOCATION, location))
        .finish()
}

/// Only follows redirect targets inside the back-office.
fn back_to(next: Option<&str>, fallback: &str) -> HttpResponse {
    match next {
        Some(next) if next.starts_with("/admin") => see_other(next),
        _ => see_other(fallback),
    }
}

fn to_view(appointment: &Appointment) -> AppointmentView {
    let notes = appointment.notes.clone().unwrap_or_default();
    AppointmentView {
        id: appointment.id.clone(),
        name: appointment.name.clone(),
        phone: appointment.phone.clone(),
        email: appointment.email.clone(),
        service: appointment.service.clone(),
        price: service_price(&appointment.service),
        date: appointment.date.format("%d/%m/%Y").to_string(),
        time: appointment.time.clone(),
        has_notes: !notes.trim().is_empty(),
        notes,
        status: appointment.status.to_string(),
        is_pending: appointment.status == Status::Pending,
    }
}

fn date_options(selected: DateFilter) -> Vec<SelectOption> {
    [
        (DateFilter::Today, "Hoje"),
        (DateFilter::Week, "Esta semana"),
        (DateFilter::Month, "Este mês"),
        (DateFilter::All, "Todos"),
    ]
    .into_iter()
    .map(|(filter, label)| SelectOption {
        value: filter.as_query(),
        label,
        selected: filter == selected,
    })
    .collect()
}

fn status_options(selected: StatusFilter) -> Vec<SelectOption> {
    let mut options = vec![SelectOption {
        value: StatusFilter::All.as_query().to_string(),
        label: "Todos",
        selected: selected == StatusFilter::All,
    }];
    options.extend(Status::ALL.into_iter().map(|status| SelectOption {
        value: StatusFilter::Only(status).as_query().to_string(),
        label: match status {
            Status::Pending => "Pendente",
            Status::Confirmed => "Confirmado",
            Status::Cancelled => "Cancelado",
        },
        selected: selected == StatusFilter::Only(status),
    }));
    options
}

async fn dashboard(
    req: HttpRequest,
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    query: web::Query<FilterQuery>,
) -> Result<HttpResponse> {
    let criteria = query.into_inner().into_criteria(DateFilter::Today);
    let today = dashboard::today();
    let appointments = store::list(&state.db).await?;
    let stats = dashboard::stats(&appointments, today);

    let cards = vec![
        StatCard::new("Hoje", stats.today),
        StatCard::new("Esta semana", stats.week),
        StatCard::new("Este mês", stats.month),
        StatCard::new("Total de agendamentos", stats.total),
        StatCard::new("Clientes", stats.clients),
        StatCard::new("Receita semanal", format!("R$ {}", stats.weekly_revenue)),
        StatCard::new("Receita mensal", format!("R$ {}", stats.monthly_revenue)),
        StatCard::new("Pendentes", stats.pending),
        StatCard::new("Confirmados", stats.confirmed),
        StatCard::new("Cancelados", stats.cancelled),
    ];

    let filtered = dashboard::filter(&appointments, &criteria, today)
        .into_iter()
        .map(to_view)
        .collect();

    let activities = recent_activities(&state.db, 10)
        .await
        .unwrap_or_else(|err| {
            log::warn!("Could not load activity feed: {err}");
            Vec::new()
        })
        .into_iter()
        .map(|row| ActivityView {
            message: row.message,
            created_at: row.created_at,
        })
        .collect();

    Ok(render(AdminDashboardTemplate {
        admin_name: auth.name.clone(),
        stats: cards,
        appointments: filtered,
        activities,
        date_options: date_options(criteria.date),
        status_options: status_options(criteria.status),
        search: criteria.search,
        next: req.uri().to_string(),
        default_password: state.config.admin_password == "admin",
    }))
}

async fn export_csv(
    state: web::Data<AppState>,
    query: web::Query<FilterQuery>,
) -> Result<HttpResponse> {
    let criteria = query.into_inner().into_criteria(DateFilter::Today);
    let today = dashboard::today();
    let appointments = store::list(&state.db).await?;
    let filtered = dashboard::filter(&appointments, &criteria, today);
    let body = export::to_csv(filtered.iter().copied());

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export::filename(today)),
        ))
        .body(body))
}

async fn list_appointments(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<FilterQuery>,
) -> Result<HttpResponse> {
    let criteria = query.into_inner().into_criteria(DateFilter::All);
    let appointments = store::list(&state.db).await?;
    let filtered: Vec<AppointmentView> = dashboard::filter(&appointments, &criteria, dashboard::today())
        .into_iter()
        .map(to_view)
        .collect();

    let date = match criteria.date {
        DateFilter::On(day) => day.format("%Y-%m-%d").to_string(),
        _ => String::new(),
    };

    Ok(render(AdminAppointmentsTemplate {
        total: filtered.len(),
        appointments: filtered,
        status_options: status_options(criteria.status),
        search: criteria.search,
        date,
        next: req.uri().to_string(),
    }))
}

async fn update_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Form<StatusForm>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse> {
    let appointment_id = path.into_inner();
    let form = form.into_inner();
    let target = Status::parse(&form.status)
        .ok_or_else(|| AppError::Validation(format!("Unknown status {:?}", form.status)))?;

    let appointment = store::set_status(&state.db, &appointment_id, target)
        .await
        .inspect_err(|err| log::error!("Status update for {appointment_id} failed: {err}"))?;

    log_activity(
        &state.db,
        "appointment_status",
        &format!(
            "{} marcou o agendamento de {} como {}.",
            auth.name, appointment.name, appointment.status
        ),
        Some(&auth.id),
        Some(&appointment_id),
    )
    .await;

    Ok(back_to(form.next.as_deref(), "/admin/appointments"))
}

async fn delete_appointment(
    state: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Form<RedirectForm>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse> {
    let appointment_id = path.into_inner();
    store::delete(&state.db, &appointment_id)
        .await
        .inspect_err(|err| log::error!("Deleting appointment {appointment_id} failed: {err}"))?;

    log_activity(
        &state.db,
        "appointment_deleted",
        &format!("{} excluiu um agendamento.", auth.name),
        Some(&auth.id),
        Some(&appointment_id),
    )
    .await;

    Ok(back_to(form.next.as_deref(), "/admin/appointments"))
}

fn client_view(client: &Client) -> ClientView {
    ClientView {
        name: client.name.clone(),
        phone: client.phone.clone(),
        email: client.email.clone(),
        visit_count: client.visit_count,
        last_appointment: client.last_appointment.format("%d/%m/%Y").to_string(),
        total_spent: client.total_spent,
        active: client.activity.is_active(),
    }
}

async fn list_clients(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse> {
    let search = query.into_inner().q.unwrap_or_default().trim().to_string();
    let appointments = store::list(&state.db).await?;
    let all = clients::aggregate(&appointments, dashboard::today());
    let summary = clients::stats(&all);

    let stats = vec![
        StatCard::new("Total de clientes", summary.total),
        StatCard::new("Clientes ativos", summary.active),
        StatCard::new("Receita total", format!("R$ {}", summary.revenue)),
        StatCard::new("Média por cliente", format!("R$ {}", summary.average)),
    ];

    Ok(render(AdminClientsTemplate {
        stats,
        clients: clients::search(&all, &search).into_iter().map(client_view).collect(),
        search,
    }))
}

async fn list_users(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse> {
    let search = query.into_inner().q.unwrap_or_default().trim().to_string();
    let counts: HashMap<String, i64> = store::count_by_user(&state.db).await?.into_iter().collect();

    let users: Vec<UserView> = auth::list_customers(&state.db)
        .await?
        .into_iter()
        .filter(|user| dashboard::matches_search(&search, &user.name, &user.email, &user.phone))
        .map(|user| UserView {
            appointments: counts.get(&user.id).copied().unwrap_or(0),
            id: user.id,
            name: user.name,
            phone: user.phone,
            email: user.email,
            created_at: user.created_at,
        })
        .collect();

    Ok(render(AdminUsersTemplate {
        total: users.len(),
        users,
        search,
    }))
}

async fn delete_user(
    state: web::Data<AppState>,
    path: web::Path<String>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    auth::delete_customer(&state.db, &user_id).await?;
    log_activity(
        &state.db,
        "user_deleted",
        &format!("{} excluiu uma conta de cliente.", auth.name),
        Some(&auth.id),
        None,
    )
    .await;
    Ok(see_other("/admin/users"))
}

async fn barbershop(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(render(AdminBarbershopTemplate {
        profile: settings::load_profile(&state.db).await?,
        services: settings::list_services(&state.db).await?,
        portfolio: settings::list_portfolio(&state.db).await?,
    }))
}

async fn save_profile(
    state: web::Data<AppState>,
    form: web::Form<BarbershopProfile>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse> {
    settings::save_profile(&state.db, &form.into_inner()).await?;
    log_activity(
        &state.db,
        "profile_updated",
        &format!("{} atualizou as informações da barbearia.", auth.name),
        Some(&auth.id),
        None,
    )
    .await;
    Ok(see_other("/admin/barbershop"))
}

async fn create_service(
    state: web::Data<AppState>,
    form: web::Form<ServiceInput>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse> {
    let service = settings::create_service(&state.db, &form.into_inner()).await?;
    log_activity(
        &state.db,
        "service_created",
        &format!("{} adicionou o serviço {}.", auth.name, service.name),
        Some(&auth.id),
        None,
    )
    .await;
    Ok(see_other("/admin/barbershop"))
}

async fn update_service(
    state: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Form<ServiceInput>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse> {
    let input = form.into_inner();
    settings::update_service(&state.db, &path.into_inner(), &input).await?;
    log_activity(
        &state.db,
        "service_updated",
        &format!("{} atualizou o serviço {}.", auth.name, input.name.trim()),
        Some(&auth.id),
        None,
    )
    .await;
    Ok(see_other("/admin/barbershop"))
}

async fn delete_service(
    state: web::Data<AppState>,
    path: web::Path<String>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse> {
    settings::delete_service(&state.db, &path.into_inner()).await?;
    log_activity(
        &state.db,
        "service_deleted",
        &format!("{} excluiu um serviço.", auth.name),
        Some(&auth.id),
        None,
    )
    .await;
    Ok(see_other("/admin/barbershop"))
}

async fn add_portfolio_image(
    state: web::Data<AppState>,
    form: web::Form<PortfolioInput>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse> {
    let image = settings::add_portfolio_image(&state.db, &form.into_inner()).await?;
    log_activity(
        &state.db,
        "portfolio_added",
        &format!("{} adicionou uma imagem em {}.", auth.name, image.category),
        Some(&auth.id),
        None,
    )
    .await;
    Ok(see_other("/admin/barbershop"))
}

async fn delete_portfolio_image(
    state: web::Data<AppState>,
    path: web::Path<String>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse> {
    settings::delete_portfolio_image(&state.db, &path.into_inner()).await?;
    log_activity(
        &state.db,
        "portfolio_deleted",
        &format!("{} removeu uma imagem do portfolio.", auth.name),
        Some(&auth.id),
        None,
    )
    .await;
    Ok(see_other("/admin/barbershop"))
}

async fn schedule(state: web::Data<AppState>) -> Result<HttpResponse> {
    let schedule = settings::load_schedule(&state.db).await?;
    let days = WEEKDAYS
        .iter()
        .filter_map(|&(key, label)| {
            schedule.day(key).map(|day| DayView {
                key,
                label,
                enabled: day.enabled,
                start: day.start.clone(),
                end: day.end.clone(),
            })
        })
        .collect();

    Ok(render(AdminScheduleTemplate {
        days,
        is_open: schedule.is_open,
        closed_message: schedule.closed_message,
    }))
}

async fn save_schedule(
    state: web::Data<AppState>,
    form: web::Form<HashMap<String, String>>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse> {
    let mut schedule = settings::load_schedule(&state.db).await?;
    schedule.apply_form(&form)?;
    settings::save_schedule(&state.db, &schedule).await?;
    log_activity(
        &state.db,
        "schedule_updated",
        &format!("{} atualizou os horários.", auth.name),
        Some(&auth.id),
        None,
    )
    .await;
    Ok(see_other("/admin/schedule"))
}

async fn toggle_schedule(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse> {
    let is_open = settings::toggle_open(&state.db).await?;
    let message = if is_open {
        format!("{} abriu a barbearia.", auth.name)
    } else {
        format!("{} fechou a barbearia.", auth.name)
    };
    log_activity(&state.db, "schedule_toggled", &message, Some(&auth.id), None).await;
    Ok(see_other("/admin/schedule"))
}
