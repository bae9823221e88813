use actix_web::{
    body::BoxBody,
    cookie::{time::Duration, Cookie, SameSite},
    dev::{ServiceRequest, ServiceResponse},
    error::{ErrorForbidden, ErrorUnauthorized},
    http::header::{self, Header},
    middleware::Next,
    web, Error, HttpMessage, HttpRequest, HttpResponse,
};
use actix_web_httpauth::{
    extractors::basic::BasicAuth,
    headers::authorization::{Authorization, Basic},
};
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use rand_core::OsRng;
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{UserRow, ROLE_ADMIN, ROLE_CUSTOMER},
    state::AppState,
};

pub const AUTH_REALM: &str = "Barbearia";
pub const LOGIN_FAILED: &str = "incorrect email or password";
const LOGOUT_COOKIE: &str = "barbearia_logged_out";

/// The signed-in account, attached to each authenticated request.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

impl From<UserRow> for AuthUser {
    fn from(user: UserRow) -> Self {
        Self {
            id: user.id,
            name: user.name,
            phone: user.phone,
            email: user.email,
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub password: String,
}

pub fn hash_password(password: &str) -> std::result::Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Creates a customer account. Admin accounts are only ever seeded.
pub async fn register(pool: &SqlitePool, form: &Registration) -> Result<AuthUser> {
    let name = form.name.trim();
    let email = form.email.trim().to_lowercase();
    if name.is_empty() {
        return Err(AppError::Validation("Name is required.".to_string()));
    }
    if !email.contains('@') {
        return Err(AppError::Validation("A valid email is required.".to_string()));
    }
    if form.password.trim().len() < 6 {
        return Err(AppError::Validation(
            "Password must be at least 6 characters.".to_string(),
        ));
    }

    let password_hash = hash_password(&form.password)
        .map_err(|_| AppError::Internal("password hash failed".to_string()))?;
    let user = AuthUser {
        id: new_id(),
        name: name.to_string(),
        phone: form.phone.trim().to_string(),
        email,
        role: ROLE_CUSTOMER.to_string(),
    };

    sqlx::query(
        r#"INSERT INTO users (id, name, phone, email, role, password_hash, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&user.id)
    .bind(&user.name)
    .bind(&user.phone)
    .bind(&user.email)
    .bind(&user.role)
    .bind(password_hash)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await
    .map_err(|err| match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Validation("Email already registered.".to_string())
        }
        _ => AppError::Database(err),
    })?;

    Ok(user)
}

/// Checks an email/password pair. Every failure reads the same to the caller.
pub async fn authenticate_credentials(
    pool: &SqlitePool,
    email: &str,
    password: &str,
) -> Option<AuthUser> {
    let user = sqlx::query_as::<_, UserRow>(
        r#"SELECT id, name, phone, email, role, password_hash, created_at
           FROM users
           WHERE email = ?
           LIMIT 1"#,
    )
    .bind(email.trim().to_lowercase())
    .fetch_optional(pool)
    .await;

    let user = match user {
        Ok(Some(user)) => user,
        Ok(None) => return None,
        Err(err) => {
            log::error!("Credential lookup failed: {err}");
            return None;
        }
    };

    if !verify_password(password, &user.password_hash) {
        return None;
    }

    Some(user.into())
}

pub async fn list_customers(pool: &SqlitePool) -> Result<Vec<UserRow>> {
    let rows = sqlx::query_as::<_, UserRow>(
        r#"SELECT id, name, phone, email, role, password_hash, created_at
           FROM users
           WHERE role = ?
           ORDER BY created_at DESC"#,
    )
    .bind(ROLE_CUSTOMER)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Deletes a customer account. Admin accounts never match.
pub async fn delete_customer(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM users WHERE id = ? AND role = ?")
        .bind(id)
        .bind(ROLE_CUSTOMER)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Customer"));
    }
    Ok(())
}

async fn authenticate(req: &ServiceRequest, credentials: &BasicAuth) -> std::result::Result<AuthUser, Error> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| ErrorUnauthorized(LOGIN_FAILED))?;
    let password = credentials.password().unwrap_or_default();
    authenticate_credentials(&state.db, credentials.user_id(), password)
        .await
        .ok_or_else(|| ErrorUnauthorized(LOGIN_FAILED))
}

pub async fn admin_validator(
    req: ServiceRequest,
    credentials: BasicAuth,
) -> std::result::Result<ServiceRequest, (Error, ServiceRequest)> {
    match authenticate(&req, &credentials).await {
        Ok(user) => {
            if !user.is_admin() {
                return Err((ErrorForbidden("Admin access required"), req));
            }
            req.extensions_mut().insert(user);
            Ok(req)
        }
        Err(err) => Err((err, req)),
    }
}

/// Signed-in account for routes that work with or without one.
pub async fn optional_user(req: &HttpRequest, pool: &SqlitePool) -> Option<AuthUser> {
    if is_logged_out(req) {
        return None;
    }
    let credentials = Authorization::<Basic>::parse(req).ok()?.into_scheme();
    let password = credentials.password().unwrap_or_default();
    authenticate_credentials(pool, credentials.user_id(), password).await
}

fn marker_cookie(req: &HttpRequest, value: &'static str, max_age: Duration) -> Cookie<'static> {
    let mut cookie = Cookie::build(LOGOUT_COOKIE, value)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .finish();
    cookie.set_secure(req.connection_info().scheme() == "https");
    cookie
}

/// Set on sign-out; lives for a year or until the next successful login.
pub fn logout_cookie(req: &HttpRequest) -> Cookie<'static> {
    marker_cookie(req, "1", Duration::days(365))
}

pub fn clear_logout_cookie(req: &HttpRequest) -> Cookie<'static> {
    marker_cookie(req, "", Duration::ZERO)
}

pub fn is_logged_out(req: &HttpRequest) -> bool {
    req.cookie(LOGOUT_COOKIE).is_some()
}

/// Browsers keep replaying Basic credentials after sign-out, so protected
/// scopes refuse them while the logout cookie is present.
pub async fn logout_guard<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> std::result::Result<ServiceResponse<BoxBody>, Error>
where
    B: actix_web::body::MessageBody + 'static,
{
    if is_logged_out(req.request()) {
        let body = r#"<!doctype html>
<html lang="pt-BR">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Sessão encerrada</title>
    <link rel="stylesheet" href="/static/site.css" />
  </head>
  <body>
    <div class="card narrow">
      <h1>Você saiu</h1>
      <p>Sua sessão foi encerrada.</p>
      <p><a href="/login?next=/admin/dashboard">Entrar novamente</a> ou <a href="/">voltar ao site</a>.</p>
    </div>
  </body>
</html>"#;
        let response = HttpResponse::Unauthorized()
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .content_type("text/html; charset=utf-8")
            .body(body);
        return Ok(req.into_response(response));
    }

    let res = next.call(req).await?;
    Ok(res.map_into_boxed_body())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn registration(email: &str) -> Registration {
        Registration {
            name: "Pedro Alves".to_string(),
            phone: "11977776666".to_string(),
            email: email.to_string(),
            password: "navalha42".to_string(),
        }
    }

    #[test]
    fn hashes_verify_only_the_original_password() {
        let hash = hash_password("segredo").unwrap();
        assert!(verify_password("segredo", &hash));
        assert!(!verify_password("errado", &hash));
        assert!(!verify_password("segredo", "not-a-hash"));
    }

    #[actix_web::test]
    async fn registered_customers_can_sign_in() {
        let pool = test_pool().await;
        let user = register(&pool, &registration("Pedro@Mail.com")).await.unwrap();
        assert_eq!(user.email, "pedro@mail.com");
        assert!(!user.is_admin());

        let signed_in = authenticate_credentials(&pool, "pedro@mail.com", "navalha42")
            .await
            .unwrap();
        assert_eq!(signed_in.id, user.id);
        assert_eq!(signed_in.role, ROLE_CUSTOMER);
    }

    #[actix_web::test]
    async fn wrong_password_and_unknown_email_both_fail() {
        let pool = test_pool().await;
        register(&pool, &registration("pedro@mail.com")).await.unwrap();
        assert!(authenticate_credentials(&pool, "pedro@mail.com", "errada").await.is_none());
        assert!(authenticate_credentials(&pool, "ninguem@mail.com", "navalha42").await.is_none());
    }

    #[actix_web::test]
    async fn duplicate_emails_are_rejected() {
        let pool = test_pool().await;
        register(&pool, &registration("pedro@mail.com")).await.unwrap();
        let err = register(&pool, &registration("PEDRO@mail.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(message) if message.contains("already")));
    }

    #[actix_web::test]
    async fn only_customers_can_be_deleted() {
        let pool = test_pool().await;
        crate::db::seed_admin(&pool, &crate::db::test_config()).await.unwrap();
        let customer = register(&pool, &registration("pedro@mail.com")).await.unwrap();

        let admin_id: String = sqlx::query_scalar("SELECT id FROM users WHERE role = 'admin'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(matches!(
            delete_customer(&pool, &admin_id).await,
            Err(AppError::NotFound(_))
        ));

        assert_eq!(list_customers(&pool).await.unwrap().len(), 1);
        delete_customer(&pool, &customer.id).await.unwrap();
        assert!(list_customers(&pool).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn short_passwords_are_rejected() {
        let pool = test_pool().await;
        let mut form = registration("pedro@mail.com");
        form.password = "123".to_string();
        assert!(matches!(register(&pool, &form).await, Err(AppError::Validation(_))));
    }
}
