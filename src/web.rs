use std::path::{Path, PathBuf};
use std::sync::Arc;

use actix_files::Files;
use actix_web::http::header::{self, ContentDisposition, DispositionParam, DispositionType};
use actix_web::http::StatusCode;
use actix_web::{middleware, web, App, HttpRequest, HttpResponse, HttpServer};
use serde::Deserialize;
use tracing::{info, warn};

use crate::assignment::{check_assignments, cycle_count, AssignmentGenerator};
use crate::auth::AdminGate;
use crate::display::describe_assignment;
use crate::error::AppError;
use crate::form::{read_roster_csv, validate_submission, write_roster_csv, ParticipantRequest};
use crate::notify::{deliver_all, Mailer};
use crate::participant::ParticipantId;
use crate::store::ParticipantStore;

pub struct AppState {
    pub store: ParticipantStore,
    pub gate: AdminGate,
    pub generator: AssignmentGenerator,
    /// `None` when SMTP is not configured
    pub mailer: Option<Arc<dyn Mailer>>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    password: String,
}

type HandlerResult = Result<HttpResponse, AppError>;

fn require_admin(req: &HttpRequest, state: &AppState) -> Result<String, AppError> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    Ok(state.gate.authorize(header)?)
}

async fn admin_login(body: web::Json<LoginRequest>, state: web::Data<AppState>) -> HandlerResult {
    let token = state.gate.login(&body.password)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true, "token": token})))
}

async fn admin_logout(req: HttpRequest, state: web::Data<AppState>) -> HandlerResult {
    let token = require_admin(&req, &state)?;
    state.gate.logout(&token);
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
}

// Public: anyone may register themselves
async fn create_participant(
    body: web::Json<ParticipantRequest>,
    state: web::Data<AppState>,
) -> HandlerResult {
    let fields = validate_submission(&body).map_err(AppError::Validation)?;
    let participant = state.store.create(fields)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Participant added",
        "participant": participant,
    })))
}

async fn list_participants(req: HttpRequest, state: web::Data<AppState>) -> HandlerResult {
    require_admin(&req, &state)?;
    let roster = state.store.list()?;
    info!(participants = roster.len(), "roster requested");
    Ok(HttpResponse::Ok().json(roster))
}

async fn get_participant(
    req: HttpRequest,
    id: web::Path<String>,
    state: web::Data<AppState>,
) -> HandlerResult {
    require_admin(&req, &state)?;
    let participant = state.store.get(&ParticipantId::from(id.as_str()))?;
    Ok(HttpResponse::Ok().json(participant))
}

async fn update_participant(
    req: HttpRequest,
    id: web::Path<String>,
    body: web::Json<ParticipantRequest>,
    state: web::Data<AppState>,
) -> HandlerResult {
    require_admin(&req, &state)?;
    let fields = validate_submission(&body).map_err(AppError::Validation)?;
    let participant = state.store.update(&ParticipantId::from(id.as_str()), fields)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "participant": participant,
    })))
}

async fn delete_participant(
    req: HttpRequest,
    id: web::Path<String>,
    state: web::Data<AppState>,
) -> HandlerResult {
    require_admin(&req, &state)?;
    let (_, remaining) = state.store.remove(&ParticipantId::from(id.as_str()))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Participant removed",
        "participants": remaining,
    })))
}

// Bulk registration from an uploaded CSV; bad rows are reported, good rows kept
async fn import_participants(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> HandlerResult {
    require_admin(&req, &state)?;
    let rows = read_roster_csv(body.as_ref())?;

    let mut added = 0;
    let mut errors = Vec::new();
    for (line, row) in rows {
        let result = validate_submission(&row)
            .map_err(AppError::Validation)
            .and_then(|fields| state.store.create(fields).map_err(AppError::from));
        match result {
            Ok(_) => added += 1,
            Err(e) => errors.push(format!("line {}: {}", line, e)),
        }
    }

    info!(added, rejected = errors.len(), "participants imported");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": errors.is_empty(),
        "added": added,
        "errors": errors,
    })))
}

async fn export_participants(req: HttpRequest, state: web::Data<AppState>) -> HandlerResult {
    require_admin(&req, &state)?;
    let roster = state.store.list()?;
    let mut csv = Vec::new();
    write_roster_csv(&roster, &mut csv)?;

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename("participants.csv".to_string())],
        })
        .body(csv))
}

// Draws over the stored roster; the result is on disk before we answer
async fn generate_assignments(req: HttpRequest, state: web::Data<AppState>) -> HandlerResult {
    require_admin(&req, &state)?;
    info!("generating assignments");

    let generator = state.generator;
    let roster = state
        .store
        .redraw(|roster| generator.generate(roster).map_err(AppError::from))?;

    for line in describe_assignment(&roster) {
        info!("{}", line);
    }
    info!(chains = cycle_count(&roster).unwrap_or_default(), "assignments generated");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Assignments generated",
        "participants": roster,
    })))
}

async fn send_emails(req: HttpRequest, state: web::Data<AppState>) -> HandlerResult {
    require_admin(&req, &state)?;
    let mailer = state.mailer.clone().ok_or(AppError::MailerNotConfigured)?;
    let roster = state.store.list()?;
    if roster.is_empty() {
        return Err(AppError::Validation("No participants".to_string()));
    }

    if let Err(defect) = check_assignments(&roster) {
        warn!(%defect, "the current draw does not cover everybody");
    }

    info!(participants = roster.len(), "sending letters");
    let report = web::block(move || deliver_all(mailer.as_ref(), &roster)).await?;
    let message = report.summary();

    if report.is_complete() {
        Ok(HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": message,
            "report": report,
        })))
    } else {
        warn!(failed = report.failures.len(), "some letters were not delivered");
        Ok(HttpResponse::build(StatusCode::MULTI_STATUS).json(serde_json::json!({
            "success": false,
            "message": message,
            "errors": report.error_lines(),
            "report": report,
        })))
    }
}

/// Registers the JSON API under `/api`
pub fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .service(
        web::scope("/api")
            .route("/admin/login", web::post().to(admin_login))
            .route("/admin/logout", web::post().to(admin_logout))
            .route("/participants", web::post().to(create_participant))
            .route("/participants", web::get().to(list_participants))
            .route("/participants/import", web::post().to(import_participants))
            .route("/participants/export", web::get().to(export_participants))
            .route("/participants/{id}", web::get().to(get_participant))
            .route("/participants/{id}", web::put().to(update_participant))
            .route("/participants/{id}", web::delete().to(delete_participant))
            .route("/generate-assignments", web::post().to(generate_assignments))
            .route("/send-emails", web::post().to(send_emails)),
    );
}

fn static_files(cfg: &mut web::ServiceConfig, dir: &Path) {
    if dir.is_dir() {
        cfg.service(Files::new("/", dir).index_file("index.html"));
    } else {
        warn!(dir = %dir.display(), "static directory not found, serving the API only");
    }
}

pub async fn start_server(port: u16, state: AppState, static_dir: PathBuf) -> std::io::Result<()> {
    let app_state = web::Data::new(state);

    HttpServer::new(move || {
        let static_dir = static_dir.clone();
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .configure(api_routes)
            .configure(move |cfg| static_files(cfg, &static_dir))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::delivery::testing::FakeMailer;
    use crate::participant::Participant;
    use crate::store::temp_store_path;
    use actix_web::test;
    use serde_json::Value;

    const PASSWORD: &str = "letmein";

    fn state(mailer: Option<Arc<dyn Mailer>>) -> web::Data<AppState> {
        web::Data::new(AppState {
            store: ParticipantStore::open(temp_store_path("web")).unwrap(),
            gate: AdminGate::new(PASSWORD),
            generator: AssignmentGenerator::default(),
            mailer,
        })
    }

    fn login_request() -> test::TestRequest {
        test::TestRequest::post()
            .uri("/api/admin/login")
            .set_json(serde_json::json!({"password": PASSWORD}))
    }

    fn register_request(name: &str, wishlist: &str) -> test::TestRequest {
        test::TestRequest::post().uri("/api/participants").set_json(serde_json::json!({
            "name": name,
            "email": format!("{}@example.com", name.to_lowercase()),
            "wishlist": wishlist,
        }))
    }

    macro_rules! login {
        ($app:expr) => {{
            let body: Value = test::call_and_read_body_json($app, login_request().to_request()).await;
            format!("Bearer {}", body["token"].as_str().unwrap())
        }};
    }

    macro_rules! register {
        ($app:expr, $name:expr, $wishlist:expr) => {{
            let req = register_request($name, $wishlist).to_request();
            let body: Value = test::call_and_read_body_json($app, req).await;
            serde_json::from_value::<Participant>(body["participant"].clone()).unwrap()
        }};
    }

    #[actix_web::test]
    async fn admin_routes_need_a_token() {
        let state = state(None);
        let app = test::init_service(App::new().app_data(state.clone()).configure(api_routes)).await;

        for (method, uri) in [
            (test::TestRequest::get(), "/api/participants"),
            (test::TestRequest::post(), "/api/generate-assignments"),
            (test::TestRequest::post(), "/api/send-emails"),
            (test::TestRequest::delete(), "/api/participants/abc"),
        ] {
            let resp = test::call_service(&app, method.uri(uri).to_request()).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }

        let req = test::TestRequest::post()
            .uri("/api/admin/login")
            .set_json(serde_json::json!({"password": "nope"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn registration_validates_and_deduplicates() {
        let state = state(None);
        let app = test::init_service(App::new().app_data(state.clone()).configure(api_routes)).await;

        register!(&app, "Alice", "");

        let dup = test::TestRequest::post()
            .uri("/api/participants")
            .set_json(serde_json::json!({"name": "Other", "email": "ALICE@example.com"}))
            .to_request();
        let resp = test::call_service(&app, dup).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let missing = test::TestRequest::post()
            .uri("/api/participants")
            .set_json(serde_json::json!({"name": "", "email": "x@example.com"}))
            .to_request();
        let resp = test::call_service(&app, missing).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Name is required");

        assert_eq!(state.store.list().unwrap().len(), 1);
        std::fs::remove_file(state.store.path()).unwrap();
    }

    #[actix_web::test]
    async fn generate_needs_two_participants() {
        let state = state(None);
        let app = test::init_service(App::new().app_data(state.clone()).configure(api_routes)).await;
        let auth = login!(&app);
        register!(&app, "Alice", "");

        let req = test::TestRequest::post()
            .uri("/api/generate-assignments")
            .insert_header((header::AUTHORIZATION, auth.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(state.store.list().unwrap()[0].assigned_to.is_none());
        std::fs::remove_file(state.store.path()).unwrap();
    }

    #[actix_web::test]
    async fn generate_persists_a_derangement() {
        let state = state(None);
        let app = test::init_service(App::new().app_data(state.clone()).configure(api_routes)).await;
        let auth = login!(&app);
        for name in ["Alice", "Bob", "Carol", "Dave"] {
            register!(&app, name, "");
        }

        let req = test::TestRequest::post()
            .uri("/api/generate-assignments")
            .insert_header((header::AUTHORIZATION, auth.as_str()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);

        let stored = state.store.list().unwrap();
        assert_eq!(check_assignments(&stored), Ok(()));
        let reopened = ParticipantStore::open(state.store.path()).unwrap();
        assert_eq!(reopened.list().unwrap(), stored);
        std::fs::remove_file(state.store.path()).unwrap();
    }

    #[actix_web::test]
    async fn send_emails_reports_partial_failure() {
        let mailer = Arc::new(FakeMailer::failing_for(&["bob@example.com"]));
        let state = state(Some(mailer.clone()));
        let app = test::init_service(App::new().app_data(state.clone()).configure(api_routes)).await;
        let auth = login!(&app);
        for name in ["Alice", "Bob", "Carol"] {
            register!(&app, name, "books");
        }

        let req = test::TestRequest::post()
            .uri("/api/generate-assignments")
            .insert_header((header::AUTHORIZATION, auth.as_str()))
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::post()
            .uri("/api/send-emails")
            .insert_header((header::AUTHORIZATION, auth.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::MULTI_STATUS);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Sent 2 of 3");
        assert_eq!(body["report"]["sent"], 2);
        assert_eq!(body["errors"].as_array().unwrap().len(), 1);
        assert!(body["errors"][0].as_str().unwrap().starts_with("Bob: "));
        assert_eq!(mailer.sent_to().len(), 2);
        std::fs::remove_file(state.store.path()).unwrap();
    }

    #[actix_web::test]
    async fn send_emails_without_smtp_is_unavailable() {
        let state = state(None);
        let app = test::init_service(App::new().app_data(state.clone()).configure(api_routes)).await;
        let auth = login!(&app);

        let req = test::TestRequest::post()
            .uri("/api/send-emails")
            .insert_header((header::AUTHORIZATION, auth.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn update_delete_and_export() {
        let state = state(None);
        let app = test::init_service(App::new().app_data(state.clone()).configure(api_routes)).await;
        let auth = login!(&app);
        let alice = register!(&app, "Alice", "");
        register!(&app, "Bob", "");

        let req = test::TestRequest::put()
            .uri(&format!("/api/participants/{}", alice.id))
            .insert_header((header::AUTHORIZATION, auth.as_str()))
            .set_json(serde_json::json!({"name": "Alice", "email": "alice@example.com", "wishlist": "tea"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["participant"]["wishlist"], "tea");
        assert_eq!(body["participant"]["id"], alice.id.as_str());

        let req = test::TestRequest::get()
            .uri("/api/participants/export")
            .insert_header((header::AUTHORIZATION, auth.as_str()))
            .to_request();
        let csv = test::call_and_read_body(&app, req).await;
        let csv = String::from_utf8(csv.to_vec()).unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.contains("Alice,alice@example.com,tea,"));

        let req = test::TestRequest::delete()
            .uri(&format!("/api/participants/{}", alice.id))
            .insert_header((header::AUTHORIZATION, auth.as_str()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["participants"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/participants/{}", alice.id))
            .insert_header((header::AUTHORIZATION, auth.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        std::fs::remove_file(state.store.path()).unwrap();
    }

    #[actix_web::test]
    async fn import_keeps_good_rows() {
        let state = state(None);
        let app = test::init_service(App::new().app_data(state.clone()).configure(api_routes)).await;
        let auth = login!(&app);

        let csv = "name,email,wishlist\nAlice,alice@example.com,books\n,nobody@example.com,\nBob,bob@example.com,\nBobby,BOB@example.com,\n";
        let req = test::TestRequest::post()
            .uri("/api/participants/import")
            .insert_header((header::AUTHORIZATION, auth.as_str()))
            .set_payload(csv)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["added"], 2);
        assert_eq!(body["success"], false);
        let errors = body["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].as_str().unwrap().starts_with("line 3:"));
        assert!(errors[1].as_str().unwrap().starts_with("line 5:"));
        std::fs::remove_file(state.store.path()).unwrap();
    }
}
