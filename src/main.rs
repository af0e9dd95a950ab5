mod assignment;
mod auth;
mod config;
mod display;
mod error;
mod form;
mod notify;
mod participant;
mod store;
mod web;

use std::fs::File;
use std::sync::Arc;

use tracing::{info, warn};

use assignment::AssignmentGenerator;
use auth::AdminGate;
use config::Config;
use display::{print_assignment, print_roster};
use form::write_roster_csv;
use notify::{Mailer, SmtpMailer};
use store::ParticipantStore;

const USAGE: &str = "usage: secret-santa [web [port] | draw | reset | list | export <file.csv>]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let generator = AssignmentGenerator::new(config.draw_mode, config.max_attempts);
    let store = ParticipantStore::open(&config.data_file)?;

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("web") => {
            let port = args
                .get(2)
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(config.port);

            let mailer: Option<Arc<dyn Mailer>> = match &config.smtp {
                Some(smtp) => Some(Arc::new(SmtpMailer::new(smtp)?)),
                None => {
                    warn!("EMAIL_HOST/EMAIL_USER/EMAIL_PASSWORD not set, sending letters is disabled");
                    None
                }
            };

            info!(port, data_file = %config.data_file.display(), mode = ?config.draw_mode, "starting web server");
            info!("participant form: http://localhost:{}/index.html", port);
            info!("admin panel: http://localhost:{}/admin.html", port);

            let state = web::AppState {
                store,
                gate: AdminGate::new(config.admin_password.clone()),
                generator,
                mailer,
            };
            web::start_server(port, state, config.static_dir.clone()).await?;
        }
        Some("draw") => {
            let roster = store.redraw(|roster| generator.generate(roster).map_err(error::AppError::from))?;
            print_assignment(&roster);
            println!("\nAssignments saved to {}", store.path().display());
        }
        Some("reset") => {
            let mut roster = store.list()?;
            for p in &mut roster {
                p.assigned_to = None;
            }
            store.replace_all(roster)?;
            println!("Assignments cleared");
        }
        Some("list") => {
            print_roster(&store.list()?);
        }
        Some("export") => {
            let Some(path) = args.get(2) else {
                eprintln!("{}", USAGE);
                return Ok(());
            };
            let roster = store.list()?;
            write_roster_csv(&roster, File::create(path)?)?;
            println!("Exported {} participants to {}", roster.len(), path);
        }
        _ => {
            eprintln!("{}", USAGE);
        }
    }

    Ok(())
}
