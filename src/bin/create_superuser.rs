//! CLI tool to create a staff superuser account.
//!
//! Usage: `cargo run --bin create-superuser -- <username> <password>`
//!
//! Reads `config.yml` (and `INFORM_AGENCY_*` overrides) to find the database.

use std::path::Path;

use anyhow::{bail, Result};

use inform_agency::config::Config;
use inform_agency::db::{self, migrations};
use inform_agency::forms::{FormData, RedactorCreationForm};
use inform_agency::services::RedactorServiceError;
use inform_agency::web::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let [username, password] = args.as_slice() else {
        bail!("usage: create-superuser <username> <password>");
    };

    let mut form = RedactorCreationForm::from_data(&FormData::from_iter([
        ("username", username.as_str()),
        ("years_of_experience", "0"),
        ("password1", password.as_str()),
        ("password2", password.as_str()),
    ]));
    if form.clean().is_none() {
        for (field, message) in form.errors.iter() {
            eprintln!("{}: {}", field, message);
        }
        bail!("invalid account details");
    }

    let config = Config::load_with_env(Path::new("config.yml"))?;
    let pool = db::create_pool(&config.database).await?;
    migrations::run_migrations(&pool).await?;

    let state = AppState::new(pool, config)?;
    match state.redactor_service.create_superuser(username, password).await {
        Ok(redactor) => {
            println!("Created superuser {} (id {})", redactor.username, redactor.id);
            Ok(())
        }
        Err(RedactorServiceError::UsernameExists(name)) => {
            bail!("a user named {} already exists", name)
        }
        Err(e) => Err(e.into()),
    }
}
