use serde::Serialize;
use std::time::Duration;
use tokenward::app::App;
use tokenward::application_impl::hash_password;
use tokenward::domain_model::{Principal, Role, SubjectId};
use tokenward::logger::*;
use tokenward::settings::*;

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(app: &App, command: Command) -> anyhow::Result<()> {
    let auth = &app.auth_service;
    match command {
        Command::Issue { id, username, role } => {
            let role = role.parse::<Role>().map_err(|e| anyhow::anyhow!(e))?;
            let principal = Principal {
                id: SubjectId(id),
                username,
                role,
                active: true,
            };
            print_json(&auth.login(&principal).await?)
        }
        Command::Login { username, password } => {
            print_json(&auth.login_with_password(&username, &password).await?)
        }
        Command::Verify { token } => print_json(&auth.verify(&token).await?),
        Command::Refresh { token } => print_json(&auth.refresh(&token).await?),
        Command::Logout { token } => {
            auth.logout(&token).await?;
            print_json(&serde_json::json!({ "revoked": true }))
        }
        Command::LogoutAll { id } => {
            let removed = auth.logout_all(SubjectId(id)).await?;
            print_json(&serde_json::json!({ "removed": removed }))
        }
        Command::Sessions { id } => print_json(&auth.sessions(SubjectId(id)).await?),
        Command::HashPassword { .. } => {
            Err(anyhow::anyhow!("hash-password does not need a running service"))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    // needs no settings, store or secret
    let command = match cli.command {
        Command::HashPassword { password } => {
            println!("{}", hash_password(&password)?);
            return Ok(());
        }
        other => other,
    };

    let project_settings = parse_settings(cli.settings.as_deref())?;
    debug!(?project_settings);
    logger.reload_from_config(&LogConfig::from(&project_settings.log))?;

    let app = App::try_new(&project_settings).await?;
    let result = run(&app, command).await;

    let shutdown_timeout = Duration::from_secs(5);
    if tokio::time::timeout(shutdown_timeout, app.shutdown())
        .await
        .is_err()
    {
        error!("shutdown timed out");
    }

    result
}
