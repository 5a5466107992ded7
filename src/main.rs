use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde_json::json;
use tracing::{debug, error, info};
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use relatara_lib::{
    AppConfig, AuthError, ErrorReport, HistoryNavigator, LoginForm, Navigator,
    Route, RouteGuard, SessionContext, SignupForm,
};

const CONFIG_FILE: &str = "relatara.config.json";

const USAGE: &str = "usage: relatara <command>

commands:
  status                                   show the current session
  login <email> <password>                 sign in with email and password
  signup <email> <password> <gender> <age> create an account
  google                                   sign in with the provider flow
  logout                                   sign out
  visit <path>                             resolve a route through the guard";

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    let env_file_path = dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            if cfg!(debug_assertions) {
                "relatara_lib=debug,relatara=debug,warn".into()
            } else {
                "relatara_lib=info,relatara=info,warn".into()
            }
        }))
        .with(tracing_subscriber::fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();

    match env_file_path {
        Some(path) => info!("Loaded environment variables from {}", path.display()),
        None => debug!("No .env file found. Using existing environment variables."),
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    let config = AppConfig::load(CONFIG_FILE)?;
    let context = SessionContext::from_config(&config)?;

    // Every run starts like a page load: resolve the stored session first
    let restored = context.restore().await;
    debug!(state = ?restored, "Session restored");

    match (command.as_str(), &args[1..]) {
        ("status", []) => print_status(&context)?,
        ("login", [email, password]) => {
            let form = LoginForm::new(email.as_str(), password.as_str());
            form.validate()?;
            report(context.login(&form.email, &form.password).await.map(|_| ()))?;
            print_status(&context)?;
        }
        ("signup", [email, password, gender, age_group]) => {
            let form = SignupForm {
                email: email.clone(),
                password: password.clone(),
                confirm_password: password.clone(),
                gender: gender.clone(),
                age_group: age_group.clone(),
            };
            form.validate()?;
            report(
                context
                    .signup(&form.email, &form.password, &form.gender, &form.age_group)
                    .await
                    .map(|_| ()),
            )?;
            print_status(&context)?;
        }
        ("google", []) => {
            report(context.sign_in_with_provider().await.map(|_| ()))?;
            print_status(&context)?;
        }
        ("logout", []) => {
            report(context.logout().await)?;
            print_status(&context)?;
        }
        ("visit", [path]) => visit(&context, path)?,
        _ => {
            println!("{}", USAGE);
            return Err(anyhow!("Unknown command or wrong arguments: {}", args.join(" ")));
        }
    }

    Ok(())
}

fn print_status(context: &SessionContext) -> Result<()> {
    let state = context.get_state();
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

/// Print a failed operation the way the view layer would show it
fn report(result: Result<(), AuthError>) -> Result<()> {
    if let Err(e) = result {
        error!(error = %e, "Session operation failed");
        let report = ErrorReport::from(&e);
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn visit(context: &SessionContext, path: &str) -> Result<()> {
    let requested = Route::parse(path);
    let navigator = Arc::new(HistoryNavigator::new(requested.clone()));
    let guard = RouteGuard::new();

    let decision = guard.evaluate(&navigator.current(), &context.get_state());
    let _watch = guard.watch(context.store(), navigator.clone());

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "requested": requested.path(),
            "location": navigator.current().path(),
            "decision": decision,
        }))?
    );
    Ok(())
}
