//! Trekline CLI - sign in, inspect the session, and load the home feed
//! from the terminal.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trekline_core::{
    ApiError, AuthError, CategoryResult, Config, FeedState, SessionState, Trekline,
};

/// Number of items listed per category by `feed`
const PREVIEW_ITEMS: usize = 3;

const LOG_FILE_PREFIX: &str = "trekline.log";

const USAGE: &str = "\
Usage: trekline <command>

Commands:
  status          Show the current session
  login [email]   Sign in (prompts for the password)
  logout          Sign out and forget the stored credential
  feed            Load every home-screen category
  cache           Show the age of every snapshot";

/// Initialize the tracing subscriber for logging
///
/// Logs go to stderr and, when a log directory is available, to a daily
/// rolling file. `RUST_LOG` controls the level (default `warn`).
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir.filter(|dir| std::fs::create_dir_all(dir).is_ok()) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: failed to load config ({}), using defaults", e);
        Config::default()
    });

    let log_dir = config.cache_dir().ok().map(|dir| dir.join("logs"));
    let _guard = init_tracing(log_dir.as_deref());
    info!(api = %config.api_base_url, "Trekline starting");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        println!("{}", USAGE);
        return Ok(());
    };

    let trekline = Trekline::from_config(&config)?;

    match command {
        "status" => status(&trekline).await,
        "login" => login(&trekline, &mut config, args.get(1).cloned()).await,
        "logout" => logout(&trekline).await,
        "feed" => feed(&trekline).await,
        "cache" => cache(&trekline).await,
        "help" | "--help" | "-h" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}\n", other);
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }
}

async fn status(trekline: &Trekline) -> Result<()> {
    match trekline.session.check_current_state().await {
        SessionState::Authenticated => {
            let session = trekline.session.session();
            let who = session
                .as_ref()
                .and_then(|s| s.display_name().map(str::to_string))
                .unwrap_or_else(|| "unknown user".to_string());
            println!("Signed in as {}", who);
            match session.and_then(|s| s.minutes_until_expiry()) {
                Some(minutes) => println!("Session expires in {} minutes", minutes),
                None => println!("Session does not expire"),
            }
        }
        _ => {
            if trekline.reset.count() > 0 {
                println!("Your session has ended. Please sign in again.");
            } else {
                println!("Not signed in");
            }
        }
    }
    Ok(())
}

async fn login(trekline: &Trekline, config: &mut Config, email: Option<String>) -> Result<()> {
    trekline.session.check_current_state().await;

    let email = match email {
        Some(email) => email,
        None => prompt_email(config.last_email.as_deref())?,
    };
    if email.is_empty() {
        anyhow::bail!("Email is required");
    }
    let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;

    println!("\nAuthenticating...");
    let response = match trekline.api.authenticate(&email, &password).await {
        Ok(response) => response,
        Err(ApiError::Unauthorized) => anyhow::bail!("Invalid email or password"),
        Err(e) => anyhow::bail!(e.user_message()),
    };

    match trekline.session.login(&response.token, response.user).await {
        Ok(session) => {
            config.last_email = Some(email);
            if let Err(e) = config.save() {
                warn!(error = %e, "Failed to save config");
            }
            println!(
                "Signed in as {}",
                session.display_name().unwrap_or("unknown user")
            );
            Ok(())
        }
        Err(AuthError::InvalidCredential(reason)) => {
            anyhow::bail!("Server issued an unusable credential: {}", reason)
        }
        Err(e) => Err(e.into()),
    }
}

fn prompt_email(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => print!("Email [{}]: ", last),
        None => print!("Email: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    Ok(match (input.is_empty(), last) {
        (true, Some(last)) => last.to_string(),
        _ => input.to_string(),
    })
}

async fn logout(trekline: &Trekline) -> Result<()> {
    trekline.session.check_current_state().await;
    if trekline.session.logout().await {
        println!("Signed out");
    } else {
        println!("Not signed in");
    }
    Ok(())
}

async fn feed(trekline: &Trekline) -> Result<()> {
    trekline.session.check_current_state().await;

    let mut state = FeedState::new();
    trekline.coordinator.refresh(&mut state).await;

    let Some(home) = state.home() else {
        println!("Nothing to show");
        return Ok(());
    };

    print_treks(&home.all_treks);
    print_treks(&home.recommendations);
    print_treks(&home.trending);
    print_treks(&home.popular);
    print_named(&home.bookings, |b| {
        format!("{} ({})", b.trek_name.as_deref().unwrap_or(&b.trek_id), b.status)
    });
    print_named(&home.reviews, |r| format!("{} - {:.1}", r.trek_id, r.rating));
    print_named(&home.wishlist, |w| w.trek.name.clone());

    if trekline.reset.count() > 0 {
        println!("\nYour session has ended. Run `trekline login` to sign in again.");
    } else if state.needs_reload() {
        println!("\nSession changed while loading; run `trekline feed` again.");
    }
    Ok(())
}

fn print_treks(result: &CategoryResult<trekline_core::models::Trek>) {
    print_named(result, |t| {
        let summary = t.summary();
        if summary.is_empty() {
            t.name.clone()
        } else {
            format!("{} - {}", t.name, summary)
        }
    });
}

fn print_named<T>(result: &CategoryResult<T>, label: impl Fn(&T) -> String) {
    println!("{}", result.status_line());
    for item in result.items.iter().take(PREVIEW_ITEMS) {
        println!("    {}", label(item));
    }
    if result.len() > PREVIEW_ITEMS {
        println!("    ... and {} more", result.len() - PREVIEW_ITEMS);
    }
    if let Some(ref e) = result.live_error {
        if result.is_empty() {
            println!("    ({})", e.user_message());
        }
    }
}

async fn cache(trekline: &Trekline) -> Result<()> {
    trekline.session.check_current_state().await;
    let owner = trekline.session.owner();
    for (category, age) in trekline.cache().ages(owner.as_deref()).await {
        println!(
            "{:<22} {}",
            category.title(),
            age.as_deref().unwrap_or("no snapshot")
        );
    }
    Ok(())
}
