use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use entity_intel::model::{ArbitrationStatus, Config};
use entity_intel::service::{InMemoryProfileStore, Resolver};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut positional: Vec<&String> = Vec::new();
    let mut profile_name: Option<&str> = None;
    let mut i = 1;
    while i < args.len() {
        if args[i] == "--profile" {
            match args.get(i + 1) {
                Some(name) => {
                    profile_name = Some(name);
                    i += 2;
                }
                None => {
                    eprintln!("--profile requires a value");
                    return ExitCode::FAILURE;
                }
            }
        } else {
            positional.push(&args[i]);
            i += 1;
        }
    }
    if positional.len() < 2 {
        eprintln!(
            "Usage: {} <domain> <suspected-entity-name> [confidence] [--profile <name>]",
            args[0]
        );
        return ExitCode::FAILURE;
    }
    let domain = positional[0];
    let suspected_name = positional[1];
    let confidence: f64 = positional
        .get(2)
        .and_then(|c| c.parse().ok())
        .unwrap_or(0.7);

    let config = Config::from_env();
    let profiles = Arc::new(InMemoryProfileStore::new());
    let resolver = Resolver::new(&config, profiles);

    // The website claim normally comes from the extraction subsystem;
    // here it is synthesized from the CLI arguments.
    let website_claim = serde_json::json!({
        "claim_number": 0,
        "claim_type": "website_claim",
        "entity_name": suspected_name,
        "confidence": confidence,
        "source": "website_extraction",
    });

    tracing::info!(domain = %domain, name = %suspected_name, "Resolving entity");

    let result = resolver.resolve(domain, &website_claim, profile_name).await;

    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize result: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if result.status == ArbitrationStatus::Completed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
