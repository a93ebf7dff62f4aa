use clap::Parser;
use memberctl::{Application, Config, config::Args, telemetry};
use tokio::signal;

/// Resolves on the first Ctrl+C or SIGTERM. A signal that cannot be watched is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => "Ctrl+C",
            Err(e) => {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                "SIGTERM"
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&str>();

    let received = tokio::select! {
        name = ctrl_c => name,
        name = terminate => name,
    };
    tracing::info!(signal = received, "Shutting down gracefully...");
}

/// One-line description of what a loaded config would run, printed by `--validate`.
fn describe(config: &Config) -> String {
    let backend = match config.database_url() {
        Some(_) => "external PostgreSQL",
        None => "in-memory store",
    };
    let seed = if config.seed.enabled {
        format!("seeding {} members", config.seed.count)
    } else {
        "seeding disabled".to_string()
    };
    format!("memberctl on {} with {backend}, {seed}", config.bind_address())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // The OTLP exporter and sqlx both build TLS clients
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let args = Args::parse();
    let config = Config::load(&args)?;

    if args.validate {
        println!("Configuration is valid: {}", describe(&config));
        return Ok(());
    }

    telemetry::init_telemetry(config.enable_otel_export)?;
    tracing::debug!(?args, "{}", describe(&config));

    Application::new(config).await?.serve(shutdown_signal()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use memberctl::config::DatabaseConfig;

    #[test]
    fn test_describe_names_backend_and_seed() {
        let mut config = Config::default();
        config.seed.enabled = false;
        let text = describe(&config);
        assert!(text.contains("in-memory store"));
        assert!(text.contains("seeding disabled"));

        config.database = DatabaseConfig::External {
            url: "postgres://localhost/members".to_string(),
            pool: Default::default(),
        };
        config.seed.enabled = true;
        config.seed.count = 7;
        let text = describe(&config);
        assert!(text.contains("external PostgreSQL"));
        assert!(text.contains("seeding 7 members"));
    }
}
