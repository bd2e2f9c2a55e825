use ferry::config::{Config, Opts, Settings};
use ferry::global_var::set_debug_mode;
use ferry::utilities::init_logger;
use ferry::utilities::logger::install;

fn print_version_and_exit() -> ! {
    // These are set by build.rs; fall back to unknown if missing
    let pkg_version = env!("CARGO_PKG_VERSION");
    let commit = option_env!("GIT_COMMIT").unwrap_or("unknown");
    let state = option_env!("GIT_STATE").unwrap_or("unknown");
    let built = option_env!("BUILD_TIME").unwrap_or("unknown time");
    println!(
        "ferry-server {} (commit: {}, state: {}, built: {})",
        pkg_version, commit, state, built
    );
    std::process::exit(0)
}

#[tokio::main]
async fn main() {
    let opts = Opts::from_args();

    if opts.version {
        print_version_and_exit();
    }

    let config = match &opts.config {
        Some(path) => Config::from_file(path).unwrap_or_else(|e| {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }),
        None => Config::default(),
    };

    let settings = Settings::resolve(&opts, &config).unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    });

    set_debug_mode(settings.debug);
    let (logger, log_task) = match init_logger(settings.log_sink.clone()).await {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("Failed to start logger: {}", e);
            std::process::exit(1);
        }
    };
    install(logger.clone());
    logger.debug(format!("{:?}", settings));

    let server = match ferry::start(&settings).await {
        Ok(server) => server,
        Err(e) => {
            logger.error(format!("Failed to start server: {}", e));
            eprintln!("Failed to start server: {}", e);
            logger.shutdown().await;
            let _ = log_task.await;
            std::process::exit(1);
        }
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        logger.error(format!("Failed to wait for Ctrl-C: {}", e));
    }
    logger.info("Shutting down");
    if let Err(e) = server.shutdown().await {
        logger.error(format!("Listener shutdown failed: {}", e));
    }
    logger.shutdown().await;
    let _ = log_task.await;
}
