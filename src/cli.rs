use clap::{crate_authors, crate_description, crate_version, Arg, ArgAction, Command};
use pretty_env_logger::env_logger::Builder;
use std::env;
use std::io::Write;
use std::process::exit;

use dnssync_selectel::Config;

const EXIT_SYNC_ERROR: i32 = 1;
const EXIT_CONFIG_ERROR: i32 = 2;

fn set_logger_level(b: &mut Builder) {
    let mut b = b;
    if env::var("RUST_LOG").is_err() {
        b = b.filter_level(log::LevelFilter::Info)
    }
    b.init();
}

fn setup_logger() {
    // Adapted from env_logger examples. <3 Systemd support
    match std::env::var("RUST_LOG_STYLE") {
        Ok(s) if s == "SYSTEMD" => {
            let builder = &mut pretty_env_logger::env_logger::builder();
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "<{}>{}: {}",
                    match record.level() {
                        log::Level::Error => 3,
                        log::Level::Warn => 4,
                        log::Level::Info => 6,
                        log::Level::Debug => 7,
                        log::Level::Trace => 7,
                    },
                    record.target(),
                    record.args()
                )
            });
            set_logger_level(builder);
        }
        _ => {
            let builder = &mut pretty_env_logger::formatted_builder();
            set_logger_level(builder);
        }
    };
}

pub(crate) fn main() {
    let cli = Command::new("DNSSync")
        .about(format!(
            "{}\n{} {}",
            crate_description!(),
            "Configuration is managed using environment variables,",
            "e.g. DNSSYNC_SELECTEL__TOKEN and DNSSYNC_JSONFILE__SOURCE.",
        ))
        .arg(
            Arg::new("check")
                .action(ArgAction::SetTrue)
                .short('t')
                .long("test")
                .help("Check the configuration"),
        )
        .arg(
            Arg::new("dry-run")
                .action(ArgAction::SetTrue)
                .long("dry-run")
                .help("Show changes without applying them"),
        )
        .arg(
            Arg::new("list-zones")
                .action(ArgAction::SetTrue)
                .long("list-zones")
                .help("Print the zones known to the provider and exit"),
        )
        .version(crate_version!())
        .author(crate_authors!("\n"));

    let args = cli.get_matches();

    setup_logger();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(err) => {
            println!("{err}");
            exit(EXIT_CONFIG_ERROR);
        }
    };

    let source = match config.build_source() {
        Ok(s) => s,
        Err(err) => {
            println!("{err}");
            exit(EXIT_CONFIG_ERROR);
        }
    };

    if args.get_flag("check") {
        if let Err(err) = config.build_client() {
            println!("{err}");
            exit(EXIT_CONFIG_ERROR);
        }
        tracing::info!(
            provider = if config.selectel.is_some() {
                dnssync_selectel::selectel::PROVIDER_NAME
            } else {
                dnssync_selectel::legacy::PROVIDER_NAME
            },
            "Configuration is valid."
        );
        exit(0);
    }

    let mut service = match config.get_service() {
        Ok(s) => s,
        Err(err @ dnssync_selectel::common::Error::ConfigError { .. }) => {
            println!("{err}");
            exit(EXIT_CONFIG_ERROR);
        }
        Err(err) => {
            tracing::error!(error = %err, "Failed to connect to provider");
            exit(EXIT_SYNC_ERROR);
        }
    };

    if args.get_flag("list-zones") {
        for zone in service.list_zones() {
            println!("{zone}");
        }
        exit(0);
    }

    let result = source
        .read_zones()
        .and_then(|zones| service.sync(&zones, args.get_flag("dry-run")));
    match result {
        Ok(processed) => tracing::info!(processed = processed, "Sync completed"),
        Err(err) => {
            tracing::error!(error = %err, "Sync failed");
            exit(EXIT_SYNC_ERROR);
        }
    }
}
