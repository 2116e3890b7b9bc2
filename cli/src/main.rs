//! pstore — command-line access to a file-backed profile store.
//!
//! # Usage
//!
//! ```text
//! pstore find --ip 127 --limit 5
//! pstore read 4f2a9c
//! pstore write 4f2a9c --ip 127.0.0.1 --method GET --url http://localhost/
//! pstore export 4f2a9c > profile.json
//! pstore import profile.json
//! pstore purge
//! ```
//!
//! The store location comes from `--dsn`, else `--config <yaml>`, else
//! `PROFILER_DSN`, else `file:$HOME/.cache/pstore`.

use std::path::{Path, PathBuf};
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};

use profiler_store_core::command::{execute, Command, Response};
use profiler_store_core::{FileProfilerStorage, Profile, StoreConfig, StoreError};

#[derive(Debug, Parser)]
#[command(name = "pstore", version, about = "Inspect and maintain a file-backed profile store")]
struct Cli {
    /// Storage location, e.g. file:/var/cache/profiler
    #[arg(long, global = true)]
    dsn: Option<String>,

    /// YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    action: Action,
}

#[derive(Debug, Subcommand)]
enum Action {
    /// Show a profile with its parent chain and children
    Read { token: String },
    /// List recorded profiles, newest first
    Find {
        #[arg(long)]
        ip: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        method: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Record a profile from command-line fields
    Write {
        token: String,
        #[arg(long, default_value = "")]
        ip: String,
        #[arg(long, default_value = "")]
        method: String,
        #[arg(long, default_value = "")]
        url: String,
        /// Unix seconds; defaults to now
        #[arg(long)]
        time: Option<u64>,
        #[arg(long)]
        parent: Option<String>,
        /// Child token; repeatable
        #[arg(long = "child")]
        children: Vec<String>,
        /// Collector payload as JSON
        #[arg(long)]
        data: Option<String>,
    },
    /// Store a profile from a JSON blob file
    Import { file: PathBuf },
    /// Print a profile as a JSON blob
    Export { token: String },
    /// Delete every stored profile and the index
    Purge,
}


fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let config = match resolve_config(cli.dsn.as_deref(), cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => fail(&e.to_string()),
    };

    let storage = match FileProfilerStorage::from_config(&config) {
        Ok(s) => s,
        Err(e) => fail(&e.to_string()),
    };

    let cmd = match to_command(cli.action) {
        Ok(c) => c,
        Err(e) => fail(&e),
    };

    match execute(&storage, cmd, config.default_limit) {
        Response::Ok { output } => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Response::Error { message } => fail(&message),
    }
}


fn fail(message: &str) -> ! {
    eprintln!("pstore: {}", message);
    process::exit(1);
}


/// `--dsn` overrides whatever location the other sources provide.
fn resolve_config(dsn: Option<&str>, config: Option<&Path>) -> Result<StoreConfig, StoreError> {
    let mut resolved = match config {
        Some(path) => StoreConfig::load(path)?,
        None => match StoreConfig::from_env()? {
            Some(c) => c,
            None => StoreConfig::new(default_dsn()),
        },
    };
    if let Some(dsn) = dsn {
        resolved.dsn = dsn.to_string();
        resolved.dsn()?;
    }
    log::debug!("using profile store {}", resolved.dsn);
    Ok(resolved)
}


fn default_dsn() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    format!("file:{}", PathBuf::from(home).join(".cache").join("pstore").display())
}


fn to_command(action: Action) -> Result<Command, String> {
    let cmd = match action {
        Action::Read { token } => Command::Read { token },
        Action::Find {
            ip,
            url,
            method,
            limit,
        } => Command::Find {
            ip,
            url,
            method,
            limit,
        },
        Action::Write {
            token,
            ip,
            method,
            url,
            time,
            parent,
            children,
            data,
        } => {
            let mut profile = Profile::new(token);
            profile.set_ip(ip);
            profile.set_method(method);
            profile.set_url(url);
            profile.set_time(time.unwrap_or_else(now_secs));
            profile.set_parent_token(parent);
            profile.set_child_tokens(children);
            if let Some(raw) = data {
                let payload = serde_json::from_str(&raw)
                    .map_err(|e| format!("--data is not valid JSON: {}", e))?;
                profile.set_collectors(payload);
            }
            Command::Write { profile }
        }
        Action::Import { file } => {
            let blob = std::fs::read_to_string(&file)
                .map_err(|e| format!("cannot read {}: {}", file.display(), e))?;
            Command::Import { blob }
        }
        Action::Export { token } => Command::Export { token },
        Action::Purge => Command::Purge,
    };
    Ok(cmd)
}


fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
