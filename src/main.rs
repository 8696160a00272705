//! Thin CLI layer: parse args, styled output, and call into sopdrop-core.
//! Errors surface as typed failures from the core; this file only formats.

use clap::{Arg, ArgAction, Command};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::env;
use std::io::{IsTerminal, Write};
use std::time::Duration;

use sopdrop_core::{config, AssetCache, AssetRef, AssetSlug, RegistryClient, SopdropError};

// ---- UI helpers (no-op when stdout isn't a TTY) ----

fn use_color() -> bool {
    std::io::stdout().is_terminal() && env::var("NO_COLOR").unwrap_or_default().is_empty()
}

fn success(msg: &str) {
    if use_color() {
        println!("{}", msg.green());
    } else {
        println!("{}", msg);
    }
}

fn error(msg: &str) {
    if use_color() {
        eprintln!("{}", msg.red());
    } else {
        eprintln!("{}", msg);
    }
}

#[allow(dead_code)]
fn warning(msg: &str) {
    if use_color() {
        eprintln!("{}", msg.yellow());
    } else {
        eprintln!("{}", msg);
    }
}

fn info(msg: &str) {
    if use_color() {
        println!("{}", msg.cyan());
    } else {
        println!("{}", msg);
    }
}

fn dim(msg: &str) {
    if use_color() {
        println!("{}", msg.dimmed());
    } else {
        println!("{}", msg);
    }
}

/// Read one trimmed line from stdin after printing a prompt.
fn prompt(msg: &str) -> Result<String, String> {
    print!("{}", msg);
    std::io::stdout().flush().map_err(|e| e.to_string())?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .map_err(|e| e.to_string())?;
    Ok(line.trim().to_string())
}

/// Run a blocking task behind a spinner when stdout is a TTY.
fn with_spinner<T>(
    message: &str,
    f: impl FnOnce() -> Result<T, SopdropError>,
) -> Result<T, SopdropError> {
    if !std::io::stdout().is_terminal() {
        return f();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⠈⠐⠠⠰⠸⠹")
            .template("{spinner:.dim} {msg}")
            .unwrap(),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    let result = f();
    spinner.finish_and_clear();
    result
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / 1024.0 / 1024.0)
    } else {
        format!("{:.0} KB", bytes as f64 / 1024.0)
    }
}

// ---- Commands ----

fn cmd_login() -> Result<(), String> {
    let cfg = config::load();
    let auth_url = format!("{}/auth/cli", config::effective_server_url(&cfg));
    info("Authenticate in your browser, then paste the token here.");
    println!("URL: {}", auth_url);
    let token = prompt("Token: ")?;
    if token.is_empty() {
        dim("No token provided. Login cancelled.");
        return Ok(());
    }
    let client = RegistryClient::new();
    let user = client.verify_login(&token).map_err(|e| e.to_string())?;
    let who = if user.username.is_empty() {
        user.email.unwrap_or_else(|| "unknown".to_string())
    } else {
        user.username
    };
    success(&format!("Logged in as {}", who));
    Ok(())
}

fn cmd_logout() -> Result<(), String> {
    config::clear_token().map_err(|e| e.to_string())?;
    success("Logged out.");
    Ok(())
}

fn cmd_search(query: &str, context: Option<&str>, tags: &[String]) -> Result<(), String> {
    let cfg = config::load();
    let context = context
        .map(str::to_string)
        .or_else(|| cfg.default_context.clone());
    let client = RegistryClient::new();
    let results = client
        .search(query, context.as_deref(), tags)
        .map_err(|e| e.to_string())?;

    if results.is_empty() {
        dim("No results found.");
        return Ok(());
    }
    info(&format!("Found {} asset(s):\n", results.len()));
    for asset in &results {
        println!("  {}/{}", asset.owner.username, asset.slug);
        dim(&format!(
            "    {} | {} downloads",
            asset.houdini_context.to_uppercase(),
            asset.download_count
        ));
        if !asset.description.is_empty() {
            let short: String = asset.description.chars().take(60).collect();
            dim(&format!("    {}", short));
        }
        println!();
    }
    Ok(())
}

fn cmd_info(slug: &str) -> Result<(), String> {
    let slug = AssetSlug::parse(slug).map_err(|e| e.to_string())?;
    let client = RegistryClient::new();
    let asset = client.info(&slug).map_err(|e| e.to_string())?;

    println!("\n{}", slug);
    println!("========================================");
    println!("Owner:       @{}", asset.owner.username);
    println!("Context:     {}", asset.houdini_context.to_uppercase());
    println!("License:     {}", asset.license);
    println!(
        "Version:     {}",
        asset.latest_version.as_deref().unwrap_or("?")
    );
    println!("Downloads:   {}", asset.download_count);
    if !asset.description.is_empty() {
        println!("\n{}", asset.description);
    }
    if !asset.tags.is_empty() {
        println!("\nTags: {}", asset.tags.join(", "));
    }
    println!();
    Ok(())
}

fn cmd_versions(slug: &str) -> Result<(), String> {
    let slug = AssetSlug::parse(slug).map_err(|e| e.to_string())?;
    let client = RegistryClient::new();
    let versions = client.versions(&slug).map_err(|e| e.to_string())?;

    if versions.is_empty() {
        dim("No versions found.");
        return Ok(());
    }
    info(&format!("\nVersions of {}:\n", slug));
    for v in &versions {
        let published = v
            .published_at
            .as_deref()
            .map(|d| d.chars().take(10).collect::<String>())
            .unwrap_or_else(|| "?".to_string());
        println!(
            "  {:12} | {} | {} downloads",
            v.version, published, v.download_count
        );
    }
    println!();
    Ok(())
}

fn install_asset(reference: &str, force: bool) -> Result<sopdrop_core::InstalledAsset, String> {
    let aref = AssetRef::parse(reference).map_err(|e| e.to_string())?;
    let client = RegistryClient::new();
    let cache = AssetCache::new();
    with_spinner(&format!("Fetching {} ...", aref), || {
        sopdrop_core::install(&client, &cache, &aref, force)
    })
    .map_err(|e| e.to_string())
}

fn cmd_install(reference: &str, force: bool) -> Result<(), String> {
    let installed = install_asset(reference, force)?;
    if installed.from_cache {
        dim(&format!("{} (cached)", installed.ref_string()));
    } else {
        success(&format!("Installed {}", installed.ref_string()));
    }
    println!("Saved to: {}", installed.path.display());
    Ok(())
}

fn cmd_preview(reference: &str) -> Result<(), String> {
    let installed = install_asset(reference, false)?;
    println!("{}", sopdrop_core::preview_report(&installed));
    dim(&format!(
        "\nTo paste from the host: sopdrop.paste(\"{}\")",
        installed.ref_string()
    ));
    Ok(())
}

fn cmd_code(reference: &str) -> Result<(), String> {
    let installed = install_asset(reference, false)?;
    println!("{}", sopdrop_core::code_listing(&installed));
    Ok(())
}

fn cmd_copy(reference: &str) -> Result<(), String> {
    let aref = AssetRef::parse(reference).map_err(|e| e.to_string())?;
    let client = RegistryClient::new();
    let cache = AssetCache::new();
    let installed = with_spinner(&format!("Fetching {} ...", aref), || {
        sopdrop_core::copy(&client, &cache, &aref)
    })
    .map_err(|e| e.to_string())?;
    success(&format!(
        "{} copied. The host Paste tool will use it instantly.",
        installed.ref_string()
    ));
    Ok(())
}

fn cmd_cache_status() -> Result<(), String> {
    let status = AssetCache::new().status();
    if status.entries.is_empty() {
        dim("Cache is empty");
        return Ok(());
    }
    println!("Cache: {}", status.root.display());
    println!("Node packages: {}", status.node_packages);
    println!("HDAs: {}", status.hdas);
    println!("Total size: {}", format_size(status.total_bytes));
    println!("\nCached assets:");
    for entry in &status.entries {
        println!("  {} ({})", entry.name, format_size(entry.size_bytes));
    }
    Ok(())
}

fn cmd_cache_clear() -> Result<(), String> {
    let removed = AssetCache::new().clear().map_err(|e| e.to_string())?;
    if removed == 0 {
        dim("Cache is already empty");
    } else {
        success(&format!("Cache cleared ({} files removed)", removed));
    }
    Ok(())
}

fn cmd_config_show() -> Result<(), String> {
    let cfg = config::load();
    println!("\nSopdrop configuration:");
    println!("========================================");
    println!("  server_url: {}", config::effective_server_url(&cfg));
    println!("  api_version: {}", cfg.api_version);
    println!("  cache_enabled: {}", cfg.cache_enabled);
    println!("  cache_max_size_mb: {}", cfg.cache_max_size_mb);
    println!(
        "  default_context: {}",
        cfg.default_context.as_deref().unwrap_or("none")
    );
    println!(
        "  token: {}",
        if config::token().is_some() {
            "***"
        } else {
            "not set"
        }
    );
    println!();
    Ok(())
}

fn cmd_config_server(url: &str) -> Result<(), String> {
    let saved = config::set_server_url(url).map_err(|e| e.to_string())?;
    success(&format!("Server URL set to: {}", saved));
    Ok(())
}

fn run() -> Result<(), String> {
    let matches = Command::new("sopdrop")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Sopdrop - Houdini asset registry client")
        .after_help(
            "Examples:\n  sopdrop search scatter\n  sopdrop install ana/scatter-points\n  sopdrop install ana/scatter-points@1.2.0\n  sopdrop preview ana/scatter-points\n  sopdrop cache clear",
        )
        .subcommand(Command::new("login").about("Authenticate with the registry"))
        .subcommand(Command::new("logout").about("Clear stored credentials"))
        .subcommand(
            Command::new("search")
                .about("Search for assets")
                .arg(Arg::new("query").required(true).help("Search query"))
                .arg(
                    Arg::new("context")
                        .short('c')
                        .long("context")
                        .help("Filter by context (sop, vop, ...)"),
                )
                .arg(
                    Arg::new("tags")
                        .short('t')
                        .long("tags")
                        .help("Filter by tags (comma-separated)"),
                ),
        )
        .subcommand(
            Command::new("info")
                .about("Show asset details")
                .arg(
                    Arg::new("slug")
                        .required(true)
                        .help("Asset slug (owner/name)"),
                ),
        )
        .subcommand(
            Command::new("versions")
                .about("List published versions of an asset")
                .arg(
                    Arg::new("slug")
                        .required(true)
                        .help("Asset slug (owner/name)"),
                ),
        )
        .subcommand(
            Command::new("install")
                .about("Download an asset into the local cache")
                .arg(
                    Arg::new("ref")
                        .required(true)
                        .help("Asset reference (owner/name or owner/name@1.0.0)"),
                )
                .arg(
                    Arg::new("force")
                        .short('f')
                        .long("force")
                        .action(ArgAction::SetTrue)
                        .help("Re-download even if cached"),
                ),
        )
        .subcommand(
            Command::new("preview")
                .about("Preview an asset without executing it")
                .arg(Arg::new("ref").required(true).help("Asset reference")),
        )
        .subcommand(
            Command::new("code")
                .about("Show the reviewable code of an asset")
                .arg(Arg::new("ref").required(true).help("Asset reference")),
        )
        .subcommand(
            Command::new("copy")
                .about("Stage a node asset on the local clipboard for instant paste")
                .arg(Arg::new("ref").required(true).help("Asset reference")),
        )
        .subcommand(
            Command::new("cache")
                .about("Manage the local asset cache")
                .subcommand(Command::new("status").about("Show cache contents and size"))
                .subcommand(Command::new("clear").about("Remove all cached assets")),
        )
        .subcommand(
            Command::new("config")
                .about("Show or change configuration")
                .subcommand(Command::new("show").about("Show current configuration"))
                .subcommand(
                    Command::new("server")
                        .about("Set the registry server URL")
                        .arg(Arg::new("url").required(true).help("Server URL")),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("login", _)) => cmd_login(),
        Some(("logout", _)) => cmd_logout(),
        Some(("search", sub)) => {
            let query = sub.get_one::<String>("query").unwrap();
            let context = sub.get_one::<String>("context").map(String::as_str);
            let tags: Vec<String> = sub
                .get_one::<String>("tags")
                .map(|t| {
                    t.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default();
            cmd_search(query, context, &tags)
        }
        Some(("info", sub)) => cmd_info(sub.get_one::<String>("slug").unwrap()),
        Some(("versions", sub)) => cmd_versions(sub.get_one::<String>("slug").unwrap()),
        Some(("install", sub)) => {
            cmd_install(sub.get_one::<String>("ref").unwrap(), sub.get_flag("force"))
        }
        Some(("preview", sub)) => cmd_preview(sub.get_one::<String>("ref").unwrap()),
        Some(("code", sub)) => cmd_code(sub.get_one::<String>("ref").unwrap()),
        Some(("copy", sub)) => cmd_copy(sub.get_one::<String>("ref").unwrap()),
        Some(("cache", sub)) => match sub.subcommand() {
            Some(("clear", _)) => cmd_cache_clear(),
            _ => cmd_cache_status(),
        },
        Some(("config", sub)) => match sub.subcommand() {
            Some(("server", server_sub)) => {
                cmd_config_server(server_sub.get_one::<String>("url").unwrap())
            }
            _ => cmd_config_show(),
        },
        _ => {
            if use_color() {
                println!("{}", "sopdrop".bright_cyan().bold());
                dim("Houdini asset registry client - search, install, paste.");
            } else {
                println!("sopdrop - Houdini asset registry client");
            }
            dim("\nRun `sopdrop --help` for details.");
            Ok(())
        }
    }
}

fn main() {
    if !use_color() {
        colored::control::set_override(false);
    }

    let code = match std::panic::catch_unwind(run) {
        Ok(Ok(())) => 0,
        Ok(Err(e)) => {
            error(&format!("Error: {}", e));
            1
        }
        Err(_) => {
            error("An unexpected error occurred. Please report this issue.");
            1
        }
    };
    std::process::exit(code);
}
