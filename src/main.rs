use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

mod app;
mod clash;
mod config;
mod error;
mod logging;
mod luci;
mod openclash;

use app::{RefreshOutcome, RuleStore};
use config::server::is_hostname;
use config::{AppConfig, LuciPackage, OpenWrtAccess, ServerProfile};
use error::DashError;
use luci::{Credentials, HttpTransport, LuciClient, RpcTransport, RuleListFetcher};
use openclash::{Rule, RuleDraft, RuleEdit, RuleType, RulesDocument};

#[derive(Parser)]
#[command(name = "clashdash")]
#[command(version)]
#[command(about = "Manage OpenClash custom rules and Clash controllers on OpenWRT routers", long_about = None)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Saved server to use instead of the default one
    #[arg(long, global = true)]
    server: Option<String>,

    /// Increase log output (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage saved servers
    Server {
        #[command(subcommand)]
        action: ServerCommand,
    },
    /// Test the controller and router connections of a server
    Check,
    /// Manage OpenClash custom rules on the router
    Rules {
        #[command(subcommand)]
        action: RulesCommand,
    },
}

#[derive(Subcommand)]
enum ServerCommand {
    /// Save a new server
    Add(AddServerArgs),
    /// List saved servers
    List,
    /// Delete a saved server
    Remove { name: String },
    /// Make a server the default
    Default { name: String },
}

#[derive(Args)]
struct AddServerArgs {
    /// Display name (defaults to the controller address)
    #[arg(long, default_value = "")]
    name: String,

    /// External controller address
    #[arg(long)]
    host: String,

    /// External controller port
    #[arg(long)]
    port: u16,

    /// External controller secret
    #[arg(long)]
    secret: Option<String>,

    /// Controller uses HTTPS
    #[arg(long)]
    tls: bool,

    /// OpenWRT address (defaults to the controller address)
    #[arg(long)]
    openwrt_host: Option<String>,

    /// LuCI web port
    #[arg(long, default_value_t = 80)]
    openwrt_port: u16,

    /// LuCI username
    #[arg(long)]
    username: Option<String>,

    /// LuCI password
    #[arg(long)]
    password: Option<String>,

    /// LuCI uses HTTPS
    #[arg(long)]
    openwrt_tls: bool,

    /// Proxy manager installed on the router (openclash, nikki)
    #[arg(long, default_value = "openclash", value_parser = parse_package)]
    package: LuciPackage,

    /// Save without testing the LuCI login
    #[arg(long)]
    no_verify: bool,
}

#[derive(Subcommand)]
enum RulesCommand {
    /// Print the custom rules
    List {
        /// Only show enabled rules
        #[arg(long)]
        enabled: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print the rule types that can be used with `add`
    Types,
    #[command(flatten)]
    Change(RuleChange),
}

#[derive(Subcommand)]
enum RuleChange {
    /// Append a rule
    Add(RuleArgs),
    /// Change fields of a rule
    Edit {
        /// Rule number as shown by `rules list`
        index: usize,

        #[command(flatten)]
        fields: EditArgs,
    },
    /// Enable or disable a rule
    Toggle { index: usize },
    /// Delete a rule
    Remove { index: usize },
}

#[derive(Args)]
struct RuleArgs {
    /// Rule type, see `rules types`
    #[arg(long = "type", value_parser = parse_rule_type)]
    rule_type: RuleType,

    /// Match value, e.g. a domain or CIDR
    #[arg(long)]
    target: String,

    /// Policy, e.g. DIRECT, REJECT or a proxy group name
    #[arg(long)]
    action: String,

    /// Optional note
    #[arg(long, default_value = "")]
    comment: String,
}

#[derive(Args)]
struct EditArgs {
    #[arg(long = "type", value_parser = parse_rule_type)]
    rule_type: Option<RuleType>,

    #[arg(long)]
    target: Option<String>,

    #[arg(long)]
    action: Option<String>,

    /// New note; pass an empty string to clear it
    #[arg(long)]
    comment: Option<String>,
}

impl From<EditArgs> for RuleEdit {
    fn from(args: EditArgs) -> Self {
        RuleEdit {
            match_type: args.rule_type,
            target: args.target,
            action: args.action,
            comment: args.comment,
        }
    }
}

fn parse_rule_type(s: &str) -> Result<RuleType, String> {
    RuleType::from_str(s).ok_or_else(|| {
        let names: Vec<&str> = RuleType::all().iter().map(|t| t.as_str()).collect();
        format!("unknown rule type '{}', expected one of: {}", s, names.join(", "))
    })
}

fn parse_package(s: &str) -> Result<LuciPackage, String> {
    LuciPackage::from_str(s).ok_or_else(|| format!("unknown package '{}'", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => AppConfig::default_path()?,
    };
    let mut config = AppConfig::load_from(&config_path)?;

    let timeout = config.request_timeout();

    match cli.command {
        Command::Server { action } => {
            run_server_command(action, &mut config, timeout).await?;
            config.save_to(&config_path)?;
            Ok(())
        }
        Command::Check => {
            let server = config.find_server(cli.server.as_deref())?;
            check_server(server, timeout).await
        }
        Command::Rules { action } => match action {
            RulesCommand::Types => {
                print_rule_types();
                Ok(())
            }
            RulesCommand::List { enabled, json } => {
                let server = config.find_server(cli.server.as_deref())?;
                let store = rule_store(server, timeout)?;
                let document = load_rules(&store, server).await?;
                print_rules(&document, enabled, json)
            }
            RulesCommand::Change(change) => {
                let server = config.find_server(cli.server.as_deref())?;
                change_rules(change, server, timeout).await
            }
        },
    }
}

async fn run_server_command(
    action: ServerCommand,
    config: &mut AppConfig,
    timeout: Duration,
) -> Result<()> {
    match action {
        ServerCommand::Add(args) => {
            let verify = !args.no_verify;
            let server = server_from_args(args);
            server.validate()?;

            let verifier = match &server.openwrt {
                Some(openwrt) => {
                    if is_hostname(&openwrt.host) && !openwrt.use_tls {
                        log::warn!(
                            "{} is a hostname; enable --openwrt-tls if the router is reached over the internet",
                            openwrt.host
                        );
                    }
                    if verify {
                        Some(rule_fetcher(&server, timeout)?)
                    } else {
                        log::warn!("Saving {} without testing the LuCI login", server.name);
                        None
                    }
                }
                None => None,
            };

            let name = server.name.clone();
            add_server(config, server, verifier).await?;
            println!("✓ Added server {}", name);
        }
        ServerCommand::List => {
            if config.servers.is_empty() {
                println!("No servers configured");
            }
            for server in &config.servers {
                let marker = if config.default_server.as_deref() == Some(server.name.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!("{} {}  {}", marker, server.name, server.controller_url());
                if let Some(openwrt) = &server.openwrt {
                    println!(
                        "    {} via LuCI at {}:{} as {}",
                        openwrt.package.name(),
                        openwrt.host,
                        openwrt.port,
                        openwrt.username
                    );
                }
            }
        }
        ServerCommand::Remove { name } => {
            config.remove_server(&name)?;
            println!("✓ Removed server {}", name);
        }
        ServerCommand::Default { name } => {
            config.set_default(&name)?;
            println!("✓ {} is now the default server", name);
        }
    }
    Ok(())
}

fn server_from_args(args: AddServerArgs) -> ServerProfile {
    let wants_openwrt =
        args.openwrt_host.is_some() || args.username.is_some() || args.password.is_some();

    let openwrt = wants_openwrt.then(|| OpenWrtAccess {
        host: args.openwrt_host.clone().unwrap_or_else(|| args.host.clone()),
        port: args.openwrt_port,
        username: args.username.clone().unwrap_or_default(),
        password: args.password.clone().unwrap_or_default(),
        use_tls: args.openwrt_tls,
        package: args.package,
    });

    ServerProfile {
        name: args.name,
        host: args.host,
        port: args.port,
        secret: args.secret,
        use_tls: args.tls,
        openwrt,
    }
    .normalized()
}

/// Save a server, refusing routers whose LuCI login fails
async fn add_server<T: RpcTransport>(
    config: &mut AppConfig,
    server: ServerProfile,
    verifier: Option<RuleListFetcher<T>>,
) -> Result<()> {
    if let (Some(fetcher), Some(openwrt)) = (verifier, &server.openwrt) {
        println!("Testing LuCI login at {}:{}...", openwrt.host, openwrt.port);
        fetcher.verify_login().await.with_context(|| {
            format!(
                "Could not log in to {}; pass --no-verify to save the server anyway",
                openwrt.host
            )
        })?;
        println!("✓ Logged in as {}", openwrt.username);
    }

    config.add_server(server)?;
    Ok(())
}

fn rule_fetcher(server: &ServerProfile, timeout: Duration) -> Result<RuleListFetcher<HttpTransport>> {
    let openwrt = server.openwrt()?;
    let base_url = LuciClient::<HttpTransport>::base_url(&openwrt.host, openwrt.port, openwrt.use_tls)?;
    let transport = HttpTransport::new(timeout)?;

    Ok(RuleListFetcher::new(
        LuciClient::new(base_url, transport),
        Credentials {
            username: openwrt.username.clone(),
            password: openwrt.password.clone(),
        },
    ))
}

fn rule_store(server: &ServerProfile, timeout: Duration) -> Result<RuleStore<HttpTransport>> {
    let openwrt = server.openwrt()?;
    if openwrt.package != LuciPackage::OpenClash {
        return Err(DashError::validation(format!(
            "Custom rules are only supported for OpenClash, '{}' uses {}",
            server.name,
            openwrt.package.name()
        ))
        .into());
    }

    Ok(RuleStore::new(rule_fetcher(server, timeout)?))
}

async fn load_rules<T: RpcTransport>(
    store: &RuleStore<T>,
    server: &ServerProfile,
) -> Result<RulesDocument> {
    let mut phases = store.subscribe();
    let refresh = store.refresh();
    tokio::pin!(refresh);

    let outcome = loop {
        tokio::select! {
            outcome = &mut refresh => break outcome,
            Ok(()) = phases.changed() => {
                log::info!("rules: {}", phases.borrow_and_update().as_str());
            }
        }
    };
    if phases.has_changed().unwrap_or(false) {
        log::info!("rules: {}", phases.borrow_and_update().as_str());
    }

    let outcome = outcome.with_context(|| format!("Failed to load rules from {}", server.name))?;
    match outcome {
        RefreshOutcome::Updated(_) => Ok((*store.document().await).clone()),
        RefreshOutcome::AlreadyRunning => anyhow::bail!("A rule refresh is already running"),
    }
}

/// 1-based rule number from the CLI to a document index
fn rule_index(number: usize) -> Result<usize, DashError> {
    number
        .checked_sub(1)
        .ok_or_else(|| DashError::validation("Rule numbers start at 1"))
}

async fn change_rules(change: RuleChange, server: &ServerProfile, timeout: Duration) -> Result<()> {
    let store = rule_store(server, timeout)?;
    let mut document = load_rules(&store, server).await?;

    match change {
        RuleChange::Add(args) => {
            let rule = RuleDraft {
                match_type: args.rule_type,
                target: args.target,
                action: args.action,
                comment: args.comment,
            }
            .into_rule(None)?;
            println!("✓ Added {}", rule);
            document.push(rule);
        }
        RuleChange::Edit { index, fields } => {
            let index = rule_index(index)?;
            let existing = document
                .get(index)
                .ok_or_else(|| DashError::validation(format!("Rule #{} does not exist", index + 1)))?;
            let rule = RuleEdit::from(fields).apply(existing)?;
            println!("✓ Updated #{}: {}", index + 1, rule);
            document.replace(index, rule)?;
        }
        RuleChange::Toggle { index } => {
            let index = rule_index(index)?;
            let enabled = document.toggle(index)?;
            println!(
                "✓ Rule #{} {}",
                index + 1,
                if enabled { "enabled" } else { "disabled" }
            );
        }
        RuleChange::Remove { index } => {
            let removed = document.remove(rule_index(index)?)?;
            println!("✓ Removed {}", removed);
        }
    }

    store
        .commit(document)
        .await
        .with_context(|| format!("Failed to save rules to {}", server.name))?;
    println!("Rules saved to {}. Restart OpenClash to apply them.", store.fetcher().path());
    Ok(())
}

fn print_rule_types() {
    for rule_type in RuleType::all() {
        println!(
            "{:<16} {:<40} e.g. {}",
            rule_type.as_str(),
            rule_type.description(),
            rule_type.example()
        );
    }
}

#[derive(Serialize)]
struct ListedRule<'a> {
    index: usize,
    #[serde(flatten)]
    rule: &'a Rule,
}

fn print_rules(document: &RulesDocument, enabled_only: bool, json: bool) -> Result<()> {
    let listed: Vec<ListedRule> = document
        .rules()
        .enumerate()
        .filter(|(_, rule)| !enabled_only || rule.enabled)
        .map(|(i, rule)| ListedRule { index: i + 1, rule })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&listed)?);
        return Ok(());
    }

    if document.is_empty() {
        println!("No custom rules");
        return Ok(());
    }

    for ListedRule { index, rule } in &listed {
        let state = if rule.enabled { "on " } else { "off" };
        let comment = rule
            .comment
            .as_deref()
            .map(|c| format!("  # {}", c))
            .unwrap_or_default();
        println!(
            "{:>3}  {}  {:<16} {:<32} -> {}{}",
            index, state, rule.match_type, rule.target, rule.action, comment
        );
    }
    println!("\n{} rules", listed.len());
    Ok(())
}

async fn check_server(server: &ServerProfile, timeout: Duration) -> Result<()> {
    use clash::ClashClient;

    let api_url = server.controller_url();
    println!("Testing connection to Clash API at {}...", api_url);

    let client = ClashClient::new(api_url, server.secret.clone(), timeout)?;

    // Test connection
    match client.test_connection().await {
        Ok(version) => println!(
            "✓ Connected successfully! {} {}",
            version.flavour(),
            version.version
        ),
        Err(e) => {
            eprintln!("✗ Connection failed: {:#}", e);
            std::process::exit(1);
        }
    }

    // Get config
    match client.get_config().await {
        Ok(config) => {
            println!("✓ Configuration:");
            println!(
                "  Mode: {}",
                config
                    .mode
                    .as_ref()
                    .map(|mode| mode.as_str().to_string())
                    .unwrap_or_else(|| "Unknown".to_string())
            );
            println!("  Mixed Port: {}", config.mixed_port);
            println!("  Allow LAN: {}", config.allow_lan);
        }
        Err(e) => eprintln!("✗ Failed to get config: {:#}", e),
    }

    // Get rules
    match client.get_rules().await {
        Ok(rules) => {
            println!("✓ Core has {} rules loaded", rules.rules.len());
            for rule in rules.rules.iter().take(5) {
                println!("  - {} {} -> {}", rule.rule_type, rule.payload, rule.proxy);
            }
        }
        Err(e) => eprintln!("✗ Failed to get rules: {:#}", e),
    }

    if let Some(openwrt) = &server.openwrt {
        println!(
            "\nTesting LuCI login at {}:{} ({})...",
            openwrt.host,
            openwrt.port,
            openwrt.package.name()
        );
        match rule_fetcher(server, timeout)?.verify_login().await {
            Ok(()) => println!("✓ Logged in as {}", openwrt.username),
            Err(e) => {
                eprintln!("✗ {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
