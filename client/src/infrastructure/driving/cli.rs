use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use shared::protocol::PortalCredentials;
use tracing::{info, warn};

use crate::application::reports::commands::damage_export::{self, DamageExport};
use crate::application::reports::commands::gst_export::{self, GstExport};
use crate::application::reports::commands::{damage_stats, gst_generate};
use crate::application::session::commands::{login, logout, portal_credentials, whoami};
use crate::domain::Period;
use crate::error::ApiError;
use crate::infrastructure::config::ClientConfig;
use crate::infrastructure::driven::download::save_download;
use crate::infrastructure::AppContext;

#[derive(Debug, Parser)]
#[command(name = "filing", version, about = "GSTR1 and e-invoice back office client")]
pub struct Cli {
    /// Back office base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Where downloads are written
    #[arg(long, global = true)]
    pub download_dir: Option<PathBuf>,

    /// Where captcha images are written
    #[arg(long, global = true)]
    pub image_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in with the given or configured credentials
    Login {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    Whoami,
    Logout,
    /// Portal credentials used by the back office
    Portal {
        #[command(subcommand)]
        action: PortalAction,
    },
    Gst {
        #[command(subcommand)]
        action: GstAction,
    },
    Einvoice {
        #[command(subcommand)]
        action: EinvoiceAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum PortalAction {
    /// List stored logins, or show one with --key/--user
    Get {
        #[arg(long)]
        key: Option<String>,
        #[arg(long)]
        user: Option<String>,
    },
    Set {
        #[arg(long, default_value = "")]
        key: String,
        #[arg(long, default_value = "")]
        user: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum GstAction {
    /// Generate and print the GSTR1 summary
    Generate(PeriodArg),
    /// Download the summary workbook
    Summary(PeriodArg),
    /// Download the portal JSON
    Json(PeriodArg),
}

#[derive(Debug, Subcommand)]
pub enum EinvoiceAction {
    Stats(PeriodArg),
    File(PeriodArg),
    Excel(PeriodArg),
    Pdf(PeriodArg),
}

#[derive(Debug, Clone, Args)]
pub struct PeriodArg {
    /// MMYYYY, defaults to the current month
    #[arg(long, value_parser = parse_period)]
    pub period: Option<Period>,
}

impl PeriodArg {
    fn resolve(&self) -> Period {
        self.period.unwrap_or_else(Period::current)
    }
}

fn parse_period(value: &str) -> Result<Period, String> {
    Period::parse(value)
}

impl Cli {
    pub fn apply_overrides(&self, config: &mut ClientConfig) {
        if let Some(url) = &self.base_url {
            config.api_base_url = url.clone();
        }
        if let Some(dir) = &self.download_dir {
            config.download_dir = dir.clone();
        }
        if let Some(dir) = &self.image_dir {
            config.image_dir = dir.clone();
        }
    }
}

impl Command {
    /// Commands that talk to the back office under an authenticated session
    pub fn needs_session(&self) -> bool {
        !matches!(self, Command::Login { .. } | Command::Logout)
    }
}

/// Logs in with the configured credentials, if there are any
pub async fn ensure_session(ctx: &AppContext) -> Result<(), ApiError> {
    match (&ctx.config.username, &ctx.config.password) {
        (Some(username), Some(password)) => {
            login::execute(ctx.transport.as_ref(), username, password).await?;
            Ok(())
        }
        _ => {
            warn!("no credentials configured, relying on an existing session");
            Ok(())
        }
    }
}

pub async fn run(command: Command, ctx: &AppContext) -> Result<(), ApiError> {
    let transport = ctx.transport.as_ref();

    match command {
        Command::Login { username, password } => {
            let username = username.or_else(|| ctx.config.username.clone());
            let password = password.or_else(|| ctx.config.password.clone());
            let (Some(username), Some(password)) = (username, password) else {
                return Err(ApiError::Precondition("Username and password are required".to_string()));
            };
            let user = login::execute(transport, &username, &password).await?;
            println!("Logged in as {} (#{})", user.username, user.id);
        }
        Command::Whoami => match whoami::execute(transport).await? {
            Some(user) => println!("{} (#{})", user.username, user.id),
            None => println!("Not logged in"),
        },
        Command::Logout => {
            logout::execute(transport).await;
            println!("Logged out");
        }
        Command::Portal {
            action: PortalAction::Get { key, user },
        } => {
            let sessions = portal_credentials::fetch(transport).await?;
            if key.is_none() && user.is_none() {
                println!("{:<12} {:<16} {}", "Key", "User", "Username");
                for (key, users) in &sessions {
                    for entry in users {
                        println!("{:<12} {:<16} {}", key, entry.user, entry.username);
                    }
                }
                return Ok(());
            }
            let credentials = portal_credentials::select(&sessions, key.as_deref(), user.as_deref())
                .ok_or_else(|| ApiError::Precondition("No stored portal login matches".to_string()))?;
            println!("key:      {}", credentials.key);
            println!("user:     {}", credentials.user);
            println!("username: {}", credentials.username);
        }
        Command::Portal {
            action: PortalAction::Set { key, user, username, password },
        } => {
            let credentials = PortalCredentials {
                key,
                user,
                username,
                password,
            };
            portal_credentials::update(transport, &credentials).await?;
            println!("Portal credentials updated");
        }
        Command::Gst { action } => match action {
            GstAction::Generate(arg) => print_gst_summary(ctx, arg.resolve()).await?,
            GstAction::Summary(arg) => download_gst(ctx, arg.resolve(), GstExport::Summary).await?,
            GstAction::Json(arg) => download_gst(ctx, arg.resolve(), GstExport::Json).await?,
        },
        Command::Einvoice { action } => match action {
            EinvoiceAction::Stats(arg) => print_damage_stats(ctx, arg.resolve()).await?,
            EinvoiceAction::File(arg) => download_damage(ctx, arg.resolve(), DamageExport::File).await?,
            EinvoiceAction::Excel(arg) => download_damage(ctx, arg.resolve(), DamageExport::Excel).await?,
            EinvoiceAction::Pdf(arg) => download_damage(ctx, arg.resolve(), DamageExport::Pdf).await?,
        },
    }

    Ok(())
}

async fn print_gst_summary(ctx: &AppContext, period: Period) -> Result<(), ApiError> {
    let rows = gst_generate::execute(&ctx.client, period).await?;
    println!(
        "{:<24} {:<8} {:<12} {:>14} {:>12}",
        "Company", "GST Type", "Invoice Type", "Taxable Value", "CGST"
    );
    for row in rows {
        println!(
            "{:<24} {:<8} {:<12} {:>14} {:>12}",
            row.company,
            row.gst_type,
            row.invoice_type,
            row.taxable_value.to_string(),
            row.cgst.to_string()
        );
    }
    Ok(())
}

async fn download_gst(ctx: &AppContext, period: Period, export: GstExport) -> Result<(), ApiError> {
    let response = gst_export::execute(&ctx.client, period, export).await?;
    let fallback = export.fallback_filename(period);
    let path = save_download(&response, &ctx.config.download_dir, &fallback).await?;
    println!("Saved {}", path.display());
    Ok(())
}

async fn print_damage_stats(ctx: &AppContext, period: Period) -> Result<(), ApiError> {
    let rows = damage_stats::execute(&ctx.client, period).await?;
    println!("{:<24} {:>12} {:>8} {:>10}", "Company", "Amount", "Filed", "Not filed");
    for row in &rows {
        println!(
            "{:<24} {:>12} {:>8} {:>10}",
            row.company, row.amount, row.filed, row.not_filed
        );
    }
    if !damage_stats::can_file(&rows) {
        println!("Everything is filed");
    }
    Ok(())
}

async fn download_damage(ctx: &AppContext, period: Period, export: DamageExport) -> Result<(), ApiError> {
    let response = damage_export::execute(&ctx.client, period, export).await?;
    let fallback = export.fallback_filename(period);
    let path = save_download(&response, &ctx.config.download_dir, &fallback).await?;
    info!(export = ?export, period = %period, "damage export finished");
    println!("Saved {}", path.display());
    Ok(())
}
