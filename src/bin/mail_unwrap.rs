use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;

use mail_unwrap::auth::{token_manager::TokenManager, token_store};
use mail_unwrap::config::{AuthMethod, Config, load_config, load_config_or_default};
use mail_unwrap::extract::extract;
use mail_unwrap::mail::eml_dir;
use mail_unwrap::mail::imap_client::{Credentials, FolderSelection, ImapClient};
use mail_unwrap::mail::raw::RawMessage;
use mail_unwrap::mail::safelinks::unwrap_links;
use mail_unwrap::output;
use mail_unwrap::survey::collect_surveys;

/// Where `surveys` writes when no `--output` is given.
const DEFAULT_SURVEYS_OUTPUT: &str = "surveys_clean.json";
/// Surveys shown by `surveys --dry-run`.
const SURVEY_PREVIEW: usize = 5;

#[derive(Parser)]
#[command(name = "mail_unwrap")]
#[command(about = "Export a sender's mail with Outlook Safe Links unwrapped", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the mail store and write the sender's messages as JSON
    Export {
        /// Exact sender address (overrides `sender` in config)
        #[arg(long)]
        sender: Option<String>,

        /// IMAP folder to scan; repeatable (overrides `folders` in config)
        #[arg(long = "folder")]
        folders: Vec<String>,

        /// Scan every selectable IMAP folder
        #[arg(long, conflicts_with = "folders")]
        all_folders: bool,

        /// Read .eml files from this directory instead of IMAP
        #[arg(long)]
        eml_dir: Option<PathBuf>,

        /// Descend into subdirectories of --eml-dir
        #[arg(long, requires = "eml_dir")]
        recursive: bool,

        /// Output file (overrides `output_path` in config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print a preview instead of writing the file
        #[arg(long)]
        dry_run: bool,
    },

    /// Turn an export of rating notifications into per-ticket surveys
    Surveys {
        /// Export written by `export`
        #[arg(long)]
        input: PathBuf,

        #[arg(long, default_value = DEFAULT_SURVEYS_OUTPUT)]
        output: PathBuf,

        /// Print a preview instead of writing the file
        #[arg(long)]
        dry_run: bool,
    },

    /// Unwrap Safe Links in text read from stdin
    Unwrap,

    /// Store the OAuth client secret in keyring
    SetClientSecret {
        #[arg(long)]
        client_id: String,
    },

    /// Store the IMAP password in keyring (for auth = "password")
    SetPassword {
        #[arg(long)]
        user: String,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::SetClientSecret { client_id } => {
            let secret = read_secret_from_stdin("client secret")?;
            token_store::save_client_secret(&client_id, &secret)?;
            println!("Saved client secret for client_id {}", client_id);
            Ok(())
        }

        Command::SetPassword { user } => {
            let password = read_secret_from_stdin("IMAP password")?;
            token_store::save_imap_password(&user, &password)?;
            println!("Saved IMAP password for {}", user);
            Ok(())
        }

        Command::Surveys {
            input,
            output,
            dry_run,
        } => {
            let records = output::read_json(&input)?;
            let report = collect_surveys(&records);

            if dry_run {
                for s in report.surveys.iter().take(SURVEY_PREVIEW) {
                    println!("Ticket #{}", s.ticket_number);
                    println!("  {}", s.summary);
                    println!("  Feedback: {}", s.customer_feedback);
                }
                if report.surveys.len() > SURVEY_PREVIEW {
                    println!("... and {} more surveys", report.surveys.len() - SURVEY_PREVIEW);
                }
                println!("(dry run, nothing written)");
            } else {
                output::write_json(&output, &report.surveys)?;
                println!("Wrote {}", output.display());
            }
            println!(
                "Records scanned: {}, surveys: {}, skipped: {}",
                records.len(),
                report.surveys.len(),
                report.skipped
            );
            Ok(())
        }

        Command::Unwrap => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            print!("{}", unwrap_links(&text));
            Ok(())
        }

        Command::Export {
            sender,
            folders,
            all_folders,
            eml_dir,
            recursive,
            output,
            dry_run,
        } => {
            let cfg = if eml_dir.is_some() {
                load_config_or_default()?
            } else {
                load_config().map_err(|e| anyhow!("Configuration error: {e}"))?
            };

            let sender = sender
                .or_else(|| cfg.sender.clone())
                .ok_or_else(|| anyhow!("no sender given: pass --sender or set `sender` in config"))?;

            let messages = match eml_dir {
                Some(dir) => eml_dir::load_dir(&dir, recursive)?,
                None => {
                    let selection = if all_folders {
                        FolderSelection::All
                    } else if !folders.is_empty() {
                        FolderSelection::Named(folders)
                    } else {
                        FolderSelection::Named(cfg.folders())
                    };
                    fetch_imap(&cfg, &selection, &sender)?
                }
            };

            let ex = extract(&messages, &sender);

            if dry_run {
                println!("{}", output::preview_json(&ex.records)?);
                println!("(dry run, nothing written)");
            } else {
                let path = output.unwrap_or_else(|| cfg.output_path());
                output::write_json(&path, &ex.records)?;
                println!("Wrote {}", path.display());
            }
            println!("Processed: {}, skipped (errors): {}", ex.processed, ex.skipped);
            Ok(())
        }
    }
}

fn fetch_imap(cfg: &Config, folders: &FolderSelection, sender: &str) -> Result<Vec<RawMessage>> {
    let user_email = cfg
        .user_email
        .clone()
        .ok_or_else(|| anyhow!("user_email not set in config"))?;

    let creds = match cfg.auth {
        AuthMethod::OAuth => {
            Credentials::AccessToken(TokenManager::from_config(cfg)?.get_access_token()?)
        }
        AuthMethod::Password => Credentials::Password(
            token_store::load_imap_password(&user_email)?.ok_or_else(|| {
                anyhow!("no IMAP password: run `set-password --user {user_email}` or set MAIL_UNWRAP_PASSWORD")
            })?,
        ),
    };

    let imap = ImapClient::new(cfg.imap_server(), cfg.imap_port(), user_email);
    imap.fetch_from_sender(&creds, folders, sender)
}

fn read_secret_from_stdin(what: &str) -> Result<String> {
    eprintln!("Paste {what} (end with Ctrl-D):");
    let mut secret = String::new();
    std::io::stdin().read_to_string(&mut secret)?;
    Ok(secret.trim().to_string())
}
