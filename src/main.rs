//! CLI entry point and command dispatch for dvhcheck.

mod cmd;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;

#[derive(Parser)]
#[command(name = "dvhcheck")]
#[command(version)]
#[command(about = "DVH constraint scorecard for radiotherapy plan QA", long_about = None)]
struct Cli {
    /// Suppress all non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List loaded protocols and their fractionation schemes
    Protocols,
    /// Show the template ROIs and constraints of a protocol
    Rois {
        /// Protocol name, e.g. TG101
        protocol: String,
        /// Fraction count, e.g. 3
        fx: String,
    },
    /// List plan snapshots found in the inbox
    Plans,
    /// Manage the structure alias registry
    Aliases {
        #[command(subcommand)]
        command: AliasCommands,
    },
    /// Preview ROI matching for a plan without evaluating
    Match {
        /// Plan identifier as shown by `dvhcheck plans`
        plan: String,
        #[arg(long)]
        protocol: String,
        #[arg(long)]
        fx: String,
        /// Resolve unmatched template ROIs interactively
        #[arg(long)]
        interactive: bool,
    },
    /// Evaluate a plan against a protocol's constraints
    Check {
        /// Plan identifier as shown by `dvhcheck plans`
        plan: String,
        #[arg(long)]
        protocol: String,
        #[arg(long)]
        fx: String,
        /// Manual ROI mapping TEMPLATE=PLAN_ROI (repeatable)
        #[arg(long = "override", value_name = "TEMPLATE=ROI")]
        overrides: Vec<String>,
        /// Emit the scorecard as JSON instead of a table
        #[arg(long)]
        json: bool,
        /// Write output to a file instead of stdout
        #[arg(long, value_name = "FILE")]
        output: Option<std::path::PathBuf>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum AliasCommands {
    /// List template ROIs and their aliases
    List,
    /// Register a template ROI, optionally with aliases
    Add {
        template: String,
        aliases: Vec<String>,
    },
    /// Remove a template ROI and its aliases
    Remove { template: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.quiet {
        std::env::set_var("DVHCHECK_QUIET", "1");
    }

    match cli.command {
        Commands::Protocols => cmd::protocols::cmd_protocols(),
        Commands::Rois { protocol, fx } => cmd::protocols::cmd_rois(&protocol, &fx),
        Commands::Plans => cmd::plans::cmd_plans(),
        Commands::Aliases { command } => match command {
            AliasCommands::List => cmd::aliases::cmd_list(),
            AliasCommands::Add { template, aliases } => {
                cmd::aliases::cmd_add(&template, aliases)
            }
            AliasCommands::Remove { template } => cmd::aliases::cmd_remove(&template),
        },
        Commands::Match {
            plan,
            protocol,
            fx,
            interactive,
        } => cmd::roi_match::cmd_match(&plan, &protocol, &fx, interactive),
        Commands::Check {
            plan,
            protocol,
            fx,
            overrides,
            json,
            output,
        } => cmd::check::cmd_check(&plan, &protocol, &fx, &overrides, json, output.as_deref()),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}
