//! `keepsync --create-config` and `keepsync --setup`.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use keepsync_core::config::{self, CreateOutcome};
use keepsync_core::setup::{setup_directory_at, GitignoreUpdate, SetupReport};

pub fn create_config(dir: &Path) -> Result<()> {
    match config::create_at(dir).context("failed to create config file")? {
        CreateOutcome::Created(path) => {
            println!(
                "{} Created default configuration file: {}",
                "✓".green(),
                path.display()
            );
        }
        CreateOutcome::AlreadyExists(path) => {
            println!("Configuration file {} already exists!", path.display());
        }
    }
    Ok(())
}

pub fn run(dir: &Path) -> Result<()> {
    println!("Setting up KeePass Git Sync directory...");
    println!("========================================");

    let report = setup_directory_at(dir);
    print_report(&report);
    Ok(())
}

fn print_report(report: &SetupReport) {
    let ok = "✓".green();
    let warn = "⚠".yellow();
    let fail = "✗".red();

    if report.git_repository {
        println!("{ok} Git repository detected");
    } else {
        println!("{warn} Warning: This directory is not a Git repository.");
        println!("  You should run 'git init' and set up your remote repository first.");
        println!("  Example:");
        println!("    git init");
        println!("    git remote add origin <your-passwords-repo-url>");
        println!();
    }

    match &report.config {
        Ok(CreateOutcome::Created(path)) => {
            println!("{ok} Created default configuration file: {}", path.display())
        }
        Ok(CreateOutcome::AlreadyExists(_)) => {
            println!("  (config.json already exists, skipping)")
        }
        Err(err) => println!("{fail} Error creating config file: {err}"),
    }

    match &report.gitignore {
        Ok(GitignoreUpdate::Added(count)) => {
            println!("{ok} Updated .gitignore with {count} new entries")
        }
        Ok(GitignoreUpdate::AlreadyPresent) => {
            println!("{ok} .gitignore already contains necessary entries")
        }
        Err(err) => println!("{fail} Error updating .gitignore: {err}"),
    }

    let db_name = report
        .database
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| report.database.display().to_string());
    if report.database_found {
        println!("{ok} Found KeePass database: {db_name}");
    } else {
        println!("{warn} KeePass database not found: {db_name}");
        println!("  Please copy your KeePass database file to this directory.");
        println!("  Or update the filename in config.json if it has a different name.");
    }

    println!();
    println!(
        "Setup completed: {}/{} steps successful",
        report.steps_succeeded(),
        SetupReport::STEPS
    );

    if report.is_complete() {
        println!("Directory is ready for KeePass Git Sync!");
        println!("\nNext steps:");
        println!("1. Place your KeePass database in this directory");
        println!("2. Run the sync application: keepsync");
        println!("3. The application will automatically sync changes to Git");
    } else {
        println!("{warn} Some setup steps need attention. Please review the messages above.");
    }
}
