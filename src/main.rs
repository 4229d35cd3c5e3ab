mod dataset;
mod error;
mod export;
mod parser;
mod pdf;
mod record;
mod selection;
mod settings;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use dataset::Dataset;
use export::{GoogleCalendar, PendingSelections, Term};
use record::ClassRecord;
use settings::Settings;

#[derive(Parser)]
#[command(name = "schedule_extractor", about = "Timetable PDFs to per-class records and calendars")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every PDF in a directory into the class database
    Build {
        /// Directory of timetable PDFs (default: settings `schedules_dir`)
        #[arg(short, long)]
        dir: Option<PathBuf>,
        /// Output CSV (default: settings `database`)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// List programs and their groups
    Programs {
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Weekly schedule of one group
    Show {
        /// Program label from `programs` (default: any program)
        #[arg(short, long)]
        program: Option<String>,
        #[arg(short, long)]
        group: String,
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Export a group's classes as an .ics file
    Ics {
        /// Program label from `programs` (default: any program)
        #[arg(short, long)]
        program: Option<String>,
        #[arg(short, long)]
        group: String,
        /// 1-based row numbers from `show` (default: all)
        #[arg(long, value_delimiter = ',')]
        pick: Vec<usize>,
        #[arg(short, long, default_value = "schedule.ics")]
        out: PathBuf,
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Stash a selection and print the Google authorization link
    SyncBegin {
        /// Program label from `programs` (default: any program)
        #[arg(short, long)]
        program: Option<String>,
        #[arg(short, long)]
        group: String,
        #[arg(long, value_delimiter = ',')]
        pick: Vec<usize>,
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Finish the Google sign-in and insert the stashed classes
    SyncFinish {
        /// `code` query parameter from the redirect
        #[arg(long)]
        code: String,
        /// `state` query parameter from the redirect
        #[arg(long)]
        state: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = settings::load().context("Failed to load settings")?;

    let result = match cli.command {
        Commands::Build { dir, out } => {
            let dir = dir.unwrap_or_else(|| settings.schedules_dir.clone());
            let out = out.unwrap_or_else(|| settings.database.clone());
            println!("Extracting schedules from {}...", dir.display());

            let outcome = dataset::build_from_directory(&dir, settings.table);
            for (path, reason) in &outcome.skipped {
                println!("  skipped {}: {}", path.display(), reason);
            }
            if outcome.dataset.is_empty() {
                println!("No classes extracted; {} left unchanged.", out.display());
                return Ok(());
            }
            outcome
                .dataset
                .save(&out)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!(
                "Saved {} classes from {} documents ({} skipped) to {}",
                outcome.dataset.len(),
                outcome.parsed,
                outcome.skipped.len(),
                out.display()
            );
            Ok(())
        }
        Commands::Programs { db } => {
            let data = load_db(db.as_deref(), &settings)?;
            let records = data.records();
            let programs = selection::programs(records);
            if programs.is_empty() {
                let groups = selection::groups(records, None);
                println!("{} groups (no program labels): {}", groups.len(), groups.join(", "));
                return Ok(());
            }
            for program in programs {
                let groups = selection::groups(records, Some(program));
                println!("{}  [{}]", selection::display_program_name(program), program);
                println!("    {} groups: {}", groups.len(), groups.join(", "));
            }
            Ok(())
        }
        Commands::Show { program, group, db } => {
            let data = load_db(db.as_deref(), &settings)?;
            let schedule = selection::group_schedule(data.records(), program.as_deref(), &group);
            if schedule.is_empty() {
                println!("No classes found for group {}.", group);
                return Ok(());
            }
            print_schedule(&schedule);
            Ok(())
        }
        Commands::Ics { program, group, pick, out, db } => {
            let data = load_db(db.as_deref(), &settings)?;
            let chosen = choose(&data, program.as_deref(), &group, &pick)?;
            let term = Term::new(&settings.term);
            let ics = export::render_ics(chosen.iter().copied(), &term, chrono::Utc::now());
            std::fs::write(&out, ics).with_context(|| format!("Failed to write {}", out.display()))?;
            println!("Wrote {} classes to {}", chosen.len(), out.display());
            Ok(())
        }
        Commands::SyncBegin { program, group, pick, db } => {
            let data = load_db(db.as_deref(), &settings)?;
            let chosen: Vec<ClassRecord> = choose(&data, program.as_deref(), &group, &pick)?
                .into_iter()
                .cloned()
                .collect();
            let client = export::ClientConfig::load(&settings.google)?;
            let state = export::gcal::new_state();
            let cache = PendingSelections::new(&settings.google.pending_cache);
            cache.stash(&state, &chosen)?;
            let url = client.authorization_url(&settings.google.redirect_uri, &state)?;
            println!(
                "Stashed {} classes under state {} in {}",
                chosen.len(),
                state,
                cache.path().display()
            );
            println!("Open this link to authorize calendar access:\n\n{}\n", url);
            println!("Then run: schedule_extractor sync-finish --code <code> --state {}", state);
            Ok(())
        }
        Commands::SyncFinish { code, state } => {
            let cache = PendingSelections::new(&settings.google.pending_cache);
            let chosen = cache.take(&state)?;
            if chosen.is_empty() {
                bail!("No pending selection for state {} (already synced?)", state);
            }
            let client = export::ClientConfig::load(&settings.google)?;
            let http = reqwest::Client::new();
            let token = client
                .exchange_code(&http, &code, &settings.google.redirect_uri)
                .await
                .context("Authorization code exchange failed")?;

            let term = Term::new(&settings.term);
            let calendar = GoogleCalendar::new(http, &token)?;
            let calendar_id = calendar
                .find_or_create_calendar(&term.calendar_name, &term.timezone)
                .await?;
            let events = export::build_events(&chosen, &term);
            let ids = calendar.insert_all(&calendar_id, &events).await?;
            println!(
                "Synced {} of {} classes to '{}'",
                ids.len(),
                chosen.len(),
                term.calendar_name
            );
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn load_db(path: Option<&Path>, settings: &Settings) -> anyhow::Result<Dataset> {
    let path = path.unwrap_or(settings.database.as_path());
    Dataset::load(path).with_context(|| format!("Failed to load {}. Run 'build' first.", path.display()))
}

fn choose<'a>(
    data: &'a Dataset,
    program: Option<&str>,
    group: &str,
    picks: &[usize],
) -> anyhow::Result<Vec<&'a ClassRecord>> {
    let schedule = selection::group_schedule(data.records(), program, group);
    if schedule.is_empty() {
        bail!("No classes found for group {}", group);
    }
    if picks.is_empty() {
        return Ok(schedule);
    }
    let chosen = selection::pick(&schedule, picks);
    if chosen.is_empty() {
        bail!("None of the picked rows exist (schedule has {} rows)", schedule.len());
    }
    Ok(chosen)
}

fn print_schedule(schedule: &[&ClassRecord]) {
    println!(
        "{:>3} | {:<9} | {:<11} | {:<28} | {:<12} | {:<10} | {:<20}",
        "#", "Day", "Time", "Discipline", "Classroom", "Type", "Lecturer"
    );
    println!("{}", "-".repeat(110));
    for (i, r) in schedule.iter().enumerate() {
        println!(
            "{:>3} | {:<9} | {:<11} | {:<28} | {:<12} | {:<10} | {:<20}",
            i + 1,
            r.day,
            r.time,
            truncate(&r.discipline, 28),
            truncate(&r.classroom, 12),
            truncate(&r.kind, 10),
            truncate(&r.lecturer, 20)
        );
    }
    println!("\n{} classes | pick rows with --pick 1,3,5", schedule.len());
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
