//! Subcommand arguments and handlers.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use serde::Serialize;

use quest_core::model::{LessonId, LessonSubmission, ProfileDraft, ProgressRecord, StudySession, Topic};
use quest_core::stats::{ProgressStats, Totals};
use services::{ImportMode, QuestServices};

/// Prints either human-readable lines or pretty JSON.
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce()) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human();
        }
        Ok(())
    }
}

//
// ─── ARGUMENTS ─────────────────────────────────────────────────────────────────
//

#[derive(Args, Debug)]
pub struct LessonArg {
    /// Lesson number (1-120)
    pub lesson: LessonId,
}

#[derive(Args, Debug)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommands,
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Show the stored profile
    Show,
    /// Create or update the profile
    Set {
        #[arg(long)]
        name: Option<String>,
        /// Lessons per day to aim for
        #[arg(long)]
        goal: Option<u32>,
        /// Minutes east of UTC used for day boundaries
        #[arg(long, allow_hyphen_values = true)]
        utc_offset: Option<i32>,
    },
}

#[derive(Args, Debug)]
pub struct CompleteArgs {
    pub lesson: LessonId,
    /// Quiz score in percent
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub score: u8,
    /// Seconds spent on this attempt
    #[arg(long, default_value_t = 0)]
    pub time: u64,
    /// Record the attempt without completing the lesson
    #[arg(long)]
    pub incomplete: bool,
}

#[derive(Args, Debug)]
pub struct ProgressArgs {
    pub lesson: Option<LessonId>,
}

#[derive(Args, Debug)]
pub struct NotesArgs {
    pub lesson: LessonId,
    /// New notes; omit to clear
    pub text: Vec<String>,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Limit output to one topic, e.g. `smart-pointers`
    #[arg(long)]
    pub topic: Option<Topic>,
}

#[derive(Args, Debug)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommands,
}

#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// Start a study session
    Start,
    /// End the open study session
    End,
    /// Show the open session and today's goal
    Status,
    /// List past sessions
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Write to this file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    pub file: PathBuf,
    /// Merge into existing data instead of replacing it
    #[arg(long)]
    pub merge: bool,
}

#[derive(Args, Debug)]
pub struct BackupArgs {
    #[command(subcommand)]
    pub command: BackupCommands,
}

#[derive(Subcommand, Debug)]
pub enum BackupCommands {
    /// Snapshot current data
    Create,
    /// List backups, newest first
    List,
    /// Replace current data with a backup
    Restore { key: String },
    /// Delete a backup
    Delete { key: String },
}

#[derive(Args, Debug)]
pub struct ResetArgs {
    /// Confirm deleting all progress
    #[arg(long)]
    pub yes: bool,
}

//
// ─── HANDLERS ──────────────────────────────────────────────────────────────────
//

pub async fn profile(services: &QuestServices, out: &Output, args: ProfileArgs) -> Result<()> {
    let profile = match args.command {
        ProfileCommands::Show => services.profile().load().await?,
        ProfileCommands::Set {
            name,
            goal,
            utc_offset,
        } => {
            let draft = ProfileDraft {
                name,
                daily_goal_lessons: goal,
                utc_offset_minutes: utc_offset,
            };
            Some(services.profile().save(draft).await?)
        }
    };

    out.emit(&profile, || match &profile {
        Some(p) => {
            println!("Name:        {}", p.name());
            println!("Daily goal:  {} lessons", p.daily_goal_lessons());
            println!("UTC offset:  {} minutes", p.utc_offset_minutes());
            println!("Since:       {}", p.created_at().format("%Y-%m-%d"));
        }
        None => println!("No profile yet. Run `pointer-quest profile set --name <NAME>`."),
    })
}

pub async fn complete(services: &QuestServices, out: &Output, args: CompleteArgs) -> Result<()> {
    let submission = LessonSubmission::new(!args.incomplete, args.score, args.time)?;
    let result = services
        .progress()
        .record_submission(args.lesson, submission)
        .await?;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Completed<'a> {
        record: &'a ProgressRecord,
        newly_unlocked: Vec<&'a str>,
    }
    let report = Completed {
        record: &result.record,
        newly_unlocked: result.newly_unlocked.iter().map(|a| a.id.as_str()).collect(),
    };

    out.emit(&report, || {
        print_record(&result.record);
        for unlocked in &result.newly_unlocked {
            let title = quest_core::model::Achievement::find(&unlocked.id)
                .map_or(unlocked.id.as_str(), |a| a.title);
            println!("Achievement unlocked: {title}");
        }
    })
}

pub async fn progress(services: &QuestServices, out: &Output, args: ProgressArgs) -> Result<()> {
    let records = match args.lesson {
        Some(lesson) => services
            .progress()
            .lesson_progress(lesson)
            .await?
            .into_iter()
            .collect(),
        None => services.progress().all_progress().await?,
    };

    out.emit(&records, || {
        if records.is_empty() {
            println!("No lessons attempted yet.");
        }
        for record in &records {
            print_record(record);
        }
    })
}

pub async fn notes(services: &QuestServices, out: &Output, args: NotesArgs) -> Result<()> {
    let text = args.text.join(" ");
    let notes = (!text.trim().is_empty()).then_some(text);
    let record = services.progress().set_notes(args.lesson, notes).await?;
    out.emit(&record, || print_record(&record))
}

pub async fn reset_lesson(services: &QuestServices, out: &Output, args: LessonArg) -> Result<()> {
    let existed = services.progress().reset_lesson(args.lesson).await?;
    out.emit(&existed, || {
        if existed {
            println!("Lesson {} reset.", args.lesson);
        } else {
            println!("Lesson {} had no progress.", args.lesson);
        }
    })
}

pub async fn stats(services: &QuestServices, out: &Output, args: StatsArgs) -> Result<()> {
    if let Some(topic) = args.topic {
        let topic_stats = services.stats().topic(topic).await?;
        return out.emit(&topic_stats, || {
            println!("{}", topic_stats.topic);
            print_totals(&topic_stats.totals);
        });
    }

    let stats = services.stats().overview().await?;
    out.emit(&stats, || print_overview(&stats))
}

pub async fn achievements(services: &QuestServices, out: &Output) -> Result<()> {
    services.achievements().check().await?;
    let list = services.achievements().list().await?;
    out.emit(&list, || {
        for a in &list {
            let mark = if a.is_unlocked() { "x" } else { " " };
            println!(
                "[{mark}] {:<18} {:>5.1}%  {}",
                a.title,
                a.percent(),
                a.description
            );
        }
    })
}

pub async fn session(services: &QuestServices, out: &Output, args: SessionArgs) -> Result<()> {
    let sessions = services.sessions();
    match args.command {
        SessionCommands::Start => {
            let session = sessions.start().await?;
            out.emit(&session, || println!("Session {} started.", session.id()))
        }
        SessionCommands::End => {
            let session = sessions.end().await?;
            out.emit(&session, || print_session(&session))
        }
        SessionCommands::Status => {
            let current = sessions.current().await?;
            let today = sessions.today_progress().await?;

            #[derive(Serialize)]
            #[serde(rename_all = "camelCase")]
            struct Status<'a> {
                current: Option<&'a StudySession>,
                today: &'a services::TodayProgress,
            }
            let status = Status {
                current: current.as_ref(),
                today: &today,
            };
            out.emit(&status, || {
                match &current {
                    Some(session) => print_session(session),
                    None => println!("No session in progress."),
                }
                println!(
                    "Today ({}): {}/{} lessons{}",
                    today.date,
                    today.completed_today,
                    today.daily_goal,
                    if today.goal_met { ", goal met" } else { "" }
                );
            })
        }
        SessionCommands::History { limit } => {
            let history = sessions.history(limit).await?;
            out.emit(&history, || {
                if history.is_empty() {
                    println!("No sessions yet.");
                }
                for session in &history {
                    print_session(session);
                }
            })
        }
    }
}

pub async fn export(services: &QuestServices, args: ExportArgs) -> Result<()> {
    match args.out {
        Some(path) => {
            services.data().export_to_file(&path).await?;
            eprintln!("Exported to {}", path.display());
        }
        None => println!("{}", services.data().export_json().await?),
    }
    Ok(())
}

pub async fn import(services: &QuestServices, out: &Output, args: ImportArgs) -> Result<()> {
    let mode = if args.merge {
        ImportMode::Merge
    } else {
        ImportMode::Replace
    };
    let report = services.data().import_from_file(&args.file, mode).await?;
    out.emit(&report, || {
        println!(
            "Imported {} lessons, {} achievements, {} sessions.",
            report.lessons, report.achievements, report.sessions
        );
    })
}

pub async fn backup(services: &QuestServices, out: &Output, args: BackupArgs) -> Result<()> {
    let data = services.data();
    match args.command {
        BackupCommands::Create => {
            let key = data.create_backup().await?;
            out.emit(&key, || println!("Backup created: {key}"))
        }
        BackupCommands::List => {
            let backups = data.list_backups().await?;
            let usage = data.storage_usage().await?;

            #[derive(Serialize)]
            struct Listing {
                key: String,
                bytes: u64,
            }
            let listing: Vec<_> = backups
                .iter()
                .map(|b| Listing {
                    key: b.key.clone(),
                    bytes: b.bytes,
                })
                .collect();
            out.emit(&listing, || {
                for b in &backups {
                    println!("{}  {} bytes", b.key, b.bytes);
                }
                println!("{} backups, {} bytes used in total.", usage.backups, usage.bytes);
            })
        }
        BackupCommands::Restore { key } => {
            let safety = data.restore_backup(&key).await?;
            out.emit(&safety, || {
                println!("Restored {key}. Previous data saved as {safety}.");
            })
        }
        BackupCommands::Delete { key } => {
            data.delete_backup(&key).await?;
            out.emit(&key, || println!("Deleted {key}."))
        }
    }
}

pub async fn reset(services: &QuestServices, out: &Output, args: ResetArgs) -> Result<()> {
    if !args.yes {
        bail!("refusing to reset without --yes");
    }
    let key = services.data().reset_all().await?;
    out.emit(&key, || println!("All progress reset. Backup saved as {key}."))
}

//
// ─── PRINTING ──────────────────────────────────────────────────────────────────
//

fn print_record(record: &ProgressRecord) {
    let status = if record.completed() { "done" } else { "open" };
    println!(
        "Lesson {:>3} [{status}] score {:>3}  attempts {}  time {}m  ({})",
        record.lesson_id(),
        record.score().value(),
        record.attempts(),
        record.time_spent_seconds() / 60,
        Topic::for_lesson(record.lesson_id()),
    );
    if let Some(notes) = record.notes() {
        println!("            notes: {notes}");
    }
}

fn print_totals(totals: &Totals) {
    println!(
        "  completed {}/{} ({:.1}%)  average {:.1}  perfect {}",
        totals.completed,
        totals.total_lessons,
        totals.completion_rate,
        totals.average_score,
        totals.perfect_scores
    );
}

fn print_overview(stats: &ProgressStats) {
    println!("Overall");
    print_totals(&stats.overall);
    println!(
        "  time {}m over {} attempts",
        stats.overall.total_time_seconds / 60,
        stats.overall.total_attempts
    );
    println!(
        "Streak: {} days (longest {})",
        stats.streak.current, stats.streak.longest
    );

    println!();
    for topic in &stats.topics {
        println!("{}{}", topic.topic, if topic.is_mastered() { " *" } else { "" });
        print_totals(&topic.totals);
    }

    println!();
    println!("Last {} days", stats.daily_activity.len());
    for day in &stats.daily_activity {
        println!("  {}  {}", day.date, "#".repeat(day.completed as usize));
    }

    if !stats.recent.is_empty() {
        println!();
        println!("Recent");
        for recent in &stats.recent {
            println!(
                "  lesson {:>3}  {:>3}  {}",
                recent.lesson_id,
                recent.score,
                recent.completed_at.format("%Y-%m-%d %H:%M")
            );
        }
    }
}

fn print_session(session: &StudySession) {
    let end = session
        .ended_at()
        .map_or_else(|| "open".to_string(), |at| at.format("%H:%M").to_string());
    println!(
        "{}  {} - {}  {} lessons",
        session.id(),
        session.started_at().format("%Y-%m-%d %H:%M"),
        end,
        session.lessons().len()
    );
}
