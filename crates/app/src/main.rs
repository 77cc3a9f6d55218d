use std::fmt;

use services::{AppServices, CohortStats, RecalculateSummary};
use tracing::info;
use tracing_subscriber::EnvFilter;
use ufli_core::model::{GradeLevel, GroupId, StudentId};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidStudentId { raw: String },
    InvalidGroupId { raw: String },
    InvalidGrade { raw: String },
    InvalidDbUrl { raw: String },
    ConflictingTargets,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidStudentId { raw } => write!(f, "invalid --student value: {raw}"),
            ArgsError::InvalidGroupId { raw } => write!(f, "invalid --group value: {raw}"),
            ArgsError::InvalidGrade { raw } => write!(f, "invalid --grade value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::ConflictingTargets => {
                write!(f, "--student, --group, and --grade are mutually exclusive")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- recalc [--db <sqlite_url>] [--student <id> | --group <id> | --grade <g>]");
    eprintln!("  cargo run -p app -- report [--db <sqlite_url>] [--group <id> | --grade <g>]");
    eprintln!();
    eprintln!("recalc with no target recomputes the whole roster;");
    eprintln!("report with no target prints the school-wide rollup.");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:dev.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  UFLI_DB_URL");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Recalc,
    Report,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "recalc" => Some(Self::Recalc),
            "report" => Some(Self::Report),
            _ => None,
        }
    }
}

/// Which slice of the roster a command operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    All,
    Student(StudentId),
    Group(GroupId),
    Grade(GradeLevel),
}

struct Args {
    db_url: String,
    target: Target,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("UFLI_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://dev.sqlite3".into(), normalize_sqlite_url);
        let mut target = Target::All;

        let mut set_target = |t: Target, current: &mut Target| {
            if *current == Target::All {
                *current = t;
                Ok(())
            } else {
                Err(ArgsError::ConflictingTargets)
            }
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--student" => {
                    let value = require_value(args, "--student")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidStudentId { raw: value.clone() })?;
                    set_target(Target::Student(StudentId::new(parsed)), &mut target)?;
                }
                "--group" => {
                    let value = require_value(args, "--group")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidGroupId { raw: value.clone() })?;
                    set_target(Target::Group(GroupId::new(parsed)), &mut target)?;
                }
                "--grade" => {
                    let value = require_value(args, "--grade")?;
                    let parsed = value
                        .parse::<GradeLevel>()
                        .map_err(|_| ArgsError::InvalidGrade { raw: value.clone() })?;
                    set_target(Target::Grade(parsed), &mut target)?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url, target })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" || db_url.contains("mode=memory") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn print_recalc_summary(summary: &RecalculateSummary) {
    println!(
        "recalculated {} students ({} ok, {} failed)",
        summary.processed(),
        summary.succeeded,
        summary.failed
    );
    for (student_id, message) in &summary.errors {
        eprintln!("  student {student_id}: {message}");
    }
}

fn print_stats(label: &str, stats: &CohortStats) {
    let range = match (stats.lowest_current_lesson, stats.highest_current_lesson) {
        (Some(lo), Some(hi)) => format!("lessons {lo}-{hi}"),
        _ => "no passed lessons".to_string(),
    };
    println!(
        "{label}: {} students ({} with progress), avg foundational {:.2}%, avg min-grade {:.2}%, avg benchmark {:.2}%, {range}",
        stats.student_count,
        stats.with_progress,
        stats.avg_foundational_pct,
        stats.avg_min_grade_pct,
        stats.avg_benchmark_pct,
    );
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    argv.remove(0);

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so
    // core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let app = AppServices::connect(&parsed.db_url).await?;
    info!(db = %parsed.db_url, "connected");

    match cmd {
        Command::Recalc => {
            let summary = match parsed.target {
                Target::All => app.progress.recalculate_all().await?,
                Target::Student(id) => {
                    app.progress.recalculate_student(id).await?;
                    println!("recalculated student {id}");
                    return Ok(());
                }
                Target::Group(id) => app.progress.recalculate_group(id).await?,
                Target::Grade(grade) => app.progress.recalculate_grade(grade).await?,
            };
            print_recalc_summary(&summary);
            Ok(())
        }
        Command::Report => match parsed.target {
            Target::Student(_) => {
                eprintln!("report does not take --student; use --group or --grade");
                print_usage();
                Err(ArgsError::ConflictingTargets.into())
            }
            Target::Group(id) => {
                let summary = app.reports.group_summary(id).await?;
                print_stats(
                    &format!("group {} ({})", summary.group.id, summary.group.name),
                    &summary.stats,
                );
                Ok(())
            }
            Target::Grade(grade) => {
                let summary = app.reports.grade_summary(grade).await?;
                print_stats(grade.display_name(), &summary.stats);
                Ok(())
            }
            Target::All => {
                let summary = app.reports.school_summary().await?;
                println!("school-wide: {} active students", summary.total_students);
                for grade in &summary.grades {
                    print_stats(grade.grade.display_name(), &grade.stats);
                }
                Ok(())
            }
        },
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
