use std::fmt;

use chrono::{DateTime, Utc};
use ufli_core::model::{
    GradeLevel, Group, GroupId, LessonNumber, LessonOutcome, LessonStatus, Student, StudentId,
};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    group_id: GroupId,
    group_name: String,
    grade: GradeLevel,
    students: u32,
    lessons: u8,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidGroupId { raw: String },
    InvalidGrade { raw: String },
    InvalidStudents { raw: String },
    InvalidLessons { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidGroupId { raw } => write!(f, "invalid --group-id value: {raw}"),
            ArgsError::InvalidGrade { raw } => write!(f, "invalid --grade value: {raw}"),
            ArgsError::InvalidStudents { raw } => write!(f, "invalid --students value: {raw}"),
            ArgsError::InvalidLessons { raw } => {
                write!(f, "invalid --lessons value (expected 1-128): {raw}")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("UFLI_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut group_id = std::env::var("UFLI_GROUP_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| GroupId::new(1), GroupId::new);
        let mut group_name =
            std::env::var("UFLI_GROUP_NAME").unwrap_or_else(|_| "Morning Group".into());
        let mut grade = std::env::var("UFLI_GRADE")
            .ok()
            .and_then(|value| value.parse::<GradeLevel>().ok())
            .unwrap_or(GradeLevel::KG);
        let mut students = std::env::var("UFLI_STUDENTS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(5);
        let mut lessons = std::env::var("UFLI_LESSONS")
            .ok()
            .and_then(|value| value.parse::<u8>().ok())
            .unwrap_or(20);
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--group-id" => {
                    let value = require_value(&mut args, "--group-id")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidGroupId { raw: value.clone() })?;
                    group_id = GroupId::new(parsed);
                }
                "--group-name" => {
                    let value = require_value(&mut args, "--group-name")?;
                    group_name = value;
                }
                "--grade" => {
                    let value = require_value(&mut args, "--grade")?;
                    grade = value
                        .parse::<GradeLevel>()
                        .map_err(|_| ArgsError::InvalidGrade { raw: value.clone() })?;
                }
                "--students" => {
                    let value = require_value(&mut args, "--students")?;
                    students = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidStudents { raw: value.clone() })?;
                }
                "--lessons" => {
                    let value = require_value(&mut args, "--lessons")?;
                    let parsed = value
                        .parse::<u8>()
                        .map_err(|_| ArgsError::InvalidLessons { raw: value.clone() })?;
                    if LessonNumber::new(parsed).is_err() {
                        return Err(ArgsError::InvalidLessons { raw: value });
                    }
                    lessons = parsed;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            group_id,
            group_name,
            grade,
            students,
            lessons,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --group-id <id>           Group id to upsert (default: 1)");
    eprintln!("  --group-name <name>       Group name (default: Morning Group)");
    eprintln!("  --grade <level>           Grade level, e.g. KG or 2 (default: KG)");
    eprintln!("  --students <n>            Number of students to upsert (default: 5)");
    eprintln!("  --lessons <n>             Lessons marked per student, 1-128 (default: 20)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  UFLI_DB_URL, UFLI_GROUP_ID, UFLI_GROUP_NAME, UFLI_GRADE, UFLI_STUDENTS, UFLI_LESSONS");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let group = Group::new(args.group_id, args.group_name.clone(), args.grade, None, now);
    storage.groups.upsert_group(&group).await?;

    let mut outcome_count: u64 = 0;
    for i in 0..args.students {
        let student_id = StudentId::new(u64::from(i + 1));
        let student = Student::new(
            student_id,
            format!("Student {}", i + 1),
            args.grade,
            Some(group.id),
            now,
        );
        storage.students.upsert_student(&student).await?;

        // Stagger completion so seeded students do not all look identical;
        // every sixth lesson is left at N.
        let completed = args.lessons.saturating_sub((i % 3) as u8);
        for n in 1..=completed {
            let lesson = LessonNumber::new(n)?;
            let status = if n % 6 == 0 {
                LessonStatus::N
            } else {
                LessonStatus::Y
            };
            let outcome = LessonOutcome::new(student_id, lesson, status, now)
                .with_group(group.id);
            storage.outcomes.upsert_outcome(&outcome).await?;
            outcome_count += 1;
        }
    }

    println!(
        "Seeded group {} ({}) with {} students and {} lesson outcomes into {}",
        group.id.value(),
        args.grade.as_str(),
        args.students,
        outcome_count,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
