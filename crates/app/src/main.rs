use std::fmt;
use std::sync::Arc;

use prep_core::AnalyticsReport;
use prep_core::model::{Coordinate, CourseId};
use remote::{ApiConfig, DEFAULT_BASE_URL, HttpSyncClient, ProgressKind, SyncClient};
use services::{
    Analytics, AnalyticsService, Clock, Destination, Navigator, QuizSession, SessionAction,
    SessionError, SessionLoopService, SessionPhase, Step,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidCourseId { raw: String },
    MissingCourse,
    MissingToken,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidCourseId { raw } => write!(f, "invalid --course value: {raw}"),
            ArgsError::MissingCourse => {
                f.write_str("no course id (use --course or EXAM_COURSE_ID)")
            }
            ArgsError::MissingToken => f.write_str("no auth token (use --token or EXAM_API_TOKEN)"),
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
    eprintln!("  app play      [--api <url>] [--token <token>] [--course <id>] [--kind quiz|test]");
    eprintln!("  app analytics [--api <url>] [--token <token>] [--course <id>] [--kind quiz|test]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --api {DEFAULT_BASE_URL}");
    eprintln!("  --kind quiz");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_API_BASE_URL, EXAM_API_TOKEN, EXAM_COURSE_ID, EXAM_KIND, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Analytics,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" | "resume" => Some(Self::Play),
            "analytics" => Some(Self::Analytics),
            _ => None,
        }
    }
}

struct Args {
    base_url: String,
    token: String,
    course_id: CourseId,
    kind: String,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut base_url =
            std::env::var("EXAM_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let mut token = std::env::var("EXAM_API_TOKEN").ok();
        let mut course = std::env::var("EXAM_COURSE_ID").ok();
        let mut kind = std::env::var("EXAM_KIND").unwrap_or_else(|_| "quiz".into());

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--api" => base_url = require_value(args, "--api")?,
                "--token" => token = Some(require_value(args, "--token")?),
                "--course" => course = Some(require_value(args, "--course")?),
                "--kind" => kind = require_value(args, "--kind")?,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let raw = course.ok_or(ArgsError::MissingCourse)?;
        let course_id = raw
            .parse()
            .map_err(|_| ArgsError::InvalidCourseId { raw: raw.clone() })?;
        let token = token
            .filter(|t| !t.trim().is_empty())
            .ok_or(ArgsError::MissingToken)?;

        Ok(Self {
            base_url,
            token,
            course_id,
            kind,
        })
    }
}

/// Prints where the learner would be taken next.
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, destination: Destination) {
        match destination {
            Destination::Analytics { course } => println!("→ results for course {course}"),
            Destination::CourseHome { course } => println!("→ back to course {course}"),
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Play,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Play,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let parsed = Args::parse(&mut argv.into_iter()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let kind: ProgressKind = parsed.kind.parse()?;
    let config = ApiConfig::new(&parsed.base_url, parsed.token, kind)?;
    debug!(?config, "api configured");
    let client: Arc<dyn SyncClient> = Arc::new(HttpSyncClient::new(config));

    match cmd {
        Command::Play => {
            let service = SessionLoopService::new(Clock::system(), Arc::clone(&client))
                .with_navigator(Arc::new(TerminalNavigator));
            let mut session = service.start_session(parsed.course_id).await?;
            if !session.normalize_report().is_clean() {
                warn!(
                    dropped = session.normalize_report().total_dropped(),
                    "some questions could not be shown"
                );
            }
            play(&service, &mut session).await?;
            if session.phase() == SessionPhase::Completed {
                show_analytics(&AnalyticsService::new(client), parsed.course_id).await?;
            }
            Ok(())
        }
        Command::Analytics => {
            show_analytics(&AnalyticsService::new(client), parsed.course_id).await?;
            Ok(())
        }
    }
}

const HELP: &str = "\
  1-4        select (again to clear)
  enter / c  continue        s  skip
  p          previous        g <chapter> <subtopic> <question>  jump (1-based)
  f          toggle flag     submit / quit  (confirm with y, cancel with n)
  status     completion      h  this help";

async fn play(
    service: &SessionLoopService,
    session: &mut QuizSession,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    if let Some(point) = session.resume_point() {
        let stats = session.stats();
        println!(
            "{}: {}/{} done, resuming at {} ({:?})",
            session.course().name(),
            stats.completed,
            stats.total,
            point.coordinate,
            point.reason
        );
    }
    println!("{HELP}");
    render(session);

    while !session.phase().is_terminal() {
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        let result = match input {
            "" | "c" => service.continue_current(session).await.map(|outcome| {
                if outcome.sync_failed {
                    println!("(answer not saved to the server; it stays here)");
                }
                outcome.step != Step::Completed
            }),
            "s" => service
                .skip_current(session)
                .await
                .map(|outcome| outcome.step != Step::Completed),
            "p" => session.previous().map(|_| true),
            "f" => session.toggle_flag().map(|_| true),
            "submit" => session.request_submit().map(|()| {
                println!("Submit the whole session? [y/n]");
                false
            }),
            "quit" => session.request_quit().map(|()| {
                println!("Quit and discard this attempt? [y/n]");
                false
            }),
            "y" => match session.pending_confirmation() {
                Some(SessionAction::Submit) => service.submit(session).await.map(|()| false),
                Some(SessionAction::Quit) => service.quit(session).await.map(|()| false),
                None => Ok(false),
            },
            "n" => {
                session.cancel_confirmation();
                Ok(true)
            }
            "status" => {
                let stats = session.stats();
                println!(
                    "{}/{} complete ({:.1}%), {} flagged",
                    stats.completed, stats.total, stats.overall_percent, stats.flagged
                );
                Ok(false)
            }
            "h" => {
                println!("{HELP}");
                Ok(false)
            }
            other => handle_other(session, other),
        };

        match result {
            Ok(true) => render(session),
            Ok(false) => {}
            Err(err @ SessionError::SessionAction { .. }) => {
                println!("{err}; nothing changed, try again");
            }
            Err(err) => println!("{err}"),
        }
    }
    Ok(())
}

fn handle_other(session: &mut QuizSession, input: &str) -> Result<bool, SessionError> {
    if let Some(rest) = input.strip_prefix("g ") {
        let parts: Vec<usize> = rest
            .split_whitespace()
            .filter_map(|p| p.parse().ok())
            .collect();
        let at = match parts.as_slice() {
            [c, s, q] if *c > 0 && *s > 0 && *q > 0 => Coordinate::new(c - 1, s - 1, q - 1),
            _ => {
                println!("usage: g <chapter> <subtopic> <question>");
                return Ok(false);
            }
        };
        return session.jump_to(at).map(|_| true);
    }
    match input.parse::<usize>() {
        Ok(n) if n > 0 => session.select_option(n - 1).map(|_| true),
        _ => {
            println!("unknown command; h for help");
            Ok(false)
        }
    }
}

fn render(session: &QuizSession) {
    let (Some(at), Some(question)) = (session.current(), session.current_question()) else {
        return;
    };
    let course = session.course();
    let chapter = &course.chapters()[at.chapter];
    let subtopic = &chapter.subtopics()[at.subtopic];
    let progress = session.progress();

    println!();
    println!(
        "[{}/{}] {} › {}{}",
        progress.position.unwrap_or(0),
        progress.stats.total,
        chapter.name(),
        subtopic.name(),
        if session.flags().get(at) { "  ⚑" } else { "" }
    );
    println!("{}", question.prompt());
    for (i, option) in question.options().iter().enumerate() {
        let marker = if session.selected_option() == Some(i) { '●' } else { '○' };
        println!("  {marker} {}. {option}", i + 1);
    }
}

async fn show_analytics(
    service: &AnalyticsService,
    course: CourseId,
) -> Result<(), Box<dyn std::error::Error>> {
    match service.latest(course).await? {
        Analytics::NotSubmitted => println!("No submitted attempt yet."),
        Analytics::Submitted(report) => print_report(&report),
    }
    Ok(())
}

fn print_report(report: &AnalyticsReport) {
    let overall = &report.overall;
    println!(
        "Correct {} · Incorrect {} · Skipped {} · Flagged {} · Accuracy {:.1}%",
        overall.correct,
        overall.incorrect,
        overall.skipped,
        overall.flagged,
        overall.accuracy_percent()
    );
    for chapter in &report.chapters {
        let b = &chapter.breakdown;
        println!(
            "  {:<24} {}/{} correct, {} skipped",
            chapter.name, b.correct, b.total, b.skipped
        );
    }
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
