use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use quizsmith::clients::FlexibleClient;
use quizsmith::core::QueryResolver;
use quizsmith::error::SessionError;
use quizsmith::interceptors::FileInterceptor;
use quizsmith::quiz::{
    Difficulty, DocumentSet, FinishReason, QuestionType, QuizConfig, QuizResult, QuizService, QuizSession,
    RandomShuffler, SessionEvent, SessionRunner, Transition, TutorQuery, TypeSelection,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DifficultyArg {
    Easy,
    Medium,
    Hard,
}

impl From<DifficultyArg> for Difficulty {
    fn from(arg: DifficultyArg) -> Self {
        match arg {
            DifficultyArg::Easy => Difficulty::Easy,
            DifficultyArg::Medium => Difficulty::Medium,
            DifficultyArg::Hard => Difficulty::Hard,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TypeArg {
    MultipleChoice,
    TrueFalse,
    FillInBlank,
    ShortAnswer,
    Matching,
    Sequencing,
}

impl From<TypeArg> for QuestionType {
    fn from(arg: TypeArg) -> Self {
        match arg {
            TypeArg::MultipleChoice => QuestionType::MultipleChoice,
            TypeArg::TrueFalse => QuestionType::TrueFalse,
            TypeArg::FillInBlank => QuestionType::FillInBlank,
            TypeArg::ShortAnswer => QuestionType::ShortAnswer,
            TypeArg::Matching => QuestionType::Matching,
            TypeArg::Sequencing => QuestionType::Sequencing,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Turn lesson documents into an AI-generated, AI-graded knowledge check", long_about = None)]
#[command(after_help = "ENVIRONMENT VARIABLES:
    ANTHROPIC_API_KEY  API key for Claude (read from .env as well)
    QUIZSMITH_MODEL    Override the Claude model id
    RUST_LOG           Log filter [default: warn]

DURING THE QUIZ:
    <text>             Answer a fill-in-blank or short-answer question
    /pick N            Choose option N
    /up N, /down N     Move sequencing item N
    /match L R         Pair left item L with right choice R
    /next, /prev       Move between questions (/next on the last question submits)")]
struct Args {
    /// Lesson documents: PDF, JPEG, PNG or WebP, up to 10 MB each
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Number of questions (1-100)
    #[arg(short = 'n', long, default_value_t = 10)]
    count: u32,

    #[arg(short, long, value_enum, default_value_t = DifficultyArg::Medium)]
    difficulty: DifficultyArg,

    /// Allowed question types; the model picks suitable types when omitted
    #[arg(short = 't', long = "type", value_enum)]
    types: Vec<TypeArg>,

    /// Free-form style instructions for the question writer
    #[arg(short, long, default_value = "")]
    instructions: String,

    /// Time limit in minutes; 0 disables the countdown
    #[arg(short, long, default_value_t = 0)]
    minutes: u32,

    /// Seed for option and sequencing shuffles
    #[arg(long)]
    seed: Option<u64>,

    /// Save every prompt/response pair as Markdown in this directory
    #[arg(long)]
    transcripts: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut documents = DocumentSet::new();
    let report = documents.add_paths(&args.files).await;
    for rejection in &report.rejected {
        eprintln!("{} {}", "skipped:".yellow(), rejection);
    }

    let selection = if args.types.is_empty() {
        TypeSelection::auto_detect()
    } else {
        TypeSelection::explicit(args.types.iter().copied().map(QuestionType::from))
    };
    let config = QuizConfig::new(documents.into_files())
        .with_question_count(args.count)
        .with_difficulty(args.difficulty.into())
        .with_selection(selection)
        .with_instructions(args.instructions.clone())
        .with_time_limit(args.minutes);
    config.validate().context("invalid quiz configuration")?;

    let client = FlexibleClient::claude_from_env().context("cannot create the Claude client")?;
    let mut resolver = QueryResolver::new(client);
    if let Some(dir) = &args.transcripts {
        resolver = resolver.with_interceptor(Arc::new(FileInterceptor::new(dir.clone())));
    }
    let service = QuizService::new(resolver);

    let (mut generation_shuffler, session_shuffler) = match args.seed {
        Some(seed) => (RandomShuffler::seeded(seed), RandomShuffler::seeded(seed.wrapping_add(1))),
        None => (RandomShuffler::from_entropy(), RandomShuffler::from_entropy()),
    };

    println!("Generating {} questions from {} document(s)...", config.question_count, config.files.len());
    let questions = service
        .generate(&config, &mut generation_shuffler)
        .await
        .context("question generation failed")?;

    let session = QuizSession::new(questions, config.time_limit_minutes, Box::new(session_shuffler))?;
    let questions = session.questions().to_vec();
    let runner = SessionRunner::new(session);

    render(runner.session(), None)?;

    let forward = tokio::spawn(forward_commands(spawn_stdin_reader(), runner.sender()));
    let finalization = runner
        .run(|session, outcome| {
            let drawn = match outcome {
                Ok(Transition::Ticked { remaining }) => print_countdown(*remaining),
                Ok(Transition::Finalized(_)) => Ok(()),
                Ok(_) => render(session, None),
                Err(e) => render(session, Some(e)),
            };
            if let Err(e) = drawn {
                warn!(error = %e, "Failed to draw the quiz screen");
            }
        })
        .await?;
    let mut lines = forward.await.context("input task failed")?;

    if finalization.reason == FinishReason::TimedOut {
        println!("\n{}", "Time is up! Your answers were submitted.".red().bold());
    }
    println!("Grading {} answers...", finalization.answers.len());
    let result = service
        .grade(&questions, finalization.answers)
        .await
        .context("grading failed")?;
    info!(percentage = result.percentage(), "Quiz finished");

    print_report(&result);
    tutor_loop(&service, &result, &mut lines).await;
    Ok(())
}

fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Turn typed lines into session events until the session stops listening.
async fn forward_commands(
    mut lines: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<SessionEvent>,
) -> mpsc::UnboundedReceiver<String> {
    loop {
        tokio::select! {
            _ = events.closed() => break,
            line = lines.recv() => {
                let Some(line) = line else { break };
                match parse_command(&line) {
                    Ok(event) => {
                        if events.send(event).is_err() {
                            break;
                        }
                    }
                    Err(message) => eprintln!("{}", message.yellow()),
                }
            }
        }
    }
    lines
}

fn one_based(arg: &str) -> Result<usize, String> {
    match arg.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(format!("'{arg}' is not a position (use 1, 2, 3...)")),
    }
}

fn parse_command(line: &str) -> Result<SessionEvent, String> {
    let trimmed = line.trim();
    if !trimmed.starts_with('/') {
        return Ok(SessionEvent::Answer(trimmed.to_string()));
    }

    let mut words = trimmed.split_whitespace();
    let command = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();
    match (command, args.as_slice()) {
        ("/next", []) => Ok(SessionEvent::Next),
        ("/prev", []) => Ok(SessionEvent::Previous),
        ("/pick", [n]) => Ok(SessionEvent::Pick(one_based(n)?)),
        ("/up", [n]) => Ok(SessionEvent::MoveUp(one_based(n)?)),
        ("/down", [n]) => Ok(SessionEvent::MoveDown(one_based(n)?)),
        ("/match", [l, r]) => Ok(SessionEvent::MatchAt { left: one_based(l)?, right: one_based(r)? }),
        _ => Err(format!("unknown command '{trimmed}'")),
    }
}

fn render(session: &QuizSession, notice: Option<&SessionError>) -> io::Result<()> {
    let mut out = io::stdout();
    execute!(out, Clear(ClearType::All), MoveTo(0, 0))?;
    let Some(view) = session.view() else { return Ok(()) };

    let mut header = format!("Question {}/{}  [{}]", view.index + 1, view.total, view.question.question_type.label());
    if let Some(remaining) = view.remaining_seconds {
        header.push_str(&format!("  {:02}:{:02} left", remaining / 60, remaining % 60));
    }
    writeln!(out, "{}\n", header.cyan().bold())?;
    writeln!(out, "{}\n", view.question.text)?;

    match view.question.question_type {
        QuestionType::MultipleChoice | QuestionType::TrueFalse => {
            for (i, choice) in view.choices.iter().enumerate() {
                let marker = if view.answer == Some(choice.as_str()) { ">" } else { " " };
                writeln!(out, "{} {}. {}", marker.green(), i + 1, choice)?;
            }
        }
        QuestionType::Sequencing => {
            for (i, item) in view.sequence.unwrap_or_default().iter().enumerate() {
                writeln!(out, "  {}. {}", i + 1, item)?;
            }
        }
        QuestionType::Matching => {
            let selections = view.selections.unwrap_or_default();
            for (i, left) in view.question.left_items().iter().enumerate() {
                let chosen = selections.iter().find(|(l, _)| l == left).map(|(_, r)| r.as_str()).unwrap_or("?");
                writeln!(out, "  {}. {} -> {}", i + 1, left, chosen.green())?;
            }
            writeln!(out, "\n  Choices:")?;
            for (i, right) in view.right_choices.iter().enumerate() {
                writeln!(out, "  {}. {}", i + 1, right)?;
            }
        }
        QuestionType::FillInBlank | QuestionType::ShortAnswer => {
            writeln!(out, "Your answer: {}", view.answer.unwrap_or("").green())?;
        }
    }

    if let Some(error) = notice {
        writeln!(out, "\n{}", error.to_string().yellow())?;
    }
    let submit = if view.index + 1 == view.total { "/next submits" } else { "/next, /prev" };
    writeln!(out, "\n{}", submit.dark_grey())?;
    out.flush()
}

fn print_countdown(remaining: u64) -> io::Result<()> {
    if remaining % 60 == 0 || remaining <= 10 {
        let mut out = io::stdout();
        writeln!(out, "{}", format!("{:02}:{:02} left", remaining / 60, remaining % 60).red())?;
        out.flush()?;
    }
    Ok(())
}

fn print_report(result: &QuizResult) {
    let percentage = result.percentage();
    let headline = format!("Score: {} / {} ({}%)", result.total_score(), result.max_score(), percentage);
    let headline = match percentage {
        80.. => headline.green(),
        50..=79 => headline.yellow(),
        _ => headline.red(),
    };
    println!("\n{}\n", headline.bold());

    for (i, graded) in result.graded().iter().enumerate() {
        let mark = if graded.is_correct {
            "correct".green()
        } else if graded.is_partial() {
            "partial".yellow()
        } else {
            "incorrect".red()
        };
        println!("{}. [{}] {}", i + 1, mark, graded.question.text);
        let answer = if graded.user_answer.is_empty() { "(no answer)" } else { graded.user_answer.as_str() };
        println!("   Your answer:  {}", answer);
        println!("   Ideal answer: {}", graded.ai_correction);
        println!("   {}\n", graded.explanation.as_str().dark_grey());
    }
    if !result.overall_feedback().is_empty() {
        println!("{}\n", result.overall_feedback());
    }
}

async fn tutor_loop(
    service: &QuizService<FlexibleClient>,
    result: &QuizResult,
    lines: &mut mpsc::UnboundedReceiver<String>,
) {
    println!("Ask the tutor: type a question number and your question, or an empty line to quit.");
    while let Some(line) = lines.recv().await {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        let (number, query) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let graded = number
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| result.graded().get(i));
        let Some(graded) = graded else {
            eprintln!("{}", format!("there is no question {number}").yellow());
            continue;
        };
        let query = match query.trim() {
            "" => "Why is this the right answer?",
            query => query,
        };
        match service.ask_tutor(graded.question.id, TutorQuery::about(graded, query)).await {
            Ok(reply) => println!("\n{}\n", reply),
            Err(e) => eprintln!("{}", e.to_string().yellow()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_an_answer() {
        assert_eq!(parse_command("  mitochondria \n").unwrap(), SessionEvent::Answer("mitochondria".into()));
    }

    #[test]
    fn positions_are_one_based() {
        assert_eq!(parse_command("/pick 1").unwrap(), SessionEvent::Pick(0));
        assert_eq!(parse_command("/down 3").unwrap(), SessionEvent::MoveDown(2));
        assert!(parse_command("/up 0").is_err());
        assert!(parse_command("/pick").is_err());
    }

    #[test]
    fn match_sends_zero_based_positions() {
        assert_eq!(parse_command("/match 2 1").unwrap(), SessionEvent::MatchAt { left: 1, right: 0 });
        assert!(parse_command("/match 0 1").is_err());
        assert!(parse_command("/match 1").is_err());
    }
}
