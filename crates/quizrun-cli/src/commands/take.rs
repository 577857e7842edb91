//! The `quizrun take` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use quizrun_client::{create_service, load_config_from, MockQuizService, SAMPLE_QUIZ_ID};
use quizrun_core::clock::IntervalTicks;
use quizrun_core::machine::{Attempt, Review};
use quizrun_core::model::Question;
use quizrun_core::traits::{QuizService, SessionObserver};
use quizrun_core::{Phase, SessionEvent, SessionState, SessionStateMachine, Transition};

/// Console session observer.
struct ConsoleObserver;

impl SessionObserver for ConsoleObserver {
    fn on_tick(&self, remaining_secs: u32) {
        if matches!(remaining_secs, 60 | 30 | 10) {
            println!("  {} remaining", format_clock(remaining_secs));
        }
    }

    fn on_expire(&self) {
        println!("\nTime is up. Submitting your answers...");
    }

    fn on_phase_change(&self, _from: Phase, to: Phase) {
        if to == Phase::Submitting {
            println!("Submitting...");
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Next,
    Previous,
    Jump(usize),
    Answer(usize),
    Clear,
    Finish,
    Solutions,
    Results,
    Retry,
    Show,
    Help,
    Quit,
}

enum Input {
    Tick,
    Line(Option<String>),
}

pub async fn execute(
    quiz_id: Option<String>,
    config_path: Option<PathBuf>,
    base_url: Option<String>,
    demo: bool,
) -> Result<()> {
    let (service, quiz_id): (Arc<dyn QuizService>, String) = if demo {
        let quiz_id = quiz_id.unwrap_or_else(|| SAMPLE_QUIZ_ID.to_string());
        (Arc::new(MockQuizService::sample()), quiz_id)
    } else {
        let mut config = load_config_from(config_path.as_deref())?;
        if let Some(url) = base_url {
            config.base_url = url;
        }
        let quiz_id = quiz_id
            .or_else(|| config.default_quiz.clone())
            .context("no quiz id given and no default_quiz configured")?;
        (create_service(&config)?, quiz_id)
    };

    let mut machine = SessionStateMachine::new(service, Box::new(IntervalTicks::new()))
        .with_observer(Arc::new(ConsoleObserver));

    machine
        .start(&quiz_id)
        .await
        .with_context(|| format!("could not start quiz '{quiz_id}'"))?;
    render(&machine);
    println!("Type `help` for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let input = tokio::select! {
            _ = machine.wait_for_tick() => Input::Tick,
            line = lines.next_line() => Input::Line(line.context("failed to read input")?),
        };

        let line = match input {
            Input::Tick => {
                match machine.tick().await {
                    Ok(Transition::Entered(_)) => render(&machine),
                    Ok(_) => {}
                    Err(e) => report_failure(&machine, &e),
                }
                continue;
            }
            Input::Line(Some(line)) => line,
            Input::Line(None) => {
                debug!("input closed");
                break;
            }
        };

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(msg) => {
                println!("{msg}");
                continue;
            }
        };

        match command {
            Command::Help => print_help(),
            Command::Show => render(&machine),
            Command::Quit => {
                match machine.phase() {
                    Phase::Results | Phase::Solutions => {
                        machine.exit().await?;
                        render(&machine);
                    }
                    Phase::Answering => {
                        warn!(%quiz_id, "attempt abandoned; answers were not submitted");
                        println!("Quiz abandoned; answers were not submitted.");
                    }
                    _ => {}
                }
                break;
            }
            command => {
                let Some(event) = to_event(command, machine.cursor().unwrap_or(0)) else {
                    continue;
                };
                match machine.dispatch(event).await {
                    Ok(Transition::Ignored) => println!("Nothing to do."),
                    Ok(_) => render(&machine),
                    Err(e) => {
                        report_failure(&machine, &e);
                        if machine.phase() == Phase::Idle {
                            return Err(e).context("could not start a new attempt");
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return Ok(Command::Show);
    };
    let number = |arg: Option<&str>, what: &str| -> Result<usize, String> {
        arg.and_then(|a| a.parse::<usize>().ok())
            .filter(|n| *n >= 1)
            .map(|n| n - 1)
            .ok_or_else(|| format!("`{what}` needs a number starting at 1"))
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "n" | "next" => Command::Next,
        "p" | "prev" | "previous" => Command::Previous,
        "j" | "jump" => Command::Jump(number(parts.next(), "jump")?),
        "a" | "answer" => Command::Answer(number(parts.next(), "answer")?),
        "c" | "clear" => Command::Clear,
        "f" | "finish" | "submit" => Command::Finish,
        "s" | "solutions" => Command::Solutions,
        "r" | "results" => Command::Results,
        "retry" => Command::Retry,
        "show" => Command::Show,
        "h" | "help" | "?" => Command::Help,
        "q" | "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command '{other}', type `help` for a list")),
    };
    Ok(command)
}

/// Map a command onto a machine event. Answers apply to the question under the cursor.
fn to_event(command: Command, cursor: usize) -> Option<SessionEvent> {
    let event = match command {
        Command::Next => SessionEvent::Next,
        Command::Previous => SessionEvent::Previous,
        Command::Jump(position) => SessionEvent::JumpTo(position),
        Command::Answer(option) => SessionEvent::SetAnswer {
            position: cursor,
            option,
        },
        Command::Clear => SessionEvent::ClearAnswer { position: cursor },
        Command::Finish => SessionEvent::Finish,
        Command::Solutions => SessionEvent::ViewSolutions,
        Command::Results => SessionEvent::ViewResults,
        Command::Retry => SessionEvent::Retry,
        Command::Show | Command::Help | Command::Quit => return None,
    };
    Some(event)
}

fn report_failure(machine: &SessionStateMachine, error: &quizrun_core::SessionError) {
    warn!(phase = %machine.phase(), "session event failed: {error}");
    println!("{error}");
    if machine.phase() == Phase::Answering {
        println!("Your answers are kept. Type `finish` to try again.");
    }
}

fn print_help() {
    println!("Commands:");
    println!("  next | n            next question");
    println!("  prev | p            previous question");
    println!("  jump N              go to question N");
    println!("  answer K | a K      choose option K for the current question");
    println!("  clear               clear the current answer");
    println!("  finish              submit your answers");
    println!("  solutions | results switch review views after scoring");
    println!("  retry               start a new attempt of the same quiz");
    println!("  show                redraw the current screen");
    println!("  quit | q            leave");
}

fn render(machine: &SessionStateMachine) {
    match machine.state() {
        SessionState::Answering(attempt) => render_question(attempt),
        SessionState::Results(review) => render_results(review),
        SessionState::Solutions(review) => render_solution(review),
        SessionState::Exited => println!("Goodbye."),
        _ => {}
    }
}

fn render_question(attempt: &Attempt) {
    let session = attempt.session();
    let tracker = attempt.tracker();
    let position = tracker.current_position();
    let Some(question) = attempt.current_question() else {
        return;
    };

    println!();
    println!(
        "{}  [{} left]  Question {}/{}  ({} answered)",
        session.title(),
        format_clock(attempt.countdown().remaining()),
        position + 1,
        session.question_count(),
        tracker.answered_count(),
    );
    println!("{}", question.text);
    let selected = tracker.answer(position);
    for (i, option) in question.options.iter().enumerate() {
        let mark = if selected == Some(i) { "*" } else { " " };
        println!("  [{mark}] {}. {option}", i + 1);
    }
}

fn render_results(review: &Review) {
    let result = review.result();
    println!(
        "\nScore: {}% ({}/{} correct)",
        result.rounded_score(),
        result.correct_answers,
        result.total_questions
    );

    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Your answer", "Correct answer", "Result"]);
    for entry in review.solution_entries() {
        table.add_row(vec![
            Cell::new(entry.position + 1),
            Cell::new(&entry.question.text),
            Cell::new(option_label(entry.question, entry.selected)),
            Cell::new(option_label(entry.question, entry.correct)),
            Cell::new(if entry.is_correct { "correct" } else { "wrong" }),
        ]);
    }
    println!("{table}");
    println!("Type `solutions` for explanations, `retry` for a new attempt, or `quit`.");
}

fn render_solution(review: &Review) {
    let entries = review.solution_entries();
    let Some(entry) = entries.get(review.position()) else {
        return;
    };

    println!("\nSolution {}/{}", entry.position + 1, entries.len());
    println!("{}", entry.question.text);
    for (i, option) in entry.question.options.iter().enumerate() {
        let mut tags = Vec::new();
        if entry.correct == Some(i) {
            tags.push("correct");
        }
        if entry.selected == Some(i) {
            tags.push("your answer");
        }
        if tags.is_empty() {
            println!("  {}. {option}", i + 1);
        } else {
            println!("  {}. {option}  <- {}", i + 1, tags.join(", "));
        }
    }
    if entry.selected.is_none() {
        println!("  (not answered)");
    }
    if !entry.explanation().is_empty() {
        println!("Explanation: {}", entry.explanation());
    }
}

fn option_label(question: &Question, option: Option<usize>) -> String {
    match option {
        Some(i) => format!(
            "{}. {}",
            i + 1,
            question.options.get(i).map(String::as_str).unwrap_or("?")
        ),
        None => "-".to_string(),
    }
}

fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
