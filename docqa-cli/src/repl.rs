//! Interactive chat loop over a [`Session`].

use std::sync::Arc;

use docqa_rag::{RagPipeline, Session, SourceLocation};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::render;

const HELP: &str = "Commands: /clear, /sources on|off, /history, /help, /quit";

/// One line of user input.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Question(String),
    Clear,
    Sources(bool),
    History,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl Input {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Input::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Input::Question(line.to_string());
        };
        let mut parts = command.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("clear"), None) => Input::Clear,
            (Some("sources"), Some("on")) => Input::Sources(true),
            (Some("sources"), Some("off")) => Input::Sources(false),
            (Some("history"), None) => Input::History,
            (Some("help"), None) => Input::Help,
            (Some("quit" | "exit"), None) => Input::Quit,
            _ => Input::Unknown(line.to_string()),
        }
    }
}

/// Read questions until `/quit` or end of input.
pub async fn run(
    pipeline: Arc<RagPipeline>,
    collection: &str,
    top_k: usize,
    sources: &[SourceLocation],
) -> anyhow::Result<()> {
    let mut session = Session::open(pipeline, collection).await?.with_top_k(top_k);
    if !sources.is_empty() {
        let report = session.ingest(sources).await?;
        print!("{}", render::report(&report));
    }

    let mut editor = DefaultEditor::new()?;
    let mut show_sources = true;
    println!("Chatting with collection '{}'. {HELP}", session.collection());

    loop {
        let line = match editor.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        match Input::parse(&line) {
            Input::Empty => continue,
            Input::Quit => break,
            Input::Help => println!("{HELP}"),
            Input::Clear => {
                session.clear_history();
                println!("History cleared.");
            }
            Input::Sources(on) => {
                show_sources = on;
                println!("Sources {}.", if on { "shown" } else { "hidden" });
            }
            Input::History => {
                if session.history().is_empty() {
                    println!("No questions yet.");
                }
                for (i, exchange) in session.history().iter().enumerate() {
                    println!("{}. {}", i + 1, exchange.question);
                }
            }
            Input::Unknown(command) => println!("Unknown command '{command}'. {HELP}"),
            Input::Question(question) => {
                editor.add_history_entry(question.as_str())?;
                match session.ask(&question).await {
                    Ok(answer) => print!("{}", render::answer(answer, show_sources)),
                    Err(e) => eprintln!("Error ({}): {e}", e.kind()),
                }
            }
        }
    }

    session.close();
    Ok(())
}
