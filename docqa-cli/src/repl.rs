//! Interactive chat loop.

use docqa_rag::{ConversationSession, QueryOutcome, RejectReason, Role, Turn};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::warn;

const PROMPT: &str = "you> ";

/// What a line of input asks the loop to do.
#[derive(Debug, PartialEq, Eq)]
pub enum ReplCommand<'a> {
    /// Ask the session a question.
    Ask(&'a str),
    /// Print the conversation so far.
    History,
    /// Forget the conversation.
    Reset,
    /// Show the available commands.
    Help,
    /// Leave.
    Quit,
}

impl<'a> ReplCommand<'a> {
    /// Interpret one line of input.
    pub fn parse(line: &'a str) -> Self {
        match line.trim() {
            ":q" | ":quit" | "exit" | "quit" => ReplCommand::Quit,
            ":history" => ReplCommand::History,
            ":reset" => ReplCommand::Reset,
            ":help" => ReplCommand::Help,
            _ => ReplCommand::Ask(line),
        }
    }
}

/// Text shown for a query outcome, or `None` when nothing should be printed.
pub fn render_outcome(outcome: &QueryOutcome) -> Option<String> {
    match outcome {
        QueryOutcome::Answered(turn) => Some(turn.content.clone()),
        QueryOutcome::Rejected(RejectReason::Duplicate) => Some("(same question as before, skipped)".into()),
        QueryOutcome::Rejected(RejectReason::NotReady) => Some("(no document loaded)".into()),
        QueryOutcome::Rejected(RejectReason::Empty) => None,
    }
}

/// Format the whole history for display.
pub fn render_history(history: &[Turn]) -> String {
    history
        .iter()
        .map(|turn| {
            let speaker = match (turn.role, turn.failed) {
                (Role::User, _) => "you",
                (Role::Assistant, false) => "docqa",
                (Role::Assistant, true) => "error",
            };
            format!("[{}] {speaker}: {}", turn.timestamp.format("%H:%M:%S"), turn.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Read questions until EOF, Ctrl-C or `:quit`.
pub async fn run(session: &mut ConversationSession) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;
    println!("Ask a question about the document. Type :help for commands.");

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let _ = editor.add_history_entry(line.as_str());

        match ReplCommand::parse(&line) {
            ReplCommand::Quit => break,
            ReplCommand::Help => println!(":history  show the conversation\n:reset    forget it\n:quit     leave"),
            ReplCommand::History => println!("{}", render_history(session.history())),
            ReplCommand::Reset => {
                session.reset();
                println!("(conversation cleared)");
            }
            ReplCommand::Ask(question) => match session.submit_query(question).await {
                Ok(outcome) => {
                    if let Some(text) = render_outcome(&outcome) {
                        println!("{text}\n");
                    }
                }
                Err(e) => {
                    warn!(recoverable = e.is_recoverable(), "question failed");
                    eprintln!("Error: {e}\n");
                }
            },
        }
    }
    Ok(())
}
