//! Interactive REPL and single-query execution.

use anyhow::Result;
use deskagent_core::{PipelineError, ResponseEnvelope, Supervisor};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const BANNER: &str = r#"
  Deskagent — document QA and action dispatch
  Type a question about the loaded document, or ask for a ticket/meeting.
  Commands: exit, quit
"#;

/// Render a pipeline response for the terminal.
pub fn render_envelope(envelope: &ResponseEnvelope) -> String {
    match envelope {
        ResponseEnvelope::Information { answer, page, .. } => match page {
            Some(page) => format!("{answer}\n  [page {page}]"),
            None => answer.clone(),
        },
        ResponseEnvelope::Action { action } => {
            let json = serde_json::to_string_pretty(action)
                .unwrap_or_else(|_| format!("{action:?}"));
            format!("Action dispatched:\n{json}")
        }
        ResponseEnvelope::InformationAndAction {
            answer,
            page,
            action,
        } => {
            let json = serde_json::to_string_pretty(action)
                .unwrap_or_else(|_| format!("{action:?}"));
            let cited = match page {
                Some(page) => format!("{answer}\n  [page {page}]"),
                None => answer.clone(),
            };
            format!("{cited}\n\nAction dispatched:\n{json}")
        }
    }
}

/// Exit code for a rejected query in single-shot mode.
pub const EXIT_INVALID_QUERY: u8 = 2;

/// Run one query and print the result. Returns the process exit code;
/// the caller owns process termination.
pub async fn run_single_query(supervisor: &Supervisor, query: &str) -> Result<u8> {
    match supervisor.handle(query).await {
        Ok(envelope) => {
            println!("{}", render_envelope(&envelope));
            Ok(0)
        }
        Err(PipelineError::Input { message }) => {
            eprintln!("Invalid query: {message}");
            Ok(EXIT_INVALID_QUERY)
        }
        Err(e) => Err(e.into()),
    }
}

/// Interactive loop: prompt, handle, render, repeat until exit/quit or EOF.
pub async fn run_interactive(supervisor: &Supervisor) -> Result<()> {
    println!("{BANNER}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"deskagent> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break; // EOF
        };
        let input = line.trim();

        match input {
            "" => continue,
            "exit" | "quit" => break,
            query => match supervisor.handle(query).await {
                Ok(envelope) => println!("{}\n", render_envelope(&envelope)),
                Err(PipelineError::Input { message }) => eprintln!("Invalid query: {message}"),
                Err(e) => eprintln!("Error: {e}"),
            },
        }
    }

    println!("Goodbye.");
    Ok(())
}
