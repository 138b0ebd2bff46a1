//! Interactive REPL: free text goes to the chat, slash commands drive
//! loading, playback, charts, and export.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use tabletalk_core::Session;

use crate::render;

const HELP: &str = "\
Commands:
  /load <path>     Load a CSV file and analyze it
  /charts          Show the suggested charts for the current analysis
  /history         Show the transcript with message numbers
  /play <n>        Speak assistant message n (from /history)
  /stop            Stop playback
  /export [path]   Write the PDF report (default: tabletalk-report.pdf)
  /help            Show this help
  /quit            Exit

Anything else is sent to the chat.";

/// Run the interactive loop until /quit or EOF.
pub async fn run(mut session: Session) -> anyhow::Result<()> {
    println!("\x1b[1;32mtabletalk\x1b[0m — chat with your CSV");
    if session.table().is_none() {
        println!("No file loaded yet. Start with /load <path>.");
    }
    println!("Type /help for commands, /quit to exit\n");

    let stdin = io::stdin();
    loop {
        print!("\x1b[1;34m> \x1b[0m");
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input).is_err() || input.is_empty() {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(rest) = input.strip_prefix('/') {
            let mut parts = rest.splitn(2, ' ');
            let cmd = parts.next().unwrap_or("");
            let arg = parts.next().map(str::trim).unwrap_or("");

            match cmd {
                "quit" | "exit" | "q" => {
                    session.stop_playback();
                    println!("Goodbye!");
                    break;
                }
                "help" | "?" => println!("{}", HELP),
                "load" => handle_load(&mut session, arg).await,
                "charts" => handle_charts(&session),
                "history" => render::print_transcript(session.transcript()),
                "play" => handle_play(&mut session, arg).await,
                "stop" => session.stop_playback(),
                "export" => handle_export(&session, arg),
                _ => println!("Unknown command: /{}. Try /help.", cmd),
            }
            continue;
        }

        // Plain input is a chat message.
        match session.send_chat(input).await {
            Ok(reply) => {
                let index = session.transcript().len();
                println!("\n\x1b[32mtabletalk:\x1b[0m {}", reply.text);
                println!("\x1b[90m(/play {} to hear this)\x1b[0m\n", index);
            }
            Err(e) => println!("\x1b[31mChat failed:\x1b[0m {}", e),
        }
    }

    Ok(())
}

async fn handle_load(session: &mut Session, arg: &str) {
    if arg.is_empty() {
        println!("Usage: /load <path>");
        return;
    }
    let path = PathBuf::from(arg);
    println!("Loading {}...", path.display());
    if let Err(e) = session.load_file(&path).await {
        println!("\x1b[31mLoad failed:\x1b[0m {}", e);
        return;
    }
    let rows = session.table().map(|t| t.row_count());
    if let Some(analysis) = session.analysis() {
        render::print_analysis(analysis, rows);
    }
}

fn handle_charts(session: &Session) {
    match (session.analysis(), session.table()) {
        (Some(analysis), Some(table)) => render::print_charts(analysis, table),
        _ => println!("No analysis yet. Load a file first with /load <path>."),
    }
}

async fn handle_play(session: &mut Session, arg: &str) {
    let index: usize = match arg.parse() {
        Ok(n) if n >= 1 => n,
        _ => {
            println!("Usage: /play <n>  (message numbers come from /history)");
            return;
        }
    };
    let id = match session.transcript().get(index - 1) {
        Some(message) => message.id,
        None => {
            println!("No message {} in the transcript.", index);
            return;
        }
    };
    match session.play_message(id).await {
        Ok(()) => println!("\x1b[90m(playing — /stop to interrupt)\x1b[0m"),
        Err(e) => println!("\x1b[31mPlayback failed:\x1b[0m {}", e),
    }
}

fn handle_export(session: &Session, arg: &str) {
    let path = (!arg.is_empty()).then(|| Path::new(arg));
    match session.export_report(path) {
        Ok(written) => println!("Report written to {}", written.display()),
        Err(e) => println!("\x1b[31mExport failed:\x1b[0m {}", e),
    }
}
