//! `lectern chat` — Interactive session with bounded history.

use lectern_agent::SessionStore;
use lectern_config::AppConfig;
use std::io::Write;
use tokio::io::{self, AsyncBufReadExt, BufReader};

use crate::runtime;

pub async fn run(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let index = runtime::open_index(config)?;
    let course_count = index.course_count().await;
    let orchestrator = runtime::build_orchestrator(config, index)?;

    let sessions = SessionStore::new(config.query.max_history_turns);
    let mut session = sessions.create_session().await;

    println!();
    println!("  Lectern — Interactive Mode");
    println!();
    println!("  Model:     {}", orchestrator.model());
    println!("  Courses:   {course_count}");
    println!("  Tools:     {}", orchestrator.tools().names().join(", "));
    println!();
    println!("  Type a question and press Enter.");
    println!("  Type '/new' to forget the conversation, 'exit' to quit.");
    println!();

    let mut lines = BufReader::new(io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit" | "/exit" | "/quit" | ":q") {
            break;
        }
        if line == "/new" {
            sessions.remove(&session).await;
            session = sessions.create_session().await;
            println!("  (new conversation)");
            println!();
            continue;
        }

        eprint!("  ...");
        let history = sessions.history(&session).await;
        match orchestrator.answer_query(line, &history).await {
            Ok(answer) => {
                eprint!("\r     \r");
                println!();
                runtime::print_answer(&answer);
                println!();
                sessions.record_exchange(&session, line, &answer.answer).await;
            }
            Err(e) => {
                eprint!("\r     \r");
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye!");
    Ok(())
}
