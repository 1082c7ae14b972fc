//! `lectern ask` — Answer a single question.

use lectern_config::AppConfig;
use lectern_core::History;

use crate::runtime;

pub async fn run(config: &AppConfig, question: &str) -> Result<(), Box<dyn std::error::Error>> {
    let index = runtime::open_index(config)?;
    let orchestrator = runtime::build_orchestrator(config, index)?;

    eprint!("  Thinking...");
    let result = orchestrator
        .answer_query(question, &History::new(config.query.max_history_turns))
        .await;
    eprint!("\r              \r");

    runtime::print_answer(&result?);
    Ok(())
}
