//! Interactive chat loop over the grounding pipeline: reads questions
//! from stdin, streams the answer to stdout.

use std::io::Write;
use std::sync::Arc;

use futures::StreamExt;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use groundwire::pipeline::{AnswerOptions, StreamEvent};
use groundwire::{GroundingOrchestrator, GroundwireConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn").add_directive("groundwire=info".parse().unwrap()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = GroundwireConfig::from_env();
    let orchestrator = Arc::new(GroundingOrchestrator::new(config)?);
    orchestrator.warm_up().await;

    let user_id = format!("cli-{}", std::process::id());
    let options = AnswerOptions::default();
    let stdin = std::io::stdin();

    println!("groundwire chat - ask a question, or press Ctrl-D to quit");
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }

        let mut stream = Box::pin(
            orchestrator
                .clone()
                .answer_stream(question.to_string(), user_id.clone(), options.clone())
                .await,
        );

        let mut assembled = String::new();
        while let Some(event) = stream.next().await {
            match event {
                StreamEvent::Token(token) => {
                    assembled.push_str(&token);
                    print!("{token}");
                    std::io::stdout().flush()?;
                }
                StreamEvent::Done(final_answer) => {
                    // The hedging screen can replace the streamed text;
                    // show the substituted answer when it differs.
                    if assembled.trim() != final_answer.trim() {
                        if !assembled.is_empty() {
                            println!();
                        }
                        print!("{final_answer}");
                    }
                    println!();
                }
            }
        }
        println!();
    }

    Ok(())
}
