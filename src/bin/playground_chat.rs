//! One-shot prompt against a running relay
//!
//! Prints text as it streams, followed by images and meta lines.
//! Ctrl+C stops the request.

use std::io::Write;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use playground_relay::client::{
    cancel_pair, Conversation, DecodedEvent, RelayClient, SendOptions, SendOutcome,
};

/// Send a prompt to the playground relay
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Relay base URL
    #[arg(long, default_value = "http://localhost:8080")]
    url: String,

    /// Print reasoning text as it arrives
    #[arg(long)]
    show_thinking: bool,

    /// Route the prompt to image generation
    #[arg(long)]
    force_image: bool,

    /// Reasoning effort: low, medium or high
    #[arg(long)]
    effort: Option<String>,

    /// Prompt text
    #[arg(required = true, trailing_var_arg = true)]
    prompt: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playground_relay=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let prompt = args.prompt.join(" ");

    let client = RelayClient::new(reqwest::Client::new(), &args.url);
    let mut conversation = Conversation::new();
    let (handle, token) = cancel_pair();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    info!(endpoint = %client.endpoint(), "Sending prompt");

    let show_thinking = args.show_thinking;
    let options = SendOptions {
        reasoning_effort: args.effort,
        force_image_generation: args.force_image,
        ..Default::default()
    };

    let outcome = client
        .send_with(&mut conversation, &prompt, options, token, |_, event| {
            print_event(event, show_thinking)
        })
        .await;

    println!();
    match outcome {
        SendOutcome::Completed => {}
        SendOutcome::Stopped => eprintln!("(stopped)"),
        SendOutcome::Failed(message) => eprintln!("There was an error: {message}"),
        SendOutcome::Rejected => eprintln!("Nothing to send"),
    }
    Ok(())
}

fn print_event(event: &DecodedEvent, show_thinking: bool) {
    let mut out = std::io::stdout().lock();
    let _ = match event {
        DecodedEvent::Text(text) => write!(out, "{text}"),
        DecodedEvent::Thinking(text) if show_thinking => write!(out, "\x1b[2m{text}\x1b[0m"),
        DecodedEvent::Thinking(_) => Ok(()),
        DecodedEvent::ImagePartial(_) => Ok(()),
        DecodedEvent::Image(src) => writeln!(out, "\n[image, {} bytes of data URL]", src.len()),
        DecodedEvent::Meta { key, value } => writeln!(out, "\n{}: {}", key.label(), value),
    };
    let _ = out.flush();
}
