use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;
use vilg_gateway::app::App;
use vilg_gateway::gallery::GalleryWriter;
use vilg_gateway::models::{Config, Prompt};
use vilg_gateway::server;

#[derive(Debug, Parser)]
#[command(name = "vilg-gateway")]
#[command(about = "Translate prompts and generate images with ERNIE-ViLG")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API.
    Serve {
        /// Address to bind, overriding BIND_ADDR.
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
    /// Run one prompt through the pipeline and save the images.
    Generate {
        /// Index into the style list (see `styles`).
        #[arg(long, short, default_value_t = 0)]
        style: usize,
        /// Directory for the generated images.
        #[arg(long, short, value_name = "DIR")]
        output: Option<PathBuf>,
        #[arg(value_name = "PROMPT", value_parser = parse_prompt_arg)]
        prompt: String,
    },
    /// List the configured styles.
    Styles,
}

fn parse_prompt_arg(input: &str) -> std::result::Result<String, String> {
    Prompt::new(input)
        .map(|p| p.as_str().to_string())
        .map_err(|_| "Prompt must not be empty".to_string())
}

fn default_output_dir() -> PathBuf {
    let date = Local::now().format("%Y-%m-%d").to_string();
    PathBuf::from("output").join(format!("{}_{}", date, Uuid::new_v4()))
}

async fn run_generate(
    config: &Config,
    prompt: String,
    style: usize,
    output: Option<PathBuf>,
) -> Result<bool> {
    let app = App::from_config(config);
    let prompt = Prompt::new(prompt)?;
    let style = app.styles().select(style)?;

    let submission = app.submit(&prompt, style).await;

    if let Some(tip) = submission.advisory.text() {
        println!("{}", tip);
    }
    if let Some(normalized) = &submission.normalized_prompt {
        info!("Normalized prompt: {}", normalized);
    }
    println!("{}", submission.outcome.status_text());

    if !submission.outcome.is_success() {
        return Ok(false);
    }

    let writer = GalleryWriter::new(&output.unwrap_or_else(default_output_dir))?;
    let paths = writer
        .write(submission.outcome.images(), &format!("style{}", style.index()))
        .await?;
    for path in &paths {
        println!("{}", path.display());
    }
    info!(
        "Saved {} image(s) to {}",
        paths.len(),
        writer.output_dir().display()
    );
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vilg_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    match args.command {
        Command::Serve { bind } => {
            info!("Starting vilg-gateway");
            let bind_addr = bind.unwrap_or_else(|| config.bind_addr.clone());
            let app = App::from_config(&config);
            if let Err(e) = server::serve(app, &bind_addr, config.max_concurrency).await {
                error!("Server failed: {}", e);
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Generate {
            style,
            output,
            prompt,
        } => match run_generate(&config, prompt, style, output).await {
            Ok(true) => Ok(()),
            Ok(false) => std::process::exit(1),
            Err(e) => {
                error!("Generation failed: {}", e);
                std::process::exit(1);
            }
        },
        Command::Styles => {
            for entry in config.styles.entries() {
                println!("{:>3}  {}", entry.index, entry.name);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prompt_arg_valid() {
        assert_eq!(parse_prompt_arg("A cat with glasses").unwrap(), "A cat with glasses");
    }

    #[test]
    fn test_parse_prompt_arg_blank() {
        let err = parse_prompt_arg("   ").unwrap_err();
        assert!(err.contains("empty"));
    }

    #[test]
    fn test_cli_parses_generate() {
        let args = CliArgs::try_parse_from(["vilg-gateway", "generate", "--style", "3", "猫"])
            .unwrap();
        match args.command {
            Command::Generate { style, prompt, .. } => {
                assert_eq!(style, 3);
                assert_eq!(prompt, "猫");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
