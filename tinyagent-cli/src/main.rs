//! # tinyagent CLI
//!
//! Illustrative drivers for the two agents.
//!
//! Usage:
//!   tinyagent ask <question>
//!   tinyagent chat [message]...
//!   tinyagent tools
//!
//! Examples:
//!   HF_TOKEN=hf_... tinyagent ask "What's the weather in Paris?"
//!   tinyagent chat --base-url http://localhost:8080/v1 "Hello! How are you?"
//!   tinyagent --dry-run ask "What's the weather in Paris?"
//!   tinyagent --provider local ask "What's the weather in Paris?"

use clap::{Parser, Subcommand};
use tinyagent_agent::{
    ChatAgent, ChatConfig, Message, ToolAgent, ToolLoopConfig, ToolRegistry,
};
use tinyagent_error::{Error, Result};
use tinyagent_gen::{
    CompletionsProvider, HfInferenceProvider, ProviderConfig, ProviderType, ScriptedGenerator,
    TextGenerator,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tinyagent")]
#[command(author, version, about = "tinyagent - a tool-calling loop over a text generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend: hf-inference or local (default: hf-inference for ask, local for chat)
    #[arg(long, global = true)]
    provider: Option<ProviderType>,

    /// Model to run (overrides TINYAGENT_MODEL)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Backend base URL (overrides TINYAGENT_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Token budget per generation call
    #[arg(long, global = true)]
    max_new_tokens: Option<usize>,

    /// Use canned model output instead of a real backend
    #[arg(long, global = true)]
    dry_run: bool,

    /// Enable debug logging and print the full transcript
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode - only print answers
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the tool-calling agent a question (hosted inference endpoint)
    Ask {
        #[arg(trailing_var_arg = true, required = true)]
        question: Vec<String>,

        /// Generation calls allowed before giving up
        #[arg(long, default_value = "10", value_parser = clap::value_parser!(u64).range(1..))]
        max_iterations: u64,
    },
    /// Talk to the plain conversation agent (local completions server)
    Chat {
        /// One user turn per argument
        messages: Vec<String>,

        /// Request the prompt echoed back, for pipelines that return full text
        #[arg(long)]
        echo: bool,

        /// Print the history as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the registered tools
    Tools,
}

const DEFAULT_CHAT_TURNS: [&str; 2] = ["Hello! How are you?", "What can you help me with?"];

fn canned_tool_run() -> ScriptedGenerator {
    ScriptedGenerator::new([
        "Action:\n```\n{\"action\": \"get_weather\", \"action_input\": {\"location\": \"Paris\"}}\n```\n",
        "Final Answer: It is sunny with low temperatures in Paris.",
    ])
}

fn provider_config(cli: &Cli, provider_type: ProviderType) -> ProviderConfig {
    let mut config = ProviderConfig::from_env(provider_type);
    if let Some(model) = &cli.model {
        config = config.with_model(model);
    }
    if let Some(url) = &cli.base_url {
        config = config.with_base_url(url);
    }
    config
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "warn,tinyagent_agent=debug,tinyagent_gen=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn ask<G: TextGenerator>(
    generator: G,
    question: &str,
    config: ToolLoopConfig,
    verbose: bool,
    quiet: bool,
) -> Result<()> {
    if !quiet {
        println!("Using {} ({})\n", generator.name(), generator.model());
    }

    let agent = ToolAgent::new(generator, ToolRegistry::builtin()).with_config(config);
    let outcome = agent.run_detailed(question).await?;

    if !quiet {
        println!("--- FINAL ANSWER ---\n");
    }
    println!("{}", outcome.answer);

    if verbose {
        println!(
            "\n--- Transcript ({} iterations, {} tool calls) ---\n",
            outcome.iterations,
            outcome.tool_calls.len()
        );
        println!("{}", outcome.transcript.as_str());
    }
    Ok(())
}

async fn chat<G: TextGenerator>(
    generator: G,
    messages: &[String],
    config: ChatConfig,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let mut agent = ChatAgent::new(generator).with_config(config);

    if !quiet {
        println!("Starting conversation...");
    }

    for message in messages {
        let reply = agent.run(message).await?;
        println!("Agent: {}", reply);
    }

    if json {
        let rendered = serde_json::to_string_pretty(agent.history()).map_err(|e| {
            Error::unexpected(format!("failed to serialize history: {}", e))
                .with_operation("cli::chat")
                .set_source(e)
        })?;
        println!("{}", rendered);
    } else if !quiet {
        println!("\nConversation History:");
        for Message { role, content } in agent.history() {
            println!("{}: {}", role.label(), content);
        }
    }
    Ok(())
}

fn show_tools() {
    let registry = ToolRegistry::builtin();
    println!("{} tool(s):", registry.len());
    println!("{}", registry.catalogue());
}

async fn dispatch(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Tools => {
            show_tools();
            Ok(())
        }
        Commands::Ask {
            question,
            max_iterations,
        } => {
            let question = question.join(" ");
            let mut config = ToolLoopConfig {
                max_iterations: *max_iterations as usize,
                ..Default::default()
            };
            if let Some(max) = cli.max_new_tokens {
                config.max_new_tokens = max;
            }

            if cli.dry_run {
                return ask(canned_tool_run(), &question, config, cli.verbose, cli.quiet).await;
            }
            match cli.provider.unwrap_or(ProviderType::HfInference) {
                ProviderType::HfInference => {
                    let provider =
                        HfInferenceProvider::new(provider_config(cli, ProviderType::HfInference))?;
                    ask(provider, &question, config, cli.verbose, cli.quiet).await
                }
                ProviderType::Local => {
                    let provider =
                        CompletionsProvider::new(provider_config(cli, ProviderType::Local))?;
                    ask(provider, &question, config, cli.verbose, cli.quiet).await
                }
            }
        }
        Commands::Chat {
            messages,
            echo,
            json,
        } => {
            let messages: Vec<String> = if messages.is_empty() {
                DEFAULT_CHAT_TURNS.iter().map(|s| s.to_string()).collect()
            } else {
                messages.clone()
            };
            let mut config = ChatConfig::default();
            if let Some(max) = cli.max_new_tokens {
                config.max_new_tokens = max;
            }

            if cli.dry_run {
                let generator =
                    ScriptedGenerator::repeating("I'm a scripted assistant.").with_echo(*echo);
                return chat(generator, &messages, config, *json, cli.quiet).await;
            }
            match cli.provider.unwrap_or(ProviderType::Local) {
                ProviderType::HfInference => {
                    let provider = HfInferenceProvider::new(
                        provider_config(cli, ProviderType::HfInference).with_echo(*echo),
                    )?;
                    chat(provider, &messages, config, *json, cli.quiet).await
                }
                ProviderType::Local => {
                    let provider = CompletionsProvider::new(
                        provider_config(cli, ProviderType::Local).with_echo(*echo),
                    )?;
                    chat(provider, &messages, config, *json, cli.quiet).await
                }
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = dispatch(&cli).await {
        eprintln!("Error: {}", e);
        if cli.verbose {
            eprintln!("\n{:?}", e);
        }
        std::process::exit(1);
    }
}
