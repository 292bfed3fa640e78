mod app;
mod config;
mod core;
mod runtime;
mod ui;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::{Config, DEFAULT_API_URL, DEFAULT_NAMESPACE};
use crate::core::api::{ApiClient, Backend};
use crate::core::channel::ChannelSettings;
use crate::core::metrics::Metrics;
use crate::core::models::{EmailId, Mutation, ProcessRequest, PROCESSOR_DEFAULT_EMAILS};
use crate::runtime::Runtime;

#[derive(Parser)]
#[command(name = "mailguard", version, about = "Live email security dashboard")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Show the dashboard and follow live updates (default)
    Watch {
        /// Skip the live channel and work from snapshots only
        #[arg(long)]
        no_live: bool,
    },
    /// Print metrics and every detection once
    List,
    MarkImportant { id: EmailId },
    ToggleArchive { id: EmailId },
    ToggleRead { id: EmailId },
    Delete { id: EmailId },
    /// Check a piece of text against the spam filter
    TestSpam { text: Vec<String> },
    /// Run the backend email processor
    Process {
        #[arg(long = "category", default_value = "primary")]
        categories: Vec<String>,
        #[arg(long, default_value_t = PROCESSOR_DEFAULT_EMAILS)]
        max: u32,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// Save the API url and token for later runs
    Login {
        #[arg(long, default_value = DEFAULT_API_URL)]
        api_url: String,
        #[arg(long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,
        /// Read from stdin when omitted
        #[arg(long)]
        token: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli.command.unwrap_or(Command::Watch { no_live: false })).await {
        eprintln!("mailguard: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Command) -> Result<(), String> {
    match command {
        Command::Login {
            api_url,
            namespace,
            token,
        } => login(api_url, namespace, token).await,
        other => run_with_config(other).await,
    }
}

async fn run_with_config(command: Command) -> Result<(), String> {
    let config = Config::resolve().map_err(|e| e.to_string())?;
    let client = ApiClient::new(&config.api_url, config.token.clone()).map_err(|e| e.to_string())?;
    log::info!("Using backend {}", client.base_url());

    match command {
        Command::Watch { no_live } => {
            let settings = (!no_live).then(|| config.channel_settings());
            watch(client, settings).await;
            Ok(())
        }
        Command::List => {
            let records = client.fetch_snapshot().await.map_err(|e| e.to_string())?;
            println!("{}\n", ui::metric_cards::view(&Metrics::project(&records)));
            print!("{}", ui::detections::view(&records));
            Ok(())
        }
        Command::MarkImportant { id } => mutate(&client, Mutation::MarkImportant, id).await,
        Command::ToggleArchive { id } => mutate(&client, Mutation::ToggleArchive, id).await,
        Command::ToggleRead { id } => mutate(&client, Mutation::ToggleRead, id).await,
        Command::Delete { id } => mutate(&client, Mutation::Delete, id).await,
        Command::TestSpam { text } => {
            let verdict = client
                .test_spam(&text.join(" "))
                .await
                .map_err(|e| e.to_string())?;
            println!("{}", ui::spam_test::view_verdict(&verdict));
            Ok(())
        }
        Command::Process {
            categories,
            max,
            start,
            end,
        } => {
            let request = ProcessRequest {
                categories: categories
                    .iter()
                    .flat_map(|c| c.split(','))
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect(),
                max_emails: max,
                start_date: start,
                end_date: end,
            };
            let outcome = client
                .run_processor(&request)
                .await
                .map_err(|e| e.to_string())?;
            println!("{}", outcome.summary());
            Ok(())
        }
        Command::Login { .. } => Err("login does not use stored config".into()),
    }
}

async fn mutate(client: &ApiClient, mutation: Mutation, id: EmailId) -> Result<(), String> {
    match client.mutate(mutation, id).await {
        Ok(Some(record)) => {
            print!("{}", ui::detections::view([&record]));
            Ok(())
        }
        Ok(None) => {
            println!("ok");
            Ok(())
        }
        Err(e) => Err(format!("{}: {e}", mutation.failure_notice())),
    }
}

async fn login(api_url: String, namespace: String, token: Option<String>) -> Result<(), String> {
    let token = match token {
        Some(t) => t,
        None => {
            eprint!("Token for {api_url}: ");
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            lines
                .next_line()
                .await
                .map_err(|e| format!("read token: {e}"))?
                .unwrap_or_default()
        }
    };
    let token = token.trim().to_string();
    if token.is_empty() {
        return Err("token must not be empty".into());
    }

    Config {
        api_url,
        namespace,
        token,
    }
    .store()?;
    println!("Saved");
    Ok(())
}

async fn watch(client: ApiClient, settings: Option<ChannelSettings>) {
    let runtime = Runtime::new(client, settings);

    let tx = runtime.sender();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim() == "help" {
                eprintln!("{}", ui::input::HELP);
                continue;
            }
            match ui::input::parse_command(&line) {
                Ok(msg) => {
                    if tx.send(msg).is_err() {
                        break;
                    }
                }
                Err(e) => eprintln!("{e} (type `help`)"),
            }
        }
        log::debug!("stdin closed");
    });

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Cannot listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let mut last = String::new();
    runtime
        .run(shutdown, |dash| {
            if dash.is_torn_down() {
                return;
            }
            let frame = ui::render(dash);
            if frame != last {
                // Clear screen and home the cursor.
                print!("\x1b[2J\x1b[H{frame}");
                last = frame;
            }
        })
        .await;
}
