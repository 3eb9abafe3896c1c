use crate::candidate::{DropPayload, RawFile};
use crate::commands::{Command, HELP};
use crate::config::Config;
use crate::prediction::InferenceClient;
use crate::runtime::{EventSender, Runtime};
use crate::workflow::{Event, Workflow};

use std::sync::Arc;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    signal,
    sync::broadcast,
};

pub async fn start_app(config: Config) -> anyhow::Result<()> {
    let client = match InferenceClient::new(&config.backend) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!("Failed to initialize inference client: {:?}", e);
            return Err(e.into());
        }
    };

    let runtime = Runtime::new(client.clone(), client.clone());
    let events = runtime.sender();

    let (shutdown_tx, _) = broadcast::channel(1);
    let runtime_handle = tokio::spawn(runtime.run(print_view, shutdown_tx.subscribe()));

    tracing::info!("Classifying against {}", config.backend.predict_url());
    println!("{}", HELP);

    tokio::select! {
        result = read_commands(&config, &client, &events) => result?,
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received, starting graceful shutdown.");
        }
    }

    let _ = shutdown_tx.send(());
    let _ = runtime_handle.await;

    Ok(())
}

fn print_view(workflow: &Workflow) {
    println!("\n{}", workflow.view());
}

async fn read_commands(
    config: &Config,
    client: &Arc<InferenceClient>,
    events: &EventSender,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match Command::try_from(line.as_str()) {
            Ok(Command::Quit) => break,
            Ok(command) => dispatch(command, config, client, events).await,
            Err(message) => println!("{}", message),
        }
    }

    Ok(())
}

async fn dispatch(
    command: Command,
    config: &Config,
    client: &Arc<InferenceClient>,
    events: &EventSender,
) {
    let event = match command {
        Command::Open(path) => match RawFile::from_path(&path).await {
            Ok(raw) => Event::FileSelected(raw),
            Err(e) => {
                println!("Could not read {}: {}", path.display(), e);
                return;
            }
        },
        Command::DragEnter => Event::DragEntered,
        Command::DragLeave => Event::DragLeft,
        Command::Drop(paths) => {
            let mut files = Vec::with_capacity(paths.len());
            for path in paths {
                match RawFile::from_path(&path).await {
                    Ok(raw) => files.push(raw),
                    Err(e) => tracing::warn!("Skipping dropped file {}: {}", path.display(), e),
                }
            }
            Event::FilesDropped(DropPayload::new(files))
        }
        Command::Example(name) => match config.example(&name) {
            Some(example) => Event::ExampleRequested {
                url: example.url.clone(),
                name: example.file_name.clone(),
            },
            None => {
                println!("{} is not a known example. Type `examples` for the list.", name);
                return;
            }
        },
        Command::Examples => {
            for example in &config.examples {
                println!("  {:<12} {}", example.name, example.url);
            }
            return;
        }
        Command::Classify => Event::ClassifyRequested,
        Command::Health => {
            // A hung backend must not block later commands.
            let client = client.clone();
            tokio::spawn(async move {
                match client.health().await {
                    Ok(status) => println!("Backend status: {}", status),
                    Err(e) => println!("Backend unreachable: {}", e),
                }
            });
            return;
        }
        Command::Help => {
            println!("{}", HELP);
            return;
        }
        Command::Quit => return,
    };

    if !events.send(event) {
        tracing::warn!("Event loop is not running, dropping command");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendConfig, LogLevel};
    use std::time::Duration;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_hung_health_check_does_not_block_commands() {
        // Accepts connections and never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = Config {
            log_level: LogLevel::Info,
            backend: BackendConfig {
                base_url: format!("http://{}", addr),
                request_timeout_ms: None,
            },
            examples: vec![],
        };
        let client = Arc::new(InferenceClient::new(&config.backend).unwrap());
        let runtime = Runtime::new(client.clone(), client.clone());
        let events = runtime.sender();

        for command in [Command::Health, Command::Classify] {
            let dispatched = tokio::time::timeout(
                Duration::from_secs(1),
                dispatch(command, &config, &client, &events),
            )
            .await;
            assert!(dispatched.is_ok());
        }
    }
}
