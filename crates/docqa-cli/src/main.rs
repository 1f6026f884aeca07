use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use eyre::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use docqa_cli::config::{self, DocqaConfig, Overrides, Settings};
use docqa_cli::session::{ChatSession, SendOutcome};
use docqa_client::ApiClient;
use docqa_client::error::ClientError;
use docqa_core::endpoints::ApiEndpoints;
use docqa_core::models::history::DocumentKey;
use docqa_core::models::message::Message;
use docqa_core::models::query::validate_top_k;
use docqa_export::format::{ExportFormat, export};
use docqa_history::backend::FileBackend;
use docqa_history::clock::{Clock, SystemClock};
use docqa_history::store::ChatHistoryStore;

mod cli;

use cli::{Cli, Command, ConfigAction, HistoryAction, document_key};

type Store = ChatHistoryStore<FileBackend>;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config_dir = config::config_dir()?;
    let mut config = config::load_config(&config_dir)?;
    let overrides = Overrides {
        api_url: cli.api_url.clone(),
        events_url: None,
    }
    .or(Overrides::from_env());
    let settings = config.resolve(&overrides)?;

    match cli.command {
        Command::Config { action } => run_config(action, &config_dir, &mut config, &settings),
        Command::History { action } => run_history(action, &*open_store(&settings)?),
        Command::Export { doc, format, output } => {
            let format: ExportFormat = format.parse()?;
            run_export(&*open_store(&settings)?, document_key(doc), format, output)
        }
        command => {
            let client = ApiClient::new(settings.endpoints.clone(), settings.request_timeout)?
                .with_poll_policy(settings.poll);
            run_remote(command, &client, &settings).await
        }
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn open_store(settings: &Settings) -> Result<Arc<Store>> {
    let dir = config::data_dir()?;
    let backend = FileBackend::new(dir, settings.history_capacity_bytes);
    Ok(Arc::new(
        ChatHistoryStore::new(backend).with_capacity(settings.history_capacity_bytes),
    ))
}

/// The classified, user-facing form of a client error.
fn user_error(e: ClientError) -> eyre::Report {
    let classified = e.classify();
    eyre::eyre!("{}: {}", classified.title, classified.message)
}

async fn run_remote(command: Command, client: &ApiClient, settings: &Settings) -> Result<()> {
    match command {
        Command::Upload { files } => {
            let total = files.len();
            let mut uploaded = 0;
            for (path, result) in client.upload_many(&files).await {
                match result {
                    Ok(receipt) => {
                        uploaded += 1;
                        println!("uploaded {} as {}", path.display(), receipt.document.name);
                        if let Some(message) = receipt.message {
                            println!("  {message}");
                        }
                    }
                    Err(e) => {
                        let notice = e.classify();
                        eprintln!("{}: {} ({})", notice.title, notice.message, path.display());
                    }
                }
            }
            println!("Uploaded {uploaded} of {total} file(s)");
            if uploaded == 0 {
                return Err(eyre::eyre!("no files were uploaded"));
            }
        }
        Command::Files => {
            let documents = client.list_files().await.map_err(user_error)?;
            if documents.is_empty() {
                println!("No documents uploaded yet");
            }
            for doc in documents {
                println!(
                    "{}\t{}\t{}",
                    doc.name,
                    doc.size.as_deref().unwrap_or("-"),
                    doc.upload_date.as_deref().unwrap_or("-"),
                );
            }
        }
        Command::Delete { name } => {
            client.delete(&name).await.map_err(user_error)?;
            println!("deleted {name}");
        }
        Command::Rename { old, new } => {
            let renamed = client.rename(&old, &new).await.map_err(user_error)?;
            println!("renamed {old} to {renamed}");
        }
        Command::Download { name, output } => {
            let bytes = client.download(&name).await.map_err(user_error)?;
            let path = output.unwrap_or_else(|| default_download_path(&name));
            std::fs::write(&path, &bytes)?;
            println!("saved {} ({} bytes)", path.display(), bytes.len());
        }
        Command::Health => {
            let health = client.health().await.map_err(user_error)?;
            println!("{}: {}", health.status, health.message);
        }
        Command::Ask { doc, top_k, question } => {
            let mut session = open_session(settings, document_key(doc), top_k)?;
            let (cancel, watcher) = cancel_on_ctrl_c();
            let outcome = session.send(client, &question, &cancel).await;
            watcher.abort();
            print_outcome(&outcome?);
        }
        Command::Chat { doc, top_k } => {
            let session = open_session(settings, document_key(doc), top_k)?;
            chat_loop(session, client).await?;
        }
        Command::Config { .. } | Command::History { .. } | Command::Export { .. } => {}
    }
    Ok(())
}

fn open_session(
    settings: &Settings,
    document: DocumentKey,
    top_k: Option<u32>,
) -> Result<ChatSession<FileBackend>> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = open_store(settings)?;
    Ok(ChatSession::open(
        store,
        clock,
        document,
        top_k.unwrap_or(settings.top_k),
    )?)
}

/// A token cancelled by the next Ctrl-C. Abort the handle once the
/// guarded work is done.
fn cancel_on_ctrl_c() -> (CancellationToken, tokio::task::JoinHandle<()>) {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling");
            trigger.cancel();
        }
    });
    (cancel, watcher)
}

async fn chat_loop(mut session: ChatSession<FileBackend>, client: &ApiClient) -> Result<()> {
    print_message(&session.greeting());
    for message in session.messages() {
        print_message(message);
    }
    println!("(/clear, /export <md|txt|json|html|docx>, /topk <n>, /quit)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input.split_once(' ').unwrap_or((input, "")) {
            ("/quit" | "/exit", _) => break,
            ("/clear", _) => {
                session.clear();
                println!("Chat cleared");
            }
            ("/topk", n) => match n.trim().parse::<u32>() {
                Ok(n) => match session.set_top_k(n) {
                    Ok(()) => println!("top_k set to {n}"),
                    Err(e) => eprintln!("Error: {e}"),
                },
                Err(_) => eprintln!("Error: /topk expects a number"),
            },
            ("/export", format) => {
                let format = if format.trim().is_empty() { "md" } else { format.trim() };
                match format.parse::<ExportFormat>() {
                    Ok(format) => {
                        let artifact = session.export(format)?;
                        std::fs::write(&artifact.filename, &artifact.bytes)?;
                        println!("exported {}", artifact.filename);
                    }
                    Err(e) => eprintln!("Error: {e}"),
                }
            }
            _ => {
                let (cancel, watcher) = cancel_on_ctrl_c();
                let outcome = session.send(client, input, &cancel).await;
                watcher.abort();
                match outcome {
                    Ok(outcome) => print_outcome(&outcome),
                    Err(e) => eprintln!("Error: {e}"),
                }
            }
        }
    }
    Ok(())
}

fn print_outcome(outcome: &SendOutcome) {
    match outcome {
        SendOutcome::Answered(message) => print_message(message),
        SendOutcome::Failed { notice, message } => {
            eprintln!("{}: {}", notice.title, notice.message);
            print_message(message);
        }
        SendOutcome::Stale => {}
    }
}

fn print_message(message: &Message) {
    println!("{} {}: {}", message.role.emoji(), message.role.label(), message.content);
    if !message.sources().is_empty() {
        println!("   Sources:");
        for source in message.sources() {
            println!("   - {source}");
        }
    }
}

fn default_download_path(name: &str) -> PathBuf {
    Path::new(name)
        .file_name()
        .map_or_else(|| PathBuf::from("download.pdf"), PathBuf::from)
}

fn run_history(action: HistoryAction, store: &Store) -> Result<()> {
    match action {
        HistoryAction::List => {
            let table = store.read_all();
            if table.is_empty() {
                println!("No saved chats");
            }
            for key in store.list_keys_by_recency() {
                if let Some(record) = table.get(&key) {
                    println!(
                        "{}\t{} message(s)\t{}",
                        key.display_name(),
                        record.messages.len(),
                        record.last_updated
                    );
                }
            }
        }
        HistoryAction::Show { doc } => {
            let key = document_key(doc);
            let messages = store.read(&key);
            if messages.is_empty() {
                println!("No saved chat for {key}");
            }
            for message in &messages {
                print_message(message);
            }
        }
        HistoryAction::Clear { doc, all } => {
            if all {
                if !store.delete_all() {
                    return Err(eyre::eyre!("failed to clear chat history"));
                }
                println!("Cleared all chat history");
            } else {
                let key = document_key(doc);
                if !store.delete(&key) {
                    return Err(eyre::eyre!("failed to clear chat history for {key}"));
                }
                println!("Cleared chat history for {key}");
            }
        }
        HistoryAction::Usage => {
            let usage = store.usage();
            println!(
                "{} of {} bytes used ({:.1}%)",
                usage.used, usage.capacity, usage.percentage
            );
        }
        HistoryAction::Dump { doc } => {
            println!("{}", store.export_key(&document_key(doc))?);
        }
    }
    Ok(())
}

fn run_export(
    store: &Store,
    document: DocumentKey,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let messages = store.read(&document);
    let artifact = export(format, &document, &messages, jiff::Timestamp::now())?;
    let path = output.unwrap_or_else(|| PathBuf::from(&artifact.filename));
    std::fs::write(&path, &artifact.bytes)?;
    println!(
        "exported {} message(s) to {} ({})",
        messages.len(),
        path.display(),
        artifact.content_type
    );
    Ok(())
}

fn run_config(
    action: ConfigAction,
    dir: &Path,
    config: &mut DocqaConfig,
    settings: &Settings,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", serde_json::to_string_pretty(config)?);
            println!("config file: {}", dir.join("config.json").display());
            println!("effective api url: {}", settings.endpoints.api_base());
            println!("effective events url: {}", settings.endpoints.events_base());
        }
        ConfigAction::SetUrl { url } => {
            ApiEndpoints::new(&url, &config.events_url)?;
            config.api_url = url.trim().to_string();
            config::save_config(dir, config)?;
            println!("api url set to {}", config.api_url);
        }
        ConfigAction::SetTopK { top_k } => {
            config.top_k = validate_top_k(top_k)?;
            config::save_config(dir, config)?;
            println!("top_k set to {top_k}");
        }
    }
    Ok(())
}
