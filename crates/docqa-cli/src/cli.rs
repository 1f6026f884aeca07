use std::path::PathBuf;

use clap::{Parser, Subcommand};

use docqa_core::models::history::DocumentKey;

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Ask questions about your PDF documents")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Backend base URL (overrides DOCQA_API_URL and the config file)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Log as JSON lines instead of human-readable text
    #[arg(long, global = true, action = clap::ArgAction::SetTrue)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Upload one or more PDF files
    Upload {
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },
    /// List stored documents
    Files,
    /// Delete a stored document
    Delete { name: String },
    /// Rename a stored document
    Rename { old: String, new: String },
    /// Download a stored document
    Download {
        name: String,
        /// Output path (defaults to the document name in the current directory)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Check that the backend is up
    Health,
    /// Ask a single question
    Ask {
        /// Document to ask about (all documents when omitted)
        #[arg(long, value_name = "NAME")]
        doc: Option<String>,
        #[arg(long, value_name = "N")]
        top_k: Option<u32>,
        question: String,
    },
    /// Interactive chat about a document
    Chat {
        /// Document to chat about (all documents when omitted)
        #[arg(long, value_name = "NAME")]
        doc: Option<String>,
        #[arg(long, value_name = "N")]
        top_k: Option<u32>,
    },
    /// Inspect or clear saved chat history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Export a saved chat transcript
    Export {
        /// Document whose chat to export (all documents when omitted)
        doc: Option<String>,
        /// md, txt, json, html or docx
        #[arg(short, long, default_value = "md")]
        format: String,
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Documents with saved chats, most recent first
    List,
    /// Print a saved chat
    Show { doc: Option<String> },
    /// Delete a saved chat, or every saved chat with --all
    Clear {
        #[arg(conflicts_with = "all")]
        doc: Option<String>,
        #[arg(long)]
        all: bool,
    },
    /// Storage used by saved chats
    Usage,
    /// Print a saved chat as JSON
    Dump { doc: Option<String> },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    Show,
    SetUrl { url: String },
    SetTopK { top_k: u32 },
}

/// A document name from the command line; none means all documents.
pub fn document_key(doc: Option<String>) -> DocumentKey {
    doc.map_or_else(DocumentKey::all, DocumentKey::from)
}
