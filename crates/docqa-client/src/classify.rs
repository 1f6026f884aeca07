//! Failure classification.
//!
//! Every failure maps to exactly one title, one message and a retry flag.
//! Classification never fails: anything unrecognised falls back to a
//! generic message.

pub const UNEXPECTED_MESSAGE: &str = "An unexpected error occurred. Please try again.";
pub const CONNECT_MESSAGE: &str =
    "Unable to connect to the server. Please check your internet connection.";
pub const TIMEOUT_MESSAGE: &str = "The request timed out. Please try again.";
pub const PDF_MESSAGE: &str =
    "There was a problem processing the PDF file. Please ensure it is a valid PDF.";

/// What went wrong, reduced to the three shapes that matter to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// A response arrived with an error status.
    Status { status: u16, detail: Option<String> },
    /// The request was sent but nothing came back.
    Connect,
    /// The request was sent and the response did not arrive in time.
    Timeout,
    /// The call failed before anything was sent, with its own message.
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub title: &'static str,
    pub message: String,
    pub retryable: bool,
}

pub fn classify(failure: &Failure) -> Classified {
    match failure {
        Failure::Status { status, detail } => Classified {
            title: status_title(*status),
            message: status_message(*status, detail.as_deref()),
            retryable: status_retryable(*status),
        },
        Failure::Connect => Classified {
            title: "Connection Error",
            message: CONNECT_MESSAGE.to_string(),
            retryable: true,
        },
        Failure::Timeout => Classified {
            title: "Connection Error",
            message: TIMEOUT_MESSAGE.to_string(),
            retryable: true,
        },
        Failure::Other(message) => Classified {
            title: "Error",
            message: other_message(message),
            retryable: false,
        },
    }
}

fn status_title(status: u16) -> &'static str {
    match status {
        500.. => "Server Error",
        400..=499 => "Request Error",
        _ => "Error",
    }
}

fn status_retryable(status: u16) -> bool {
    matches!(status, 408 | 429 | 500..=599)
}

fn status_message(status: u16, detail: Option<&str>) -> String {
    let detail = detail.map(str::trim).filter(|d| !d.is_empty());
    let fixed = match status {
        400 => detail.unwrap_or("Invalid request. Please check your input and try again."),
        401 => "You are not authorized. Please log in and try again.",
        403 => "You do not have permission to perform this action.",
        404 => detail.unwrap_or("The requested resource was not found."),
        408 => "The request took too long. Please try again.",
        413 => "The file is too large. Please upload a smaller file.",
        415 => "Unsupported file type. Please upload a PDF file.",
        429 => "Too many requests. Please wait a moment and try again.",
        500 => "Our servers encountered an error. Please try again later.",
        502..=504 => "The service is temporarily unavailable. Please try again later.",
        _ => {
            return match detail {
                Some(detail) => format!("{detail} (status {status})"),
                None => format!("An error occurred ({status}). Please try again."),
            };
        }
    };
    fixed.to_string()
}

fn other_message(message: &str) -> String {
    let message = message.trim();
    if message.to_ascii_lowercase().contains("timeout") {
        TIMEOUT_MESSAGE.to_string()
    } else if message.contains("PDF") || message.contains("pdf") {
        PDF_MESSAGE.to_string()
    } else if message.is_empty() {
        UNEXPECTED_MESSAGE.to_string()
    } else {
        message.to_string()
    }
}
