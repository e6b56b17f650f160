//! Interactive terminal client for the Insight API.
//!
//! Creates a session, loops on stdin, and deletes the session on exit so
//! the server does not keep dead conversations until their TTL.

#![warn(clippy::all)]

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Chat with the Insight analytics assistant from the terminal.
#[derive(Parser, Debug)]
#[command(name = "insight-cli")]
#[command(version)]
#[command(about = "Interactive client for the Insight analytics chatbot API", long_about = None)]
struct Cli {
    /// Base URL of the API, including the /api prefix
    #[arg(long, env = "INSIGHT_API_URL", default_value = "http://localhost:8000/api")]
    api_url: String,

    /// Administrative API key
    #[arg(long, env = "INSIGHT_API_KEY")]
    api_key: String,
}

#[derive(Deserialize)]
struct SessionResponse {
    session_id: String,
}

#[derive(Deserialize)]
struct QueryResponse {
    response: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

struct ApiClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl ApiClient {
    fn new(api_url: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url,
            api_key,
        }
    }

    async fn create_session(&self) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/sessions", self.api_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("failed to reach the Insight API")?;

        if !response.status().is_success() {
            bail!("session creation failed with status {}", response.status());
        }

        let session: SessionResponse = response.json().await?;
        Ok(session.session_id)
    }

    async fn ask(&self, session_id: &str, message: &str) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/query", self.api_url))
            .bearer_auth(&self.api_key)
            .header("X-Session-ID", session_id)
            .json(&serde_json::json!({ "message": message }))
            .send()
            .await
            .context("query request failed")?;

        if response.status().is_success() {
            let reply: QueryResponse = response.json().await?;
            Ok(reply.response)
        } else {
            let status = response.status();
            let detail = response
                .json::<ErrorResponse>()
                .await
                .map(|e| e.error)
                .unwrap_or_else(|_| "unknown error".into());
            Ok(format!("Error {status}: {detail}"))
        }
    }

    async fn delete_session(&self, session_id: &str) {
        let _ = self
            .http
            .delete(format!("{}/sessions/{session_id}", self.api_url))
            .bearer_auth(&self.api_key)
            .send()
            .await;
    }
}

/// Render `==emphasis==` spans as bold terminal text.
fn format_response(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("==") {
        if let Some(len) = rest[start + 2..].find("==") {
            out.push_str(&rest[..start]);
            out.push_str("\x1b[1m");
            out.push_str(&rest[start + 2..start + 2 + len]);
            out.push_str("\x1b[0m");
            rest = &rest[start + 2 + len + 2..];
        } else {
            break;
        }
    }
    out.push_str(rest);
    out
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = ApiClient::new(cli.api_url, cli.api_key);

    println!("Insight Chatbot CLI");
    println!("Type 'quit' or 'exit' to end the conversation");
    println!("{}", "-".repeat(50));

    let session_id = client.create_session().await?;
    println!("Session created: {session_id}");
    println!("Bot: Hello! How can I help you analyze the platform today?");

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(b"\nYou: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        if matches!(input.to_lowercase().as_str(), "quit" | "exit" | "q") {
            break;
        }
        if input.is_empty() {
            continue;
        }

        let reply = client.ask(&session_id, input).await?;
        println!("Bot: {}", format_response(&reply));
    }

    client.delete_session(&session_id).await;
    println!("Session {session_id} closed.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emphasis_becomes_bold() {
        let formatted = format_response("up ==15%== this week");
        assert_eq!(formatted, "up \x1b[1m15%\x1b[0m this week");
    }

    #[test]
    fn unpaired_markers_pass_through() {
        assert_eq!(format_response("a == b"), "a == b");
    }

    #[test]
    fn plain_text_is_unchanged() {
        assert_eq!(format_response("no markers"), "no markers");
    }
}
