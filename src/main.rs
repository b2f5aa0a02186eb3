//! # Chatbook CLI
//!
//! Usage:
//!   chatbook request.json -o transcript.pdf
//!   chatbook request.json --config render.json --media-dir ./media
//!   chatbook request.json --base-url https://files.example.com/media
//!   echo '{ ... }' | chatbook -o transcript.pdf
//!   chatbook --example > request.json
//!
//! Log verbosity follows `RUST_LOG`.

use std::env;
use std::fs;
use std::io::{self, Read};
use std::process;

use chatbook::config::RenderConfig;
use chatbook::hash::{fill_missing_hashes, DirectorySource};
use chatbook::model::GenerationRequest;
use tracing_subscriber::EnvFilter;

/// Value following a flag, e.g. `-o out.pdf`.
fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].clone())
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("✗ {}", message);
    process::exit(1);
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,chatbook=debug")),
        )
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--example") {
        print!("{}", example_request_json());
        return;
    }

    // Read input
    let input = if args.len() > 1 && !args[1].starts_with('-') {
        fs::read_to_string(&args[1])
            .unwrap_or_else(|e| fail(format!("Failed to read {}: {}", args[1], e)))
    } else {
        let mut buf = String::new();
        if let Err(e) = io::stdin().read_to_string(&mut buf) {
            fail(format!("Failed to read stdin: {}", e));
        }
        buf
    };

    let output_path = flag_value(&args, "-o").unwrap_or_else(|| "transcript.pdf".to_string());

    let mut config = match flag_value(&args, "--config") {
        Some(path) => RenderConfig::load(&path)
            .unwrap_or_else(|e| fail(format!("Failed to load config {}: {}", path, e))),
        None => RenderConfig::default(),
    };
    if let Some(base) = flag_value(&args, "--base-url") {
        config.media_base_url = Some(base);
    }

    let mut request: GenerationRequest = match serde_json::from_str(&input) {
        Ok(request) => request,
        Err(e) => fail(format!(
            "Failed to parse request: {}",
            chatbook::error::ChatbookError::from(e)
        )),
    };

    if let Some(dir) = flag_value(&args, "--media-dir") {
        let filled = fill_missing_hashes(&mut request.media, &DirectorySource::new(&dir));
        eprintln!("  Hashed {} media file(s) from {}", filled, dir);
    }

    match chatbook::render(&request, &config) {
        Ok(doc) => {
            if let Err(e) = fs::write(&output_path, &doc.bytes) {
                fail(format!("Failed to write {}: {}", output_path, e));
            }
            eprintln!(
                "✓ Written {} pages ({} bytes) to {}",
                doc.page_count,
                doc.bytes.len(),
                output_path
            );
            eprintln!("  SHA-256: {}", doc.sha256);
            if !doc.warnings.is_empty() {
                eprintln!("  {} warning(s):", doc.warnings.len());
                for warning in &doc.warnings {
                    match serde_json::to_string(warning) {
                        Ok(json) => eprintln!("    {}", json),
                        Err(_) => eprintln!("    {:?}", warning),
                    }
                }
            }
        }
        Err(e) => fail(format!("Failed to render transcript: {}", e)),
    }
}

fn example_request_json() -> &'static str {
    r##"{
  "metadata": {
    "title": "Chat with Bob",
    "participants": ["Alice", "Bob"],
    "sourceFileName": "WhatsApp Chat with Bob.zip",
    "sourceHash": "9f2c1e0b7d4a3c5e8f6a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f6a",
    "mediaSummary": "1 image, 1 voice note, 1 document",
    "generatedAt": "2025-03-04T12:00:00Z"
  },
  "messages": [
    {
      "id": 1,
      "timestamp": "2025-03-03 09:12",
      "sender": "Alice",
      "content": "Morning! Did you get the contract?"
    },
    {
      "id": 2,
      "timestamp": "2025-03-03 09:15",
      "sender": "Bob",
      "kind": "attachment",
      "mediaRef": "Contract v2.pdf"
    },
    {
      "id": 3,
      "timestamp": "2025-03-03 09:16",
      "sender": "Bob",
      "kind": "voice",
      "mediaRef": "PTT-20250303-WA0004.opus",
      "durationSeconds": 125
    },
    {
      "id": 4,
      "timestamp": "2025-03-04 18:40",
      "sender": "Alice",
      "kind": "image",
      "mediaRef": "IMG-20250304-WA0010.jpg"
    },
    {
      "id": 5,
      "timestamp": "2025-03-04 18:41",
      "sender": "Alice",
      "content": "Signed copy attached — see you Friday."
    }
  ],
  "media": [
    {
      "id": "m-002",
      "messageId": 2,
      "originalName": "Contract v2.pdf",
      "contentType": "application/pdf",
      "kind": "document"
    },
    {
      "id": "m-003",
      "messageId": 3,
      "originalName": "PTT-20250303-WA0004.opus",
      "contentType": "audio/ogg",
      "kind": "voice"
    },
    {
      "id": "m-004",
      "messageId": 4,
      "originalName": "IMG-20250304-WA0010.jpg",
      "contentType": "image/jpeg",
      "hash": "5d41402abc4b2a76b9719d911017c592aaf0c9a5f1e0b2c7d3e4f5a6b7c8d9e0",
      "kind": "image"
    }
  ]
}"##
}
