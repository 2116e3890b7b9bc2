//! Typed commands against a profile store and their text rendering.

use serde::{Deserialize, Serialize};

use crate::index::{IndexEntry, SearchFilter};
use crate::profile::{NodeId, Profile, ProfileGraph};
use crate::storage::ProfilerStorage;

// ---------------------------------------------------------------------------
// Command / Response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Show a profile with its parent chain and children.
    Read { token: String },
    /// List index rows, newest first.
    Find {
        ip: Option<String>,
        url: Option<String>,
        method: Option<String>,
        limit: Option<usize>,
    },
    Write { profile: Profile },
    /// Store a profile given as a JSON blob.
    Import { blob: String },
    /// Print the JSON blob of one profile.
    Export { token: String },
    Purge,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Ok { output: String },
    Error { message: String },
}

impl Response {
    fn ok(output: impl Into<String>) -> Response {
        Response::Ok {
            output: output.into(),
        }
    }

    fn error(message: impl Into<String>) -> Response {
        Response::Error {
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Response::Ok { .. })
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Run `cmd` against `storage`. `default_limit` applies to `Find` without a limit.
pub fn execute(storage: &dyn ProfilerStorage, cmd: Command, default_limit: usize) -> Response {
    match cmd {
        Command::Read { token } => match storage.read(&token) {
            Ok(Some(graph)) => Response::ok(render_graph(&graph)),
            Ok(None) => Response::error(format!("profile not found: {}", token)),
            Err(e) => Response::error(e.to_string()),
        },
        Command::Find {
            ip,
            url,
            method,
            limit,
        } => {
            let filter = SearchFilter {
                ip,
                url,
                method,
                limit: limit.unwrap_or(default_limit),
            };
            match storage.find(&filter) {
                Ok(entries) => Response::ok(render_entries(&entries)),
                Err(e) => Response::error(e.to_string()),
            }
        }
        Command::Write { profile } => write_profile(storage, &profile),
        Command::Import { blob } => match serde_json::from_str::<Profile>(&blob) {
            Ok(profile) => write_profile(storage, &profile),
            Err(e) => Response::error(format!("invalid profile blob: {}", e)),
        },
        Command::Export { token } => match storage.read(&token) {
            Ok(Some(graph)) => match serde_json::to_string_pretty(graph.root_profile()) {
                Ok(json) => Response::ok(json),
                Err(e) => Response::error(format!("cannot encode profile: {}", e)),
            },
            Ok(None) => Response::error(format!("profile not found: {}", token)),
            Err(e) => Response::error(e.to_string()),
        },
        Command::Purge => match storage.purge() {
            Ok(()) => Response::ok("purged"),
            Err(e) => Response::error(e.to_string()),
        },
    }
}

fn write_profile(storage: &dyn ProfilerStorage, profile: &Profile) -> Response {
    match storage.try_write(profile) {
        Ok(()) => Response::ok(format!("wrote {}", profile.token())),
        Err(e) => Response::error(format!("failed to write {}: {}", profile.token(), e)),
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn summary(profile: &Profile) -> String {
    format!(
        "{}  {} {}  {}  {}",
        profile.token(),
        profile.method(),
        profile.url(),
        profile.ip(),
        profile.time()
    )
}

/// Ancestors above the read profile (marked `*`), descendants indented below.
pub fn render_graph(graph: &ProfileGraph) -> String {
    let mut lines = Vec::new();
    let mut chain = graph.ancestors(graph.root());
    chain.reverse();
    for (depth, id) in chain.iter().enumerate() {
        lines.push(format!("{}  {}", "  ".repeat(depth), summary(graph.profile(*id))));
    }
    let depth = chain.len();
    lines.push(format!("{}* {}", "  ".repeat(depth), summary(graph.root_profile())));
    render_children(graph, graph.root(), depth + 1, &mut lines);
    lines.join("\n")
}

fn render_children(graph: &ProfileGraph, id: NodeId, depth: usize, lines: &mut Vec<String>) {
    for child in graph.children(id) {
        lines.push(format!("{}  {}", "  ".repeat(depth), summary(graph.profile(*child))));
        render_children(graph, *child, depth + 1, lines);
    }
}

/// One tab-separated line per row; `-` for a missing parent.
pub fn render_entries(entries: &[IndexEntry]) -> String {
    if entries.is_empty() {
        return "no profiles found".into();
    }
    entries
        .iter()
        .map(|e| {
            format!(
                "{}\t{}\t{}\t{}\t{}\t{}",
                e.token,
                e.ip,
                e.method,
                e.url,
                e.time,
                e.parent.as_deref().unwrap_or("-")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
