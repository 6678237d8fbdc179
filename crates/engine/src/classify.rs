// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Classification of the agent's stdout into typed messages.
//!
//! The agent CLI emits one JSON event per line (`--output-format
//! stream-json`), interleaved with free-form text from wrappers and shells.
//! Each non-empty line becomes exactly one [`AgentMessage`]; lines that are
//! not JSON objects become [`AgentMessage::Log`].

use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use sw_core::{ellipsize, short};

/// Longest text, tool-result, and unknown-event preview in log lines.
const PREVIEW_CHARS: usize = 200;

/// Longest thinking preview in log lines.
const THINKING_CHARS: usize = 100;

/// Longest tool-input summary.
const TOOL_SUMMARY_CHARS: usize = 100;

/// One classified line of agent output.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentMessage {
    Assistant { blocks: Vec<ContentBlock> },
    User { results: Vec<ToolResult> },
    Result(RunResult),
    System { subtype: String },
    Error { message: String },
    /// A JSON event with an unrecognized `type`.
    Unknown { kind: String, raw: String },
    /// Free-form text that is not a JSON object.
    Log(String),
}

/// Assistant content block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Text(String),
    ToolUse { name: String, summary: String },
    Thinking(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub is_error: bool,
    /// Single-line preview with newlines escaped.
    pub preview: String,
}

/// Terminal `result` event of an agent run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub success: bool,
    pub cost_usd: Option<f64>,
    pub turns: Option<u32>,
    pub text: Option<String>,
}

impl AgentMessage {
    /// Non-empty text blocks, in order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        let blocks = match self {
            AgentMessage::Assistant { blocks } => blocks.as_slice(),
            _ => &[][..],
        };
        blocks.iter().filter_map(|b| match b {
            ContentBlock::Text(t) if !t.trim().is_empty() => Some(t.as_str()),
            _ => None,
        })
    }

    /// Number of tool calls in this message.
    pub fn tool_calls(&self) -> usize {
        match self {
            AgentMessage::Assistant { blocks } => {
                blocks.iter().filter(|b| matches!(b, ContentBlock::ToolUse { .. })).count()
            }
            _ => 0,
        }
    }

    /// Human-readable activity lines for the job log.
    ///
    /// Always at least one line per message.
    pub fn log_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        match self {
            AgentMessage::Assistant { blocks } => {
                lines.extend(blocks.iter().filter_map(ContentBlock::log_line));
                if lines.is_empty() {
                    lines.push("[assistant] (no content)".to_string());
                }
            }
            AgentMessage::User { results } => {
                for r in results {
                    let tag = if r.is_error { "tool_error" } else { "tool_result" };
                    lines.push(format!("[{}] {}", tag, r.preview));
                }
                if lines.is_empty() {
                    lines.push("[user]".to_string());
                }
            }
            AgentMessage::Result(r) => lines.push(r.to_string()),
            AgentMessage::System { subtype } => lines.push(format!("[system:{}]", subtype)),
            AgentMessage::Error { message } => lines.push(format!("[error] {}", message)),
            AgentMessage::Unknown { kind, raw } => {
                lines.push(format!("[{}] {}", kind, short(raw, PREVIEW_CHARS)))
            }
            AgentMessage::Log(text) => lines.push(format!("[sandbox] {}", text)),
        }
        lines
    }
}

impl ContentBlock {
    fn log_line(&self) -> Option<String> {
        match self {
            ContentBlock::Text(t) if t.trim().is_empty() => None,
            ContentBlock::Text(t) => Some(format!("[assistant] {}", short(t, PREVIEW_CHARS))),
            ContentBlock::ToolUse { name, summary } => Some(format!("[tool_call] {}({})", name, summary)),
            ContentBlock::Thinking(t) => Some(format!("[thinking] {}...", short(t, THINKING_CHARS))),
        }
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.success { "SUCCESS" } else { "ERROR" };
        let cost = self.cost_usd.map(|c| c.to_string()).unwrap_or_else(|| "?".to_string());
        let turns = self.turns.map(|t| t.to_string()).unwrap_or_else(|| "?".to_string());
        write!(f, "[result] {} | Cost: ${} | Turns: {}", status, cost, turns)
    }
}

// Raw wire shapes. Every field is optional; unknown fields are ignored.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: Option<String>,
    subtype: Option<String>,
    message: Option<Value>,
    result: Option<Value>,
    is_error: bool,
    total_cost_usd: Option<f64>,
    cost_usd: Option<f64>,
    num_turns: Option<u32>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: Value,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    ToolResult {
        #[serde(default)]
        content: Value,
        #[serde(default)]
        is_error: bool,
    },
    #[serde(other)]
    Other,
}

/// Classify one line of agent stdout. `None` for blank lines.
pub fn classify_line(line: &str) -> Option<AgentMessage> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some((object, raw)) = parse_object(line) else {
        return Some(AgentMessage::Log(line.to_string()));
    };
    Some(classify_value(object, raw))
}

/// Decode the whole line, then the part from the first `{`. Returns the
/// object and the source text it was decoded from.
fn parse_object(line: &str) -> Option<(Value, &str)> {
    if let Ok(v @ Value::Object(_)) = serde_json::from_str::<Value>(line) {
        return Some((v, line));
    }
    let start = line.find('{').filter(|&i| i > 0)?;
    match serde_json::from_str::<Value>(&line[start..]) {
        Ok(v @ Value::Object(_)) => Some((v, &line[start..])),
        _ => None,
    }
}

fn classify_value(value: Value, raw: &str) -> AgentMessage {
    let raw_text = raw.to_string();
    let event: RawEvent = match serde_json::from_value(value) {
        Ok(event) => event,
        Err(_) => return AgentMessage::Unknown { kind: "unknown".to_string(), raw: raw_text },
    };

    match event.event_type.as_deref() {
        Some("assistant") => AgentMessage::Assistant {
            blocks: content_blocks(event.message.as_ref())
                .into_iter()
                .filter_map(|b| match b {
                    RawBlock::Text { text } => Some(ContentBlock::Text(text)),
                    RawBlock::ToolUse { name, input } => {
                        let summary = summarize_tool_input(&name, &input);
                        Some(ContentBlock::ToolUse { name, summary })
                    }
                    RawBlock::Thinking { thinking } => Some(ContentBlock::Thinking(thinking)),
                    RawBlock::ToolResult { .. } | RawBlock::Other => None,
                })
                .collect(),
        },
        Some("user") => AgentMessage::User {
            results: content_blocks(event.message.as_ref())
                .into_iter()
                .filter_map(|b| match b {
                    RawBlock::ToolResult { content, is_error } => {
                        Some(ToolResult { is_error, preview: result_preview(&content) })
                    }
                    _ => None,
                })
                .collect(),
        },
        Some("result") => AgentMessage::Result(RunResult {
            success: !event.is_error,
            cost_usd: event.total_cost_usd.or(event.cost_usd),
            turns: event.num_turns,
            text: event.result.as_ref().and_then(Value::as_str).map(str::to_string),
        }),
        Some("system") => {
            AgentMessage::System { subtype: event.subtype.unwrap_or_else(|| "unknown".to_string()) }
        }
        Some("error") => AgentMessage::Error { message: error_message(&event, &raw_text) },
        Some(kind) => AgentMessage::Unknown { kind: kind.to_string(), raw: raw_text },
        None => AgentMessage::Unknown { kind: "unknown".to_string(), raw: raw_text },
    }
}

/// Blocks of `message.content`; a string or malformed content has none.
fn content_blocks(message: Option<&Value>) -> Vec<RawBlock> {
    let Some(Value::Array(items)) = message.and_then(|m| m.get("content")) else {
        return Vec::new();
    };
    items.iter().filter_map(|item| RawBlock::deserialize(item).ok()).collect()
}

fn result_preview(content: &Value) -> String {
    let text = match content {
        Value::String(s) => s.clone(),
        Value::Array(parts) => {
            let texts: Vec<&str> =
                parts.iter().filter_map(|p| p.get("text").and_then(Value::as_str)).collect();
            if texts.is_empty() {
                content.to_string()
            } else {
                texts.join(" ")
            }
        }
        Value::Null => String::new(),
        other => other.to_string(),
    };
    short(&text, PREVIEW_CHARS).replace('\n', "\\n")
}

fn error_message(event: &RawEvent, raw: &str) -> String {
    let candidates = [event.message.as_ref(), event.error.as_ref()];
    for value in candidates.into_iter().flatten() {
        match value {
            Value::String(s) => return s.clone(),
            Value::Object(o) => {
                if let Some(s) = o.get("message").and_then(Value::as_str) {
                    return s.to_string();
                }
            }
            _ => {}
        }
    }
    short(raw, PREVIEW_CHARS).to_string()
}

/// One-line summary of a tool call's input.
pub fn summarize_tool_input(name: &str, input: &Value) -> String {
    let field = |key: &str| input.get(key).and_then(Value::as_str).unwrap_or("");
    match name {
        "Bash" => ellipsize(field("command"), TOOL_SUMMARY_CHARS),
        "Read" | "Edit" => field("file_path").to_string(),
        "Write" => format!("{} ({} chars)", field("file_path"), field("content").chars().count()),
        "Glob" => field("pattern").to_string(),
        "Grep" => match input.get("path").and_then(Value::as_str) {
            Some(path) => format!("'{}' in {}", field("pattern"), path),
            None => format!("'{}'", field("pattern")),
        },
        _ => ellipsize(&input.to_string(), TOOL_SUMMARY_CHARS),
    }
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
