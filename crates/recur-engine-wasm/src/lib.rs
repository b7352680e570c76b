//! WASM bindings for recur-engine.
//!
//! Exposes RRULE expansion, schedule evaluation, rule normalization and
//! duration conversion to JavaScript via `wasm-bindgen`. Complex values cross
//! the boundary as JSON strings; instants are `YYYY-MM-DDTHH:MM:SS` strings.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p recur-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target nodejs --out-dir packages/recur-engine-js/wasm/ \
//!   target/wasm32-unknown-unknown/release/recur_engine_wasm.wasm
//! ```

use recur_engine::{CalendarEntity, Duration, ExpansionWindow, RecurrenceRule, RuleBook};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

const INSTANT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// ---------------------------------------------------------------------------
// JSON shapes crossing the WASM boundary
// ---------------------------------------------------------------------------

/// Input for `expandSchedule`.
#[derive(Deserialize)]
struct ScheduleInput {
    start: String,
    #[serde(default)]
    from: Option<String>,
    to: String,
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    duration: Option<String>,
}

#[derive(Serialize)]
struct OccurrenceDto {
    start: String,
    end: String,
}

// ---------------------------------------------------------------------------
// Native implementations (testable without a JS host)
// ---------------------------------------------------------------------------

fn expand_rule_json(rrule: &str, start: &str, from: &str, to: &str) -> Result<String, String> {
    let instants =
        recur_engine::expand_rule_text(rrule, start, from, to).map_err(|e| e.to_string())?;
    let rendered: Vec<String> = instants
        .iter()
        .map(|t| t.format(INSTANT_FORMAT).to_string())
        .collect();
    serde_json::to_string(&rendered).map_err(|e| format!("Serialization error: {}", e))
}

fn expand_schedule_json(input_json: &str) -> Result<String, String> {
    let input: ScheduleInput =
        serde_json::from_str(input_json).map_err(|e| format!("Invalid schedule JSON: {}", e))?;

    let start = recur_engine::parse_instant(&input.start).map_err(|e| e.to_string())?;
    let from = match input.from.as_deref() {
        Some(text) => recur_engine::parse_instant(text).map_err(|e| e.to_string())?,
        None => start,
    };
    let to = recur_engine::parse_instant(&input.to).map_err(|e| e.to_string())?;
    let window = ExpansionWindow::new(from, to).map_err(|e| e.to_string())?;

    let mut book = RuleBook::new();
    let mut entity = CalendarEntity::event(start);
    for text in &input.include {
        entity = entity.include(book.insert(parse_rule(text)?));
    }
    for text in &input.exclude {
        entity = entity.exclude(book.insert(parse_rule(text)?));
    }
    if let Some(text) = input.duration.as_deref() {
        let duration = text.parse::<Duration>().map_err(|e| e.to_string())?;
        entity = entity.with_duration(duration).map_err(|e| e.to_string())?;
    }

    let dtos: Vec<OccurrenceDto> = entity
        .occurrences(&book, window)
        .map_err(|e| e.to_string())?
        .iter()
        .map(|o| OccurrenceDto {
            start: o.start.format(INSTANT_FORMAT).to_string(),
            end: o.end.format(INSTANT_FORMAT).to_string(),
        })
        .collect();
    serde_json::to_string(&dtos).map_err(|e| format!("Serialization error: {}", e))
}

fn normalize(rrule: &str) -> Result<String, String> {
    parse_rule(rrule).map(|rule| rule.to_string())
}

fn parse_rule(text: &str) -> Result<RecurrenceRule, String> {
    text.parse::<RecurrenceRule>().map_err(|e| e.to_string())
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Expand an RRULE into the instants that fall inside `[from, to]`.
///
/// Returns a JSON array of instant strings.
///
/// # Arguments
/// - `rrule` -- RRULE value (e.g., "FREQ=WEEKLY;BYDAY=TU,TH")
/// - `start` -- first instant of the series (e.g., "2026-02-17T14:00:00")
/// - `from`, `to` -- inclusive expansion window
#[wasm_bindgen(js_name = "expandRule")]
pub fn expand_rule(rrule: &str, start: &str, from: &str, to: &str) -> Result<String, JsValue> {
    expand_rule_json(rrule, start, from, to).map_err(|e| JsValue::from_str(&e))
}

/// Evaluate a start instant with inclusion and exclusion rules.
///
/// `input_json` is an object `{start, to, from?, include?, exclude?, duration?}`.
/// Returns a JSON array of `{start, end}` objects.
#[wasm_bindgen(js_name = "expandSchedule")]
pub fn expand_schedule(input_json: &str) -> Result<String, JsValue> {
    expand_schedule_json(input_json).map_err(|e| JsValue::from_str(&e))
}

/// Convert an ISO 8601 duration into a number of `unit`s
/// (`week`, `day`, `hour`, `minute` or `second`).
#[wasm_bindgen(js_name = "durationTo")]
pub fn duration_to(text: &str, unit: &str) -> Result<f64, JsValue> {
    recur_engine::duration_to(text, unit).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Validate an RRULE and return its canonical text.
#[wasm_bindgen(js_name = "normalizeRule")]
pub fn normalize_rule(rrule: &str) -> Result<String, JsValue> {
    normalize(rrule).map_err(|e| JsValue::from_str(&e))
}
