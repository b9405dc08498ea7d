// =============================================================================
// Session commands — browser requests mapped onto dashboard transitions
// =============================================================================
//
// Shared by `POST /api/v1/session` and text frames on `/api/v1/ws`. Codes
// arrive as plain strings so unknown values produce a readable error rather
// than a generic deserialisation failure.
// =============================================================================

use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::dashboard::{SessionState, Transition};
use crate::types::{find_symbol, ChartType, Indicator, SymbolInfo, Timeframe};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown symbol `{0}`")]
    UnknownSymbol(String),
    #[error("unknown timeframe `{0}`")]
    UnknownTimeframe(String),
    #[error("unknown chart type `{0}`")]
    UnknownChartType(String),
    #[error("unknown indicator `{0}`")]
    UnknownIndicator(String),
    #[error("malformed command: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TransitionRequest {
    SelectSymbol {
        symbol: String,
    },
    SelectTimeframe {
        timeframe: String,
    },
    SetChartType {
        chart_type: String,
    },
    ToggleOverlay {
        indicator: String,
    },
    ToggleSubchart {
        indicator: String,
    },
    Replace {
        symbol: String,
        timeframe: String,
        chart_type: String,
        #[serde(default)]
        overlays: Vec<String>,
        #[serde(default)]
        subcharts: Vec<String>,
    },
}

impl TransitionRequest {
    /// Parse a raw JSON command, as received over the socket.
    pub fn from_json(text: &str) -> Result<Self, CommandError> {
        serde_json::from_str(text).map_err(|e| CommandError::Malformed(e.to_string()))
    }

    pub fn into_transition(self) -> Result<Transition, CommandError> {
        Ok(match self {
            Self::SelectSymbol { symbol } => Transition::SelectSymbol(symbol_of(&symbol)?),
            Self::SelectTimeframe { timeframe } => {
                Transition::SelectTimeframe(timeframe_of(&timeframe)?)
            }
            Self::SetChartType { chart_type } => {
                Transition::SetChartType(chart_type_of(&chart_type)?)
            }
            Self::ToggleOverlay { indicator } => Transition::ToggleOverlay(indicator_of(&indicator)?),
            Self::ToggleSubchart { indicator } => {
                Transition::ToggleSubchart(indicator_of(&indicator)?)
            }
            Self::Replace {
                symbol,
                timeframe,
                chart_type,
                overlays,
                subcharts,
            } => Transition::Replace(SessionState {
                symbol: symbol_of(&symbol)?,
                timeframe: timeframe_of(&timeframe)?,
                chart_type: chart_type_of(&chart_type)?,
                overlays: indicators_of(&overlays)?,
                subcharts: indicators_of(&subcharts)?,
            }),
        })
    }
}

fn symbol_of(code: &str) -> Result<SymbolInfo, CommandError> {
    find_symbol(code).ok_or_else(|| CommandError::UnknownSymbol(code.to_string()))
}

fn timeframe_of(code: &str) -> Result<Timeframe, CommandError> {
    Timeframe::from_code(code).ok_or_else(|| CommandError::UnknownTimeframe(code.to_string()))
}

/// Decode a bare string through the type's serde representation.
fn serde_code<T: DeserializeOwned>(code: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(code.trim().to_string())).ok()
}

fn chart_type_of(code: &str) -> Result<ChartType, CommandError> {
    serde_code(code).ok_or_else(|| CommandError::UnknownChartType(code.to_string()))
}

fn indicator_of(code: &str) -> Result<Indicator, CommandError> {
    serde_code(&code.to_uppercase()).ok_or_else(|| CommandError::UnknownIndicator(code.to_string()))
}

fn indicators_of(codes: &[String]) -> Result<BTreeSet<Indicator>, CommandError> {
    codes.iter().map(|c| indicator_of(c)).collect()
}
