#![forbid(unsafe_code)]

//! Scripted UI steps for replaying a session from the command line.
//!
//! ```text
//! click:<id>          click the item
//! focus:<id>          focus the item's name input
//! input:<id>=<text>   type <text> into the item's name input
//! reconnect           drop and recreate the client session
//! ```

use std::fmt;
use std::str::FromStr;

use lumen_store::RecordId;
use lumen_view::UiEvent;

use crate::error::DemoError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    Click(RecordId),
    Focus(RecordId),
    Input(RecordId, String),
    Reconnect,
}

impl ScriptStep {
    /// The UI event this step fires. `None` for session-level steps.
    #[must_use]
    pub fn to_event(&self) -> Option<UiEvent> {
        match self {
            Self::Click(id) => Some(UiEvent::click(".item", *id)),
            Self::Focus(id) => Some(UiEvent::focus("input", *id)),
            Self::Input(id, text) => Some(UiEvent::input("input", *id, text.as_str())),
            Self::Reconnect => None,
        }
    }
}

impl fmt::Display for ScriptStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Click(id) => write!(f, "click:{id}"),
            Self::Focus(id) => write!(f, "focus:{id}"),
            Self::Input(id, text) => write!(f, "input:{id}={text}"),
            Self::Reconnect => write!(f, "reconnect"),
        }
    }
}

fn parse_id(step: &str, raw: &str) -> Result<RecordId, DemoError> {
    raw.trim()
        .parse::<u64>()
        .map(RecordId::new)
        .map_err(|_| DemoError::invalid_step(step, format!("`{raw}` is not a record id")))
}

impl FromStr for ScriptStep {
    type Err = DemoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "reconnect" {
            return Ok(Self::Reconnect);
        }
        let (verb, rest) = s
            .split_once(':')
            .ok_or_else(|| DemoError::invalid_step(s, "expected <verb>:<id>"))?;
        match verb {
            "click" => Ok(Self::Click(parse_id(s, rest)?)),
            "focus" => Ok(Self::Focus(parse_id(s, rest)?)),
            "input" => {
                let (id, text) = rest
                    .split_once('=')
                    .ok_or_else(|| DemoError::invalid_step(s, "expected input:<id>=<text>"))?;
                Ok(Self::Input(parse_id(s, id)?, text.to_string()))
            }
            other => Err(DemoError::invalid_step(s, format!("unknown verb `{other}`"))),
        }
    }
}
