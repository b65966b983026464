#![forbid(unsafe_code)]

//! UI events and the event-map key syntax.
//!
//! An event-map key is `"<kind> <selector>"`, e.g. `"click .item"` or
//! `"input input"`. A key with no selector (`"click"`) matches every target.
//! Selector resolution belongs to the view layer: it reports the selector of
//! the element that fired, and matching here is exact string equality.

use std::fmt;
use std::str::FromStr;

use lumen_store::RecordId;

use crate::error::ViewError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    Input,
    Focus,
    Blur,
    Change,
    KeyDown,
}

impl EventKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Input => "input",
            Self::Focus => "focus",
            Self::Blur => "blur",
            Self::Change => "change",
            Self::KeyDown => "keydown",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "click" => Ok(Self::Click),
            "input" => Ok(Self::Input),
            "focus" => Ok(Self::Focus),
            "blur" => Ok(Self::Blur),
            "change" => Ok(Self::Change),
            "keydown" => Ok(Self::KeyDown),
            other => Err(ViewError::InvalidEventSpec {
                spec: other.to_string(),
                reason: "unknown event kind".to_string(),
            }),
        }
    }
}

/// A parsed event-map key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBinding {
    pub kind: EventKind,
    /// `None` matches any target.
    pub selector: Option<String>,
}

impl EventBinding {
    #[must_use]
    pub fn new(kind: EventKind, selector: impl Into<String>) -> Self {
        Self {
            kind,
            selector: Some(selector.into()),
        }
    }

    /// Parse an event-map key such as `"click .item"`.
    ///
    /// # Errors
    ///
    /// [`ViewError::InvalidEventSpec`] for an empty key or unknown kind.
    pub fn parse(spec: &str) -> Result<Self, ViewError> {
        let trimmed = spec.trim();
        let (kind, selector) = match trimmed.split_once(char::is_whitespace) {
            Some((kind, selector)) => (kind, Some(selector.trim())),
            None => (trimmed, None),
        };
        if kind.is_empty() {
            return Err(ViewError::InvalidEventSpec {
                spec: spec.to_string(),
                reason: "missing event kind".to_string(),
            });
        }
        let kind = kind.parse::<EventKind>().map_err(|_| ViewError::InvalidEventSpec {
            spec: spec.to_string(),
            reason: format!("unknown event kind `{kind}`"),
        })?;
        Ok(Self {
            kind,
            selector: selector.filter(|s| !s.is_empty()).map(str::to_string),
        })
    }

    #[must_use]
    pub fn matches(&self, event: &UiEvent) -> bool {
        self.kind == event.kind
            && self
                .selector
                .as_deref()
                .is_none_or(|selector| selector == event.selector)
    }
}

/// A UI event as reported by the view layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiEvent {
    pub kind: EventKind,
    /// Selector of the element that fired.
    pub selector: String,
    /// Record of the template instance containing that element.
    pub record: Option<RecordId>,
    /// Current value of the element, for inputs.
    pub value: Option<String>,
}

impl UiEvent {
    #[must_use]
    pub fn new(kind: EventKind, selector: impl Into<String>) -> Self {
        Self {
            kind,
            selector: selector.into(),
            record: None,
            value: None,
        }
    }

    #[must_use]
    pub fn click(selector: impl Into<String>, record: RecordId) -> Self {
        Self::new(EventKind::Click, selector).on(record)
    }

    #[must_use]
    pub fn focus(selector: impl Into<String>, record: RecordId) -> Self {
        Self::new(EventKind::Focus, selector).on(record)
    }

    #[must_use]
    pub fn input(selector: impl Into<String>, record: RecordId, value: impl Into<String>) -> Self {
        Self::new(EventKind::Input, selector)
            .on(record)
            .with_value(value)
    }

    /// Attach the record context.
    #[must_use]
    pub fn on(mut self, record: RecordId) -> Self {
        self.record = Some(record);
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// The element value.
    ///
    /// # Errors
    ///
    /// [`ViewError::MissingEventValue`] if the event carries none.
    pub fn require_value(&self) -> Result<&str, ViewError> {
        self.value
            .as_deref()
            .ok_or(ViewError::MissingEventValue { kind: self.kind })
    }
}

/// What an event handler sees besides the store and the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventContext {
    pub kind: EventKind,
    /// Record of the template instance the event fired in.
    pub record: Option<RecordId>,
}

impl EventContext {
    #[must_use]
    pub fn from_event(event: &UiEvent) -> Self {
        Self {
            kind: event.kind,
            record: event.record,
        }
    }

    /// The record context.
    ///
    /// # Errors
    ///
    /// [`ViewError::MissingRecord`] if the event fired outside any record
    /// instance.
    pub fn require_record(&self) -> Result<RecordId, ViewError> {
        self.record
            .ok_or(ViewError::MissingRecord { kind: self.kind })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_kind_and_selector() {
        let b = EventBinding::parse("click .item").unwrap();
        assert_eq!(b.kind, EventKind::Click);
        assert_eq!(b.selector.as_deref(), Some(".item"));

        let b = EventBinding::parse("  input   input ").unwrap();
        assert_eq!(b.kind, EventKind::Input);
        assert_eq!(b.selector.as_deref(), Some("input"));
    }

    #[test]
    fn parse_without_selector_matches_any() {
        let b = EventBinding::parse("focus").unwrap();
        assert_eq!(b.selector, None);
        assert!(b.matches(&UiEvent::new(EventKind::Focus, "anything")));
        assert!(!b.matches(&UiEvent::new(EventKind::Blur, "anything")));
    }

    #[test]
    fn parse_rejects_bad_specs() {
        assert!(matches!(
            EventBinding::parse("   "),
            Err(ViewError::InvalidEventSpec { .. })
        ));
        assert!(matches!(
            EventBinding::parse("hover .item"),
            Err(ViewError::InvalidEventSpec { .. })
        ));
    }

    #[test]
    fn matching_is_exact() {
        let b = EventBinding::new(EventKind::Click, ".item");
        assert!(b.matches(&UiEvent::click(".item", RecordId::new(0))));
        assert!(!b.matches(&UiEvent::click(".items", RecordId::new(0))));
        assert!(!b.matches(&UiEvent::focus(".item", RecordId::new(0))));
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [
            EventKind::Click,
            EventKind::Input,
            EventKind::Focus,
            EventKind::Blur,
            EventKind::Change,
            EventKind::KeyDown,
        ] {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
    }

    #[test]
    fn context_requirements() {
        let ev = UiEvent::new(EventKind::Input, "input");
        let ctx = EventContext::from_event(&ev);
        assert_eq!(
            ctx.require_record(),
            Err(ViewError::MissingRecord {
                kind: EventKind::Input
            })
        );
        assert_eq!(
            ev.require_value(),
            Err(ViewError::MissingEventValue {
                kind: EventKind::Input
            })
        );

        let ev = UiEvent::input("input", RecordId::new(1), "Bob");
        assert_eq!(
            EventContext::from_event(&ev).require_record(),
            Ok(RecordId::new(1))
        );
        assert_eq!(ev.require_value(), Ok("Bob"));
    }
}
