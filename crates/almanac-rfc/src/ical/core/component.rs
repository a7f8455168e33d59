//! iCalendar component tree (RFC 5545 §3.4-3.6).

use super::ContentLine;

/// Component kind for the components this codec interprets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// VCALENDAR wrapper component.
    Calendar,
    /// VEVENT component.
    Event,
    /// VTIMEZONE component.
    Timezone,
    /// VALARM component (nested within VEVENT).
    Alarm,
    /// STANDARD sub-component of VTIMEZONE.
    Standard,
    /// DAYLIGHT sub-component of VTIMEZONE.
    Daylight,
    /// Any other component; carried but not interpreted.
    Unknown,
}

impl ComponentKind {
    /// Parses a component kind from a name (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "VCALENDAR" => Self::Calendar,
            "VEVENT" => Self::Event,
            "VTIMEZONE" => Self::Timezone,
            "VALARM" => Self::Alarm,
            "STANDARD" => Self::Standard,
            "DAYLIGHT" => Self::Daylight,
            _ => Self::Unknown,
        }
    }
}

/// One segmented component: its own content lines plus nested children.
///
/// The parser only segments the document; nothing in here is interpreted
/// yet. Each block can then be decoded independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub kind: ComponentKind,
    /// Original component name (preserved for unknown components).
    pub name: String,
    /// Content lines in order of appearance.
    pub lines: Vec<ContentLine>,
    /// Nested sub-components.
    pub children: Vec<Component>,
}

impl Component {
    /// Creates an empty component with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into().to_ascii_uppercase();
        Self {
            kind: ComponentKind::parse(&name),
            name,
            lines: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Returns the first content line with the given property name.
    #[must_use]
    pub fn get_line(&self, name: &str) -> Option<&ContentLine> {
        let name_upper = name.to_ascii_uppercase();
        self.lines.iter().find(|l| l.name == name_upper)
    }

    /// Returns children of a specific kind.
    pub fn children_of_kind(&self, kind: ComponentKind) -> impl Iterator<Item = &Component> {
        self.children.iter().filter(move |c| c.kind == kind)
    }

    /// Returns all VEVENT children.
    pub fn events(&self) -> impl Iterator<Item = &Component> {
        self.children_of_kind(ComponentKind::Event)
    }

    /// Returns all VTIMEZONE children.
    pub fn timezones(&self) -> impl Iterator<Item = &Component> {
        self.children_of_kind(ComponentKind::Timezone)
    }

    /// Returns all VALARM children.
    pub fn alarms(&self) -> impl Iterator<Item = &Component> {
        self.children_of_kind(ComponentKind::Alarm)
    }
}
