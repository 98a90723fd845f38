//! Stage identifiers and the hook points derived from them.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::error::StackError;

/// A named point in the boot sequence.
///
/// The built-in variants run in [`Stage::SEQUENCE`] order on every boot.
/// Hooks registered with `use_before`/`use_after` run as [`Stage::Named`]
/// sub-stages carrying their label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Configuration may still be overridden.
    Config,
    /// Cookie parsing.
    Cookie,
    /// Session handling.
    Session,
    /// Static file serving.
    Static,
    /// Request access logging.
    Logging,
    /// Feature experiments.
    Experiments,
    /// Request body parsing limits.
    BodyParsing,
    /// HTTP method override.
    Override,
    /// Response compression.
    Compression,
    /// Route mounting.
    Routing,
    /// Last stage before the listener may open.
    End,
    /// A hook-contributed stage.
    Named(String),
}

impl Stage {
    /// The built-in stages in boot order.
    pub const SEQUENCE: [Stage; 11] = [
        Stage::Config,
        Stage::Cookie,
        Stage::Session,
        Stage::Static,
        Stage::Logging,
        Stage::Experiments,
        Stage::BodyParsing,
        Stage::Override,
        Stage::Compression,
        Stage::Routing,
        Stage::End,
    ];

    /// Maps a label to its stage. Built-in names resolve to their variant.
    pub fn named(label: impl Into<String>) -> Self {
        let label = label.into();
        match label.as_str() {
            "config" => Self::Config,
            "cookie" => Self::Cookie,
            "session" => Self::Session,
            "static" => Self::Static,
            "logging" => Self::Logging,
            "experiments" => Self::Experiments,
            "body-parsing" => Self::BodyParsing,
            "override" => Self::Override,
            "compression" => Self::Compression,
            "routing" => Self::Routing,
            "end" => Self::End,
            _ => Self::Named(label),
        }
    }

    /// Returns the string name of this stage.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Config => "config",
            Self::Cookie => "cookie",
            Self::Session => "session",
            Self::Static => "static",
            Self::Logging => "logging",
            Self::Experiments => "experiments",
            Self::BodyParsing => "body-parsing",
            Self::Override => "override",
            Self::Compression => "compression",
            Self::Routing => "routing",
            Self::End => "end",
            Self::Named(label) => label,
        }
    }

    /// Returns whether this stage is part of the fixed boot sequence.
    pub fn is_builtin(&self) -> bool {
        !matches!(self, Self::Named(_))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::named(s))
    }
}

impl From<&str> for Stage {
    fn from(label: &str) -> Self {
        Self::named(label)
    }
}

/// Which side of a stage a hook point sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Before the stage handler runs.
    Before,
    /// After the stage handler returned.
    After,
}

impl Phase {
    /// The hook point for this phase of `stage`.
    pub fn of(self, stage: Stage) -> HookPoint {
        match self {
            Self::Before => HookPoint::Before(stage),
            Self::After => HookPoint::After(stage),
        }
    }
}

/// An event name subscribers can bind to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// `before`: fired ahead of every stage.
    BeforeAll,
    /// `before.<stage>`.
    Before(Stage),
    /// `after.<stage>`.
    After(Stage),
    /// `after`: fired behind every stage.
    AfterAll,
}

impl HookPoint {
    /// Returns the phase of this hook point.
    pub fn phase(&self) -> Phase {
        match self {
            Self::BeforeAll | Self::Before(_) => Phase::Before,
            Self::After(_) | Self::AfterAll => Phase::After,
        }
    }

    /// Returns the stage this hook point is bound to, if any.
    pub fn stage(&self) -> Option<&Stage> {
        match self {
            Self::Before(stage) | Self::After(stage) => Some(stage),
            Self::BeforeAll | Self::AfterAll => None,
        }
    }

    /// Returns whether this fires for every stage.
    pub fn is_global(&self) -> bool {
        self.stage().is_none()
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeforeAll => f.write_str("before"),
            Self::Before(stage) => write!(f, "before.{stage}"),
            Self::After(stage) => write!(f, "after.{stage}"),
            Self::AfterAll => f.write_str("after"),
        }
    }
}

impl FromStr for HookPoint {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" => return Ok(Self::BeforeAll),
            "after" => return Ok(Self::AfterAll),
            _ => {}
        }

        let (phase, stage) = s
            .split_once('.')
            .ok_or_else(|| StackError::InvalidEvent(s.to_string()))?;

        if stage.is_empty() {
            return Err(StackError::InvalidEvent(s.to_string()));
        }

        match phase {
            "before" => Ok(Self::Before(Stage::named(stage))),
            "after" => Ok(Self::After(Stage::named(stage))),
            _ => Err(StackError::InvalidEvent(s.to_string())),
        }
    }
}

/// Payload handed to every subscriber next to the live [`Stack`](crate::Stack).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageEvent {
    /// The hook point being delivered.
    pub point: HookPoint,
    /// The stage being bracketed.
    pub stage: Stage,
    /// Ordinal of the stage within this boot.
    pub ordinal: u32,
}

impl StageEvent {
    /// Creates a new stage event.
    pub fn new(point: HookPoint, stage: Stage, ordinal: u32) -> Self {
        Self {
            point,
            stage,
            ordinal,
        }
    }
}
