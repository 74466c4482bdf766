//! Interpreter for finale scripts: the scripted cutscene sequences played
//! between levels and at the end of episodes.
//!
//! A script is a whitespace-separated stream of commands. [`Interpreter`]
//! reads it one command at a time, tracks skip/goto state, drives the
//! animation and text widgets on its two [`page::Pages`], and reaches the rest
//! of the engine only through the [`FinaleHost`] trait.

pub mod command;
pub mod error;
pub mod events;
pub mod flow;
pub mod host;
pub mod interpreter;
pub mod operand;
pub mod page;
pub mod tokenizer;
pub mod widget;

pub use command::{find_command, CommandDescriptor, CommandId, Directive};
pub use error::{Result, ScriptError};
pub use events::{key_code, InputEvent};
pub use host::{FinaleHost, MobjSounds, NullHost, StateInfo};
pub use interpreter::{seconds_to_ticks, Interpreter, EVENT_GRACE_TICKS, TICRATE};
pub use operand::{Operand, ResourceUri};
pub use widget::{Widget, WidgetKind};
