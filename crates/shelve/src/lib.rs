pub mod actions;
pub mod block;
pub mod command;
pub mod config;
pub mod document;
pub mod error;
pub mod expr;
pub mod history;
pub mod pattern;
pub mod pipe;
pub mod rules;
pub mod services;
pub mod util;

pub use block::{Block, Command};
pub use command::{Argument, CommandDecl, CommandKind};
pub use config::{Config, Settings};
pub use document::{Document, Metadata};
pub use error::{Result, ShelveError};
pub use expr::{Content, Expression};
pub use history::{FileHistory, History, HistoryEntry, HistoryRecord};
pub use pattern::Pattern;
pub use pipe::{ItemId, Mode, Pipe, PipeItem};
pub use services::{CancelFlag, Services};
