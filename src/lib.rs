//! Row-based replication client for MySQL and MariaDB binlogs: decodes the
//! event stream a transport fetches into typed events and row values.

mod buf_ext;
mod client;
mod column;
pub mod constants;
mod debug;
mod error;
mod event;
mod rows;
mod value;

pub use client::{RawEvent, ReplicationClient, ReplicationOptions, Transport};
pub use column::{ColumnDescriptor, TableSchema, TypeParams};
pub use constants::{BinlogDumpFlags, BinlogEventType, ColumnType, RowsEventFlags};
pub use error::{ConnectionError, Error};
pub use event::{
  EventHeader, FormatDescriptionEvent, GenericEvent, ReplicationEvent, RotateEvent, RowsEvent, TableMapEvent,
  TableMapRegistry, UpdateRowsEvent,
};
pub use rows::Row;
pub use value::RowValue;
