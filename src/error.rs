use thiserror::Error;

use crate::constants::ColumnType;

/// Error reported by the server through the transport.
///
/// Carried unchanged to the caller: `message`, SQLSTATE and the server error
/// code come straight from the wire.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("server error {code} ({sql_state}): {message}")]
pub struct ConnectionError {
  pub message: String,
  pub sql_state: String,
  pub code: u16,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
  /// Fatal to the current fetch; the transport connection is gone.
  #[error(transparent)]
  Connection(#[from] ConnectionError),

  /// A column maps to a type this library refuses to decode. Fatal to the
  /// current event: a guessed width would corrupt every later column offset
  /// in the same row.
  #[error("unsupported column type {0:?}")]
  UnsupportedType(ColumnType),

  /// A rows event referenced a table id with no table map in scope. Fatal to
  /// that event only; the stream continues.
  #[error("no table map announced for table id {table_id}")]
  UnresolvedSchema { table_id: u64 },

  /// The event buffer ended before the structure it declares.
  #[error("truncated event data: {0}")]
  Truncated(&'static str),

  /// The event declares something structurally impossible, like a column
  /// count disagreeing with the announced schema.
  #[error("malformed event data: {0}")]
  Malformed(&'static str),

  /// A packed temporal field unpacked to an impossible calendar value.
  #[error("invalid temporal value in {0}")]
  InvalidTemporal(&'static str),
}
