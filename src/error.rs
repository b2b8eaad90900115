use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a whole run before any host is contacted.
///
/// Failures on individual hosts are never reported through this type; they
/// end up as a [`Status`](crate::Status) in the [`Report`](crate::Report) of
/// that host instead.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The input file that should be fed to every host cannot be opened
    #[error("Cannot read input file `{}`: {1}", .0.display())]
    InputFile(PathBuf, std::io::Error),
    /// No remote command was given
    #[error("No command given")]
    MissingCommand,
    /// A host name is empty
    #[error("Empty host name at position {0}")]
    EmptyHost(usize),
    /// The configuration could not be assembled
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// The runtime for a blocking run could not be created
    #[error("Cannot start runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl PartialEq for ErrorKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InputFile(p1, e1), Self::InputFile(p2, e2)) => p1 == p2 && e1.kind() == e2.kind(),
            (Self::MissingCommand, Self::MissingCommand) => true,
            (Self::EmptyHost(i1), Self::EmptyHost(i2)) => i1 == i2,
            (Self::InvalidConfig(s1), Self::InvalidConfig(s2)) => s1 == s2,
            (Self::Runtime(e1), Self::Runtime(e2)) => e1.kind() == e2.kind(),
            _ => false,
        }
    }
}

/// The result type used throughout the library
pub type Result<T> = std::result::Result<T, ErrorKind>;
