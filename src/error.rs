//! # Error Handling
//!
//! This module defines the centralized error type for the deployer library.
//! It uses `thiserror` to build an `Error` enum whose variants map to the
//! failure families the sync pass has to tell apart:
//!
//! - Configuration errors (unparseable site files, unknown processor types,
//!   missing collaborators). These are raised while a pipeline is being
//!   built and are never retried.
//! - Repository errors (clone, pull, diff). These are scoped to one site and
//!   are logged by the engine before it moves to the next site.
//! - Processor errors (index service failures, HTTP calls, commands, mail). These
//!   are scoped to one processor and are logged by the pipeline before it
//!   moves to the next processor.
//! - Document errors (XML parsing, selectors). Inside an indexing batch these
//!   are scoped to one file.
//!
//! The `Result` type alias is used to return `Result<T, Error>` from every
//! fallible library function.

use thiserror::Error;

/// Main error type for deployer operations
#[derive(Error, Debug)]
pub enum Error {
    /// A site configuration file or processor definition could not be parsed.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// The pipeline was wired in a way that can never work, such as an
    /// indexing processor without an index service.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Cloning the remote repository into the local working copy failed.
    #[error("Git clone error for {url} into {path}: {message}")]
    GitClone {
        url: String,
        path: String,
        message: String,
    },

    /// A git command against a local working copy failed.
    #[error("Git command failed in {path}: {command} - {stderr}")]
    GitCommand {
        command: String,
        path: String,
        stderr: String,
    },

    /// A processor failed in a way that aborts its current invocation.
    #[error("Processor error: {processor} - {message}")]
    Processor { processor: String, message: String },

    /// An XML document could not be read, parsed, edited or serialized.
    #[error("XML error for {path}: {message}")]
    Xml { path: String, message: String },

    /// An element selector could not be compiled.
    #[error("Invalid element selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// The index service rejected a mutation or commit.
    #[error("Index service error: {operation} - {message}")]
    Index { operation: String, message: String },

    /// An HTTP call made by a processor failed at the transport level.
    #[error("HTTP error: {url} - {message}")]
    Http { url: String, message: String },

    /// An email could not be composed or handed to the mail sender.
    #[error("Mail error: {message}")]
    Mail { message: String },

    /// An external command could not be run.
    #[error("Command error: {command} - {message}")]
    Command { command: String, message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl Error {
    /// Shorthand for a `ConfigParse` error without a hint.
    pub fn config(message: impl Into<String>) -> Self {
        Error::ConfigParse {
            message: message.into(),
            hint: None,
        }
    }

    /// Shorthand for an `Xml` error.
    pub fn xml(path: impl Into<String>, message: impl ToString) -> Self {
        Error::Xml {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config_parse() {
        let error = Error::config("Unknown processor type 'foo'");
        let display = format!("{}", error);
        assert!(display.contains("Configuration parsing error"));
        assert!(display.contains("Unknown processor type 'foo'"));
        assert!(!display.contains("hint:"));
    }

    #[test]
    fn test_error_display_config_parse_with_hint() {
        let error = Error::ConfigParse {
            message: "Missing gitRepositoryUrl".to_string(),
            hint: Some("Add 'gitRepositoryUrl:' to the site file".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("Missing gitRepositoryUrl"));
        assert!(display.contains("hint:"));
        assert!(display.contains("Add 'gitRepositoryUrl:'"));
    }

    #[test]
    fn test_error_display_git_command() {
        let error = Error::GitCommand {
            command: "pull --ff-only".to_string(),
            path: "/var/sites/demo".to_string(),
            stderr: "fatal: Not possible to fast-forward".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Git command failed"));
        assert!(display.contains("/var/sites/demo"));
        assert!(display.contains("pull --ff-only"));
        assert!(display.contains("Not possible to fast-forward"));
    }

    #[test]
    fn test_error_display_processor() {
        let error = Error::Processor {
            processor: "XmlFileIndexingProcessor".to_string(),
            message: "index unavailable".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Processor error"));
        assert!(display.contains("XmlFileIndexingProcessor"));
        assert!(display.contains("index unavailable"));
    }

    #[test]
    fn test_error_display_xml() {
        let error = Error::xml("/site/a.xml", "unexpected end of input");
        let display = format!("{}", error);
        assert!(display.contains("XML error for /site/a.xml"));
        assert!(display.contains("unexpected end of input"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("File not found"));
    }

    #[test]
    fn test_error_from_regex_error() {
        let regex_error = regex::Error::Syntax("Invalid regex".to_string());
        let error: Error = regex_error.into();
        assert!(format!("{}", error).contains("Regex error"));
    }

    #[test]
    fn test_error_from_yaml_error() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: [unclosed").unwrap_err();
        let error: Error = yaml_error.into();
        assert!(format!("{}", error).contains("YAML parsing error"));
    }
}
