//! # Processor Pipeline
//!
//! A site's processors form an ordered list, run one after the other against
//! the change set of a sync cycle. Each processor is a [`Processor`]: a name,
//! a priority and a [`ProcessorKind`] saying what it does.
//!
//! ## Kinds
//!
//! - **Composites**: [`SequentialProcessor`], [`PathPatternRouter`] and
//!   [`PerSiteRouter`] hold other processors and decide which of them run,
//!   on which part of the change set.
//! - **Leaves**: XML and binary indexing (with or without metadata), shell commands, HTTP calls and
//!   email notifications.
//! - **Custom**: anything implementing [`SiteProcessor`], for processors
//!   that live outside this crate.
//!
//! ## Failure isolation
//!
//! [`run_pipeline`] catches and logs the failure of each top-level processor
//! and moves on to the next; there is no retry. Routers pass their
//! delegate's failure up to the list they belong to.

pub mod command;
pub mod email;
pub mod http;
pub mod registry;
pub mod routing;

use std::fmt;
use std::sync::Arc;

use log::{debug, error};

use crate::changeset::ChangeSet;
use crate::config::SiteConfig;
use crate::error::Result;
use crate::indexing::{
    BinaryFileIndexingProcessor, BinaryFileWithMetadataIndexingProcessor, XmlFileIndexingProcessor,
};

pub use command::CommandProcessor;
pub use email::{
    EmailMessage, EmailProcessor, EmailSettings, LoggingMailSender, MailSender, Mailbox,
};
pub use http::{HttpClient, HttpMethod, HttpMethodCallProcessor, HttpResponse, UreqHttpClient};
pub use registry::{ProcessorFactory, ProcessorRegistry, ProcessorSpec};
pub use routing::{PathPatternRouter, PerSiteRouter};

/// Priority used when none is configured; runs after everything else.
pub const DEFAULT_PRIORITY: i32 = i32::MAX;

/// A processor implemented outside this crate.
pub trait SiteProcessor: Send + Sync {
    fn process(&self, site: &SiteConfig, change_set: &ChangeSet) -> Result<()>;
}

/// What a processor does.
pub enum ProcessorKind {
    Sequential(SequentialProcessor),
    PathRouted(PathPatternRouter),
    SiteRouted(PerSiteRouter),
    XmlIndexing(XmlFileIndexingProcessor),
    BinaryIndexing(BinaryFileIndexingProcessor),
    BinaryWithMetadataIndexing(BinaryFileWithMetadataIndexingProcessor),
    Command(CommandProcessor),
    HttpCall(HttpMethodCallProcessor),
    Email(EmailProcessor),
    Custom(Arc<dyn SiteProcessor>),
}

impl ProcessorKind {
    /// Name used when the configuration gives none.
    pub fn default_name(&self) -> &'static str {
        match self {
            ProcessorKind::Sequential(_) => "SequentialProcessor",
            ProcessorKind::PathRouted(_) => "PathPatternRouter",
            ProcessorKind::SiteRouted(_) => "PerSiteRouter",
            ProcessorKind::XmlIndexing(_) => "XmlFileIndexingProcessor",
            ProcessorKind::BinaryIndexing(_) => "BinaryFileIndexingProcessor",
            ProcessorKind::BinaryWithMetadataIndexing(_) => {
                "BinaryFileWithMetadataIndexingProcessor"
            }
            ProcessorKind::Command(_) => "CommandProcessor",
            ProcessorKind::HttpCall(_) => "HttpMethodCallProcessor",
            ProcessorKind::Email(_) => "EmailProcessor",
            ProcessorKind::Custom(_) => "CustomProcessor",
        }
    }
}

/// One configured unit of work over a site and a change set.
pub struct Processor {
    name: String,
    priority: i32,
    kind: ProcessorKind,
}

impl Processor {
    pub fn new(kind: ProcessorKind) -> Self {
        Self {
            name: kind.default_name().to_string(),
            priority: DEFAULT_PRIORITY,
            kind,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn custom(name: impl Into<String>, processor: Arc<dyn SiteProcessor>) -> Self {
        Self::new(ProcessorKind::Custom(processor)).with_name(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lower values run first.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn kind(&self) -> &ProcessorKind {
        &self.kind
    }

    pub fn process(&self, site: &SiteConfig, change_set: &ChangeSet) -> Result<()> {
        match &self.kind {
            ProcessorKind::Sequential(p) => p.process(site, change_set),
            ProcessorKind::PathRouted(p) => p.process(site, change_set),
            ProcessorKind::SiteRouted(p) => p.process(site, change_set),
            ProcessorKind::XmlIndexing(p) => p.process(site, change_set),
            ProcessorKind::BinaryIndexing(p) => p.process(site, change_set),
            ProcessorKind::BinaryWithMetadataIndexing(p) => p.process(site, change_set),
            ProcessorKind::Command(p) => p.process(site, change_set),
            ProcessorKind::HttpCall(p) => p.process(site, change_set),
            ProcessorKind::Email(p) => p.process(site, change_set),
            ProcessorKind::Custom(p) => p.process(site, change_set),
        }
    }

    /// Names of this processor and everything below it, depth first.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();
        self.describe_into(0, &mut lines);
        lines
    }

    fn describe_into(&self, depth: usize, lines: &mut Vec<String>) {
        let priority = if self.priority == DEFAULT_PRIORITY {
            String::new()
        } else {
            format!(" (priority {})", self.priority)
        };
        lines.push(format!("{}{}{}", "  ".repeat(depth), self.name, priority));

        match &self.kind {
            ProcessorKind::Sequential(p) => {
                for child in p.processors() {
                    child.describe_into(depth + 1, lines);
                }
            }
            ProcessorKind::PathRouted(p) => {
                for child in p.delegates() {
                    child.describe_into(depth + 1, lines);
                }
            }
            ProcessorKind::SiteRouted(p) => {
                for child in p.delegates() {
                    child.describe_into(depth + 1, lines);
                }
            }
            _ => {}
        }
    }
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processor")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Order processors by ascending priority, keeping configuration order for
/// ties.
pub fn sort_by_priority(processors: &mut [Processor]) {
    processors.sort_by_key(|p| p.priority());
}

/// Run `processors` in order, logging and skipping past any that fail.
///
/// Returns the number of processors that failed.
pub fn run_pipeline(processors: &[Processor], site: &SiteConfig, change_set: &ChangeSet) -> usize {
    let mut failures = 0;

    for processor in processors {
        debug!(
            "Executing processor {} for site {}",
            processor.name(),
            site.id
        );
        if let Err(e) = processor.process(site, change_set) {
            error!(
                "Error executing processor {} for site {}: {}",
                processor.name(),
                site.id,
                e
            );
            failures += 1;
        }
    }

    failures
}

/// Runs its delegates in priority order, each isolated from the others'
/// failures.
pub struct SequentialProcessor {
    processors: Vec<Processor>,
}

impl SequentialProcessor {
    pub fn new(mut processors: Vec<Processor>) -> Self {
        sort_by_priority(&mut processors);
        Self { processors }
    }

    pub fn processors(&self) -> &[Processor] {
        &self.processors
    }

    pub fn process(&self, site: &SiteConfig, change_set: &ChangeSet) -> Result<()> {
        run_pipeline(&self.processors, site, change_set);
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_sort_by_priority_is_stable() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut processors = vec![
            ordered("default-a", DEFAULT_PRIORITY, &log),
            ordered("second", 10, &log),
            ordered("first", 1, &log),
            ordered("default-b", DEFAULT_PRIORITY, &log),
            ordered("second-tie", 10, &log),
        ];

        sort_by_priority(&mut processors);

        let names: Vec<_> = processors.iter().map(|p| p.name().to_string()).collect();
        assert_eq!(
            names,
            vec!["first", "second", "second-tie", "default-a", "default-b"]
        );
    }

    #[test]
    fn test_run_pipeline_isolates_failures() {
        let failing = Arc::new(RecordingProcessor::failing());
        let after = Arc::new(RecordingProcessor::default());
        let processors = vec![
            Processor::custom("failing", failing.clone()),
            Processor::custom("after", after.clone()),
        ];
        let change_set = ChangeSet::new(strings(&["/a.xml"]), Vec::new(), Vec::new());

        let failures = run_pipeline(&processors, &site("s"), &change_set);

        assert_eq!(failures, 1);
        assert_eq!(failing.change_sets(), vec![change_set.clone()]);
        assert_eq!(after.change_sets(), vec![change_set]);
    }

    #[test]
    fn test_sequential_runs_in_priority_order_and_swallows_failures() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let failing = Arc::new(RecordingProcessor::failing());
        let sequential = SequentialProcessor::new(vec![
            ordered("late", 5, &log),
            Processor::custom("failing", failing.clone()).with_priority(2),
            ordered("early", 1, &log),
        ]);

        sequential
            .process(&site("s"), &ChangeSet::default())
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["early", "late"]);
        assert_eq!(failing.received().len(), 1);
    }

    #[test]
    fn test_processor_defaults_and_describe() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sequential = Processor::new(ProcessorKind::Sequential(SequentialProcessor::new(vec![
            ordered("child", 3, &log),
        ])));

        assert_eq!(sequential.name(), "SequentialProcessor");
        assert_eq!(sequential.priority(), DEFAULT_PRIORITY);
        assert_eq!(
            sequential.describe(),
            vec!["SequentialProcessor", "  child (priority 3)"]
        );
        assert_eq!(
            format!("{:?}", sequential),
            format!(
                "Processor {{ name: \"SequentialProcessor\", priority: {} }}",
                i32::MAX
            )
        );
    }
}
