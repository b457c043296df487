//! # Processor Registry
//!
//! Builds [`Processor`] trees from the `processors:` list of a site file.
//! Each entry is a [`ProcessorSpec`]: a `type` naming a registered factory,
//! an optional `priority` and `name`, and the factory's own parameters:
//!
//! ```yaml
//! processors:
//!   - type: pathRouted
//!     priority: 1
//!     mappings:
//!       - patterns: ['.*\.xml']
//!         processor:
//!           type: xmlIndexing
//!           flatten: true
//!           fieldMappings:
//!             //name: fileName
//!       - patterns: ['.*\.pdf']
//!         processor: { type: binaryIndexing, supportedMimeTypes: [application/pdf] }
//!   - type: httpCall
//!     method: POST
//!     url: http://localhost:8080/api/cache/clear?site={siteName}
//!   - type: email
//!     matchPatterns: ['/site/website/newsletter/.*\.xml']
//!     defaultMailFrom: news@example.com
//! ```
//!
//! Factories are looked up by type name, so applications can register their
//! own processor types next to the built-in ones.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use super::email::{EmailProcessor, EmailSettings, MailSender};
use super::http::{HttpClient, HttpMethod, HttpMethodCallProcessor, UreqHttpClient};
use super::routing::{PathMapping, PathPatternRouter, PerSiteRouter};
use super::{sort_by_priority, CommandProcessor, Processor, ProcessorKind, SequentialProcessor};
use crate::error::{Error, Result};
use crate::indexing::{
    BinaryFileIndexingProcessor, BinaryFileWithMetadataIndexingProcessor, IndexService,
    IndexTarget, XmlFileIndexingProcessor, DEFAULT_INDEX_ID_FORMAT,
};
use crate::xml::flatten::{DEFAULT_DISABLE_FLATTENING_ELEMENT, DEFAULT_INCLUDE_ELEMENT_SELECTOR};
use crate::xml::tokenize::{default_substitutions, DEFAULT_TOKENIZE_ATTRIBUTE};
use crate::xml::{
    DocumentTransformChain, FieldRenamingTransform, FlatteningTransform, TokenizeTransform,
};

/// One `{type, priority?, name?, ...params}` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub params: Mapping,
}

impl ProcessorSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            priority: None,
            name: None,
            params: Mapping::new(),
        }
    }

    /// Deserialize the type-specific parameters.
    pub fn params<T: DeserializeOwned>(&self) -> Result<T> {
        serde_yaml::from_value(Value::Mapping(self.params.clone())).map_err(|e| {
            Error::ConfigParse {
                message: format!("invalid parameters for '{}' processor: {}", self.kind, e),
                hint: None,
            }
        })
    }
}

/// Builds the kind of processor registered under one type name.
pub type ProcessorFactory =
    Box<dyn Fn(&ProcessorSpec, &ProcessorRegistry) -> Result<ProcessorKind> + Send + Sync>;

/// Maps processor type names to factories, and holds the collaborators the
/// built processors share.
pub struct ProcessorRegistry {
    factories: HashMap<String, ProcessorFactory>,
    index_service: Option<Arc<dyn IndexService>>,
    http_client: Arc<dyn HttpClient>,
    mail_sender: Option<Arc<dyn MailSender>>,
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessorRegistry {
    /// A registry with every built-in type, no index service, no mail sender
    /// and a `ureq` HTTP client.
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
            index_service: None,
            http_client: Arc::new(UreqHttpClient),
            mail_sender: None,
        };
        registry.register("sequential", build_sequential);
        registry.register("pathRouted", build_path_routed);
        registry.register("siteRouted", build_site_routed);
        registry.register("xmlIndexing", build_xml_indexing);
        registry.register("binaryIndexing", build_binary_indexing);
        registry.register("binaryWithMetadataIndexing", build_binary_with_metadata_indexing);
        registry.register("command", build_command);
        registry.register("httpCall", build_http_call);
        registry.register("email", build_email);
        registry
    }

    pub fn with_index_service(mut self, service: Arc<dyn IndexService>) -> Self {
        self.index_service = Some(service);
        self
    }

    pub fn with_http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = client;
        self
    }

    pub fn with_mail_sender(mut self, sender: Arc<dyn MailSender>) -> Self {
        self.mail_sender = Some(sender);
        self
    }

    /// Register (or replace) the factory for `type_name`.
    pub fn register<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn(&ProcessorSpec, &ProcessorRegistry) -> Result<ProcessorKind> + Send + Sync + 'static,
    {
        self.factories.insert(type_name.into(), Box::new(factory));
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The index service indexing processors send to.
    ///
    /// Missing wiring is a `Configuration` error: a pipeline with an indexer
    /// and nowhere to send documents must not start.
    pub fn index_service(&self) -> Result<Arc<dyn IndexService>> {
        self.index_service.clone().ok_or_else(|| Error::Configuration {
            message: "an indexing processor is configured but no index service is available"
                .to_string(),
        })
    }

    pub fn http_client(&self) -> Arc<dyn HttpClient> {
        self.http_client.clone()
    }

    /// The mail sender email processors deliver through.
    pub fn mail_sender(&self) -> Result<Arc<dyn MailSender>> {
        self.mail_sender.clone().ok_or_else(|| Error::Configuration {
            message: "an email processor is configured but no mail sender is available"
                .to_string(),
        })
    }

    pub fn build(&self, spec: &ProcessorSpec) -> Result<Processor> {
        let factory = self.factories.get(&spec.kind).ok_or_else(|| Error::ConfigParse {
            message: format!("unknown processor type '{}'", spec.kind),
            hint: Some(format!("known types: {}", self.type_names().join(", "))),
        })?;

        let mut processor = Processor::new(factory(spec, self)?);
        if let Some(name) = &spec.name {
            processor = processor.with_name(name.clone());
        }
        if let Some(priority) = spec.priority {
            processor = processor.with_priority(priority);
        }
        Ok(processor)
    }

    /// Build every spec and order the result by priority.
    pub fn build_all(&self, specs: &[ProcessorSpec]) -> Result<Vec<Processor>> {
        let mut processors = specs
            .iter()
            .map(|spec| self.build(spec))
            .collect::<Result<Vec<_>>>()?;
        sort_by_priority(&mut processors);
        Ok(processors)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SequentialParams {
    processors: Vec<ProcessorSpec>,
}

fn build_sequential(spec: &ProcessorSpec, registry: &ProcessorRegistry) -> Result<ProcessorKind> {
    let params: SequentialParams = spec.params()?;
    Ok(ProcessorKind::Sequential(SequentialProcessor::new(
        registry.build_all(&params.processors)?,
    )))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct PathMappingParams {
    patterns: Vec<String>,
    processor: ProcessorSpec,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct PathRoutedParams {
    mappings: Vec<PathMappingParams>,
}

fn build_path_routed(spec: &ProcessorSpec, registry: &ProcessorRegistry) -> Result<ProcessorKind> {
    let params: PathRoutedParams = spec.params()?;
    let mappings = params
        .mappings
        .iter()
        .map(|mapping| PathMapping::new(&mapping.patterns, registry.build(&mapping.processor)?))
        .collect::<Result<Vec<_>>>()?;
    Ok(ProcessorKind::PathRouted(PathPatternRouter::new(mappings)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SiteRoutedParams {
    #[serde(default)]
    mappings: BTreeMap<String, ProcessorSpec>,
    #[serde(default)]
    default: Option<ProcessorSpec>,
}

fn build_site_routed(spec: &ProcessorSpec, registry: &ProcessorRegistry) -> Result<ProcessorKind> {
    let params: SiteRoutedParams = spec.params()?;
    let mappings = params
        .mappings
        .iter()
        .map(|(site, spec)| Ok((site.clone(), registry.build(spec)?)))
        .collect::<Result<BTreeMap<_, _>>>()?;
    let default = params
        .default
        .as_ref()
        .map(|spec| registry.build(spec))
        .transpose()?;
    Ok(ProcessorKind::SiteRouted(PerSiteRouter::new(mappings, default)))
}

fn default_index_id_format() -> String {
    DEFAULT_INDEX_ID_FORMAT.to_string()
}

fn default_tokenize_attribute() -> String {
    DEFAULT_TOKENIZE_ATTRIBUTE.to_string()
}

fn default_include_selector() -> String {
    DEFAULT_INCLUDE_ELEMENT_SELECTOR.to_string()
}

fn default_disable_flattening_element() -> String {
    DEFAULT_DISABLE_FLATTENING_ELEMENT.to_string()
}

/// `fieldMappings` as either an ordered map or a list of records.
#[derive(Deserialize)]
#[serde(untagged)]
enum FieldMappings {
    List(Vec<FieldMapping>),
    Map(Mapping),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldMapping {
    selector: String,
    name: String,
}

impl Default for FieldMappings {
    fn default() -> Self {
        FieldMappings::List(Vec::new())
    }
}

impl FieldMappings {
    fn into_pairs(self) -> Result<Vec<(String, String)>> {
        match self {
            FieldMappings::List(list) => Ok(list.into_iter().map(|m| (m.selector, m.name)).collect()),
            FieldMappings::Map(map) => string_pairs(&map, "fieldMappings"),
        }
    }
}

/// Read a YAML mapping of strings to strings, keeping its order.
fn string_pairs(map: &Mapping, field: &str) -> Result<Vec<(String, String)>> {
    map.iter()
        .map(|(key, value)| match (key.as_str(), value.as_str()) {
            (Some(key), Some(value)) => Ok((key.to_string(), value.to_string())),
            _ => Err(Error::config(format!(
                "{} entries must map strings to strings",
                field
            ))),
        })
        .collect()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct XmlIndexingParams {
    #[serde(default)]
    flatten: bool,
    #[serde(default)]
    field_mappings: FieldMappings,
    #[serde(default = "default_tokenize_attribute")]
    tokenize_attribute: String,
    #[serde(default)]
    tokenize_substitutions: Option<Mapping>,
    #[serde(default = "default_include_selector")]
    include_element_selector: String,
    #[serde(default = "default_disable_flattening_element")]
    disable_flattening_element: String,
    #[serde(default)]
    disable_nested_page_flattening: bool,
    #[serde(default)]
    index_id: Option<String>,
    #[serde(default = "default_index_id_format")]
    default_index_id_format: String,
    #[serde(default)]
    use_no_index_id: bool,
    #[serde(default)]
    site_name: Option<String>,
}

/// The renaming and tokenize stages both indexing chains share.
fn field_transforms(
    field_mappings: FieldMappings,
    tokenize_attribute: &str,
    tokenize_substitutions: Option<&Mapping>,
) -> Result<(FieldRenamingTransform, TokenizeTransform)> {
    let renaming = FieldRenamingTransform::from_pairs(field_mappings.into_pairs()?)?;
    let substitutions = match tokenize_substitutions {
        Some(map) => string_pairs(map, "tokenizeSubstitutions")?,
        None => default_substitutions(),
    };
    let tokenize = TokenizeTransform::new(tokenize_attribute, substitutions)?;
    Ok((renaming, tokenize))
}

fn build_xml_indexing(spec: &ProcessorSpec, registry: &ProcessorRegistry) -> Result<ProcessorKind> {
    let params: XmlIndexingParams = spec.params()?;
    let service = registry.index_service()?;

    let (renaming, tokenize) = field_transforms(
        params.field_mappings,
        &params.tokenize_attribute,
        params.tokenize_substitutions.as_ref(),
    )?;

    let chain = if params.flatten {
        let flatten = FlatteningTransform::default()
            .with_include_selector(&params.include_element_selector)?
            .with_disable_flattening_element(params.disable_flattening_element)
            .with_disable_nested_page_flattening(params.disable_nested_page_flattening);
        DocumentTransformChain::flattening(flatten, renaming, tokenize)
    } else {
        DocumentTransformChain::standard(renaming, tokenize)
    };

    let target = IndexTarget {
        index_id: params.index_id,
        default_index_id_format: params.default_index_id_format,
        use_no_index_id: params.use_no_index_id,
        site_name: params.site_name,
    };

    Ok(ProcessorKind::XmlIndexing(XmlFileIndexingProcessor::new(
        service, target, chain,
    )))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct BinaryIndexingParams {
    #[serde(default)]
    supported_mime_types: Vec<String>,
    #[serde(default)]
    index_id: Option<String>,
    #[serde(default = "default_index_id_format")]
    default_index_id_format: String,
    #[serde(default)]
    use_no_index_id: bool,
    #[serde(default)]
    site_name: Option<String>,
}

fn build_binary_indexing(
    spec: &ProcessorSpec,
    registry: &ProcessorRegistry,
) -> Result<ProcessorKind> {
    let params: BinaryIndexingParams = spec.params()?;
    let service = registry.index_service()?;
    let target = IndexTarget {
        index_id: params.index_id,
        default_index_id_format: params.default_index_id_format,
        use_no_index_id: params.use_no_index_id,
        site_name: params.site_name,
    };
    Ok(ProcessorKind::BinaryIndexing(BinaryFileIndexingProcessor::new(
        service,
        target,
        params.supported_mime_types,
    )))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct BinaryWithMetadataIndexingParams {
    #[serde(default)]
    metadata_path_patterns: Vec<String>,
    #[serde(default)]
    binary_path_patterns: Vec<String>,
    #[serde(default)]
    reference_selectors: Vec<String>,
    #[serde(default)]
    exclude_metadata_properties: Vec<String>,
    #[serde(default)]
    field_mappings: FieldMappings,
    #[serde(default = "default_tokenize_attribute")]
    tokenize_attribute: String,
    #[serde(default)]
    tokenize_substitutions: Option<Mapping>,
    #[serde(default)]
    index_id: Option<String>,
    #[serde(default = "default_index_id_format")]
    default_index_id_format: String,
    #[serde(default)]
    use_no_index_id: bool,
    #[serde(default)]
    site_name: Option<String>,
}

fn build_binary_with_metadata_indexing(
    spec: &ProcessorSpec,
    registry: &ProcessorRegistry,
) -> Result<ProcessorKind> {
    let params: BinaryWithMetadataIndexingParams = spec.params()?;
    let service = registry.index_service()?;

    let (renaming, tokenize) = field_transforms(
        params.field_mappings,
        &params.tokenize_attribute,
        params.tokenize_substitutions.as_ref(),
    )?;
    let target = IndexTarget {
        index_id: params.index_id,
        default_index_id_format: params.default_index_id_format,
        use_no_index_id: params.use_no_index_id,
        site_name: params.site_name,
    };

    Ok(ProcessorKind::BinaryWithMetadataIndexing(
        BinaryFileWithMetadataIndexingProcessor::new(
            service,
            target,
            &params.metadata_path_patterns,
            &params.binary_path_patterns,
            &params.reference_selectors,
            params.exclude_metadata_properties,
            DocumentTransformChain::standard(renaming, tokenize),
        )?,
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CommandParams {
    command: String,
    #[serde(default)]
    match_patterns: Vec<String>,
}

fn build_command(spec: &ProcessorSpec, _registry: &ProcessorRegistry) -> Result<ProcessorKind> {
    let params: CommandParams = spec.params()?;
    Ok(ProcessorKind::Command(CommandProcessor::new(
        params.command,
        &params.match_patterns,
    )?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct HttpCallParams {
    method: String,
    url: String,
    #[serde(default)]
    site_name: Option<String>,
}

fn build_http_call(spec: &ProcessorSpec, registry: &ProcessorRegistry) -> Result<ProcessorKind> {
    let params: HttpCallParams = spec.params()?;
    let method: HttpMethod = params.method.parse()?;
    Ok(ProcessorKind::HttpCall(HttpMethodCallProcessor::new(
        registry.http_client(),
        method,
        params.url,
        params.site_name,
    )?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct EmailParams {
    #[serde(default)]
    match_patterns: Vec<String>,
    mail_to_path: Option<String>,
    mail_cc_path: Option<String>,
    mail_bcc_path: Option<String>,
    mail_from_path: Option<String>,
    reply_to_path: Option<String>,
    title_path: Option<String>,
    text_content_path: Option<String>,
    send_email_flag_path: Option<String>,
    default_mail_from: Option<String>,
    preview_url: Option<String>,
    #[serde(default)]
    component_controller: String,
    url_replacements: Option<Mapping>,
    content_replacements: Option<Mapping>,
    #[serde(default)]
    positive_checks: Vec<String>,
    #[serde(default)]
    negative_checks: Vec<String>,
}

fn build_email(spec: &ProcessorSpec, registry: &ProcessorRegistry) -> Result<ProcessorKind> {
    let params: EmailParams = spec.params()?;
    let sender = registry.mail_sender()?;

    let defaults = EmailSettings::default();
    let settings = EmailSettings {
        match_patterns: params.match_patterns,
        mail_to_path: params.mail_to_path.unwrap_or(defaults.mail_to_path),
        mail_cc_path: params.mail_cc_path.unwrap_or(defaults.mail_cc_path),
        mail_bcc_path: params.mail_bcc_path.unwrap_or(defaults.mail_bcc_path),
        mail_from_path: params.mail_from_path.unwrap_or(defaults.mail_from_path),
        reply_to_path: params.reply_to_path.unwrap_or(defaults.reply_to_path),
        title_path: params.title_path.unwrap_or(defaults.title_path),
        text_content_path: params.text_content_path.unwrap_or(defaults.text_content_path),
        send_email_flag_path: params
            .send_email_flag_path
            .unwrap_or(defaults.send_email_flag_path),
        default_mail_from: params.default_mail_from,
        preview_url: params.preview_url,
        component_controller: params.component_controller,
        url_replacements: match &params.url_replacements {
            Some(map) => string_pairs(map, "urlReplacements")?,
            None => Vec::new(),
        },
        content_replacements: match &params.content_replacements {
            Some(map) => string_pairs(map, "contentReplacements")?,
            None => Vec::new(),
        },
        positive_checks: params.positive_checks,
        negative_checks: params.negative_checks,
    };

    Ok(ProcessorKind::Email(EmailProcessor::new(
        sender,
        registry.http_client(),
        settings,
    )?))
}
