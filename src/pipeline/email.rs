//! # Email Notifications
//!
//! Sends one email per created or updated content file that matches the
//! processor's patterns. Everything about the message comes from the file
//! itself, read through element selectors:
//!
//! ```xml
//! <page>
//!   <sendEmail>true</sendEmail>
//!   <mailTo>Jane Doe &lt;jane@example.com&gt;;ops@example.com</mailTo>
//!   <mailFrom>news@example.com</mailFrom>
//!   <title>Release notes</title>
//!   <textContent>Version 2 is out.</textContent>
//! </page>
//! ```
//!
//! A selector without a leading slash is read relative to the root element;
//! one starting with `/` is read from the document. Address fields whose
//! selector contains `//` take one address per matched element, the others
//! take a `;`-separated list from the first match.
//!
//! When a preview URL is configured, the HTML body is fetched from the
//! preview server and must pass the configured content checks before the
//! message is sent. Delivery is delegated to a [`MailSender`].

use std::fmt;
use std::sync::Arc;

use log::{debug, error, info};
use regex::Regex;
use xot::Node;

use super::http::{HttpClient, HttpMethod};
use crate::changeset::ChangeSet;
use crate::config::SiteConfig;
use crate::error::{Error, Result};
use crate::path::{compile_patterns, matches_any, resolve_in_root};
use crate::xml::{text_content, ElementSelector, XmlDocument};

/// Paths under this folder are pages, rendered at their own URL; anything
/// else is rendered through the component controller.
pub const PAGE_ROOT: &str = "/site/website";

/// Query parameter naming the site on preview requests.
pub const PREVIEW_SITE_PARAM: &str = "crafterSite";

/// An email address with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    pub name: Option<String>,
    pub address: String,
}

impl Mailbox {
    /// Parse `Jane Doe <jane@example.com>` or a bare address.
    ///
    /// Blank input and invalid addresses yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        let (name, address) = match value.find('<') {
            Some(index) if index > 0 => {
                let rest = &value[index + 1..];
                let address = rest.strip_suffix('>').unwrap_or(rest);
                (Some(value[..index].trim()), address.trim())
            }
            _ => (
                None,
                value
                    .strip_prefix('<')
                    .and_then(|v| v.strip_suffix('>'))
                    .unwrap_or(value)
                    .trim(),
            ),
        };

        if !is_valid_address(address) {
            debug!("{} is not a valid email address.", address);
            return None;
        }

        Some(Self {
            name: name.filter(|n| !n.is_empty()).map(str::to_string),
            address: address.to_string(),
        })
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} <{}>", name, self.address),
            None => f.write_str(&self.address),
        }
    }
}

fn is_valid_address(address: &str) -> bool {
    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && !address
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '<' | '>' | ',' | ';'))
}

/// A fully composed message, ready for delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: Option<Mailbox>,
    pub reply_to: Vec<Mailbox>,
    pub to: Vec<Mailbox>,
    pub cc: Vec<Mailbox>,
    pub bcc: Vec<Mailbox>,
    pub subject: String,
    pub text_body: String,
    pub html_body: Option<String>,
}

fn join(mailboxes: &[Mailbox]) -> String {
    mailboxes
        .iter()
        .map(Mailbox::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Mail delivery abstraction.
pub trait MailSender: Send + Sync {
    fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// A mail sender that only logs what it would send.
///
/// Used by the CLI, which has no mail transport of its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingMailSender;

impl MailSender for LoggingMailSender {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            "[dry-run] send '{}' from {} to [{}] cc [{}] bcc [{}]",
            message.subject,
            message
                .from
                .as_ref()
                .map(Mailbox::to_string)
                .unwrap_or_else(|| "<none>".to_string()),
            join(&message.to),
            join(&message.cc),
            join(&message.bcc)
        );
        Ok(())
    }
}

/// Configuration of an [`EmailProcessor`], before compilation.
#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub match_patterns: Vec<String>,
    pub mail_to_path: String,
    pub mail_cc_path: String,
    pub mail_bcc_path: String,
    pub mail_from_path: String,
    pub reply_to_path: String,
    pub title_path: String,
    pub text_content_path: String,
    pub send_email_flag_path: String,
    /// Sender used when the file names none.
    pub default_mail_from: Option<String>,
    /// Base URL of the preview server; no HTML body is sent without one.
    pub preview_url: Option<String>,
    pub component_controller: String,
    /// Regex replacements applied, in order, to page paths before they are
    /// appended to the preview URL.
    pub url_replacements: Vec<(String, String)>,
    /// Regex replacements applied, in order, to the fetched HTML.
    pub content_replacements: Vec<(String, String)>,
    /// Strings the HTML must contain.
    pub positive_checks: Vec<String>,
    /// Strings the HTML must not contain.
    pub negative_checks: Vec<String>,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            match_patterns: Vec::new(),
            mail_to_path: "mailTo".to_string(),
            mail_cc_path: "mailCc".to_string(),
            mail_bcc_path: "mailBcc".to_string(),
            mail_from_path: "mailFrom".to_string(),
            reply_to_path: "replyTo".to_string(),
            title_path: "title".to_string(),
            text_content_path: "textContent".to_string(),
            send_email_flag_path: "sendEmail".to_string(),
            default_mail_from: None,
            preview_url: None,
            component_controller: String::new(),
            url_replacements: Vec::new(),
            content_replacements: Vec::new(),
            positive_checks: Vec::new(),
            negative_checks: Vec::new(),
        }
    }
}

struct FieldSelectors {
    to: ElementSelector,
    cc: ElementSelector,
    bcc: ElementSelector,
    from: ElementSelector,
    reply_to: ElementSelector,
    title: ElementSelector,
    text_content: ElementSelector,
    send_flag: ElementSelector,
}

fn compile_replacements(pairs: &[(String, String)]) -> Result<Vec<(Regex, String)>> {
    pairs
        .iter()
        .map(|(pattern, replacement)| Ok((Regex::new(pattern)?, replacement.clone())))
        .collect()
}

fn apply_replacements(value: String, replacements: &[(Regex, String)]) -> String {
    replacements.iter().fold(value, |value, (pattern, replacement)| {
        pattern.replace_all(&value, replacement.as_str()).into_owned()
    })
}

/// Where the HTML body of a message is rendered.
struct PreviewPage {
    base_url: String,
    component_controller: String,
    url_replacements: Vec<(Regex, String)>,
    content_replacements: Vec<(Regex, String)>,
    positive_checks: Vec<String>,
    negative_checks: Vec<String>,
}

impl PreviewPage {
    fn url_for(&self, path: &str, site: &str) -> String {
        if path.starts_with(PAGE_ROOT) {
            let content_url = apply_replacements(path.to_string(), &self.url_replacements);
            format!(
                "{}{}?{}={}",
                self.base_url, content_url, PREVIEW_SITE_PARAM, site
            )
        } else {
            format!(
                "{}{}?path={}&{}={}",
                self.base_url, self.component_controller, path, PREVIEW_SITE_PARAM, site
            )
        }
    }

    fn fetch(&self, client: &dyn HttpClient, path: &str, site: &str) -> Result<String> {
        let url = self.url_for(path, site);
        debug!("Accessing {}", url);

        let response = client.execute(HttpMethod::Get, &url)?;
        if response.status != 200 {
            return Err(Error::Mail {
                message: format!(
                    "preview {} returned status {}: {}",
                    url, response.status, response.body
                ),
            });
        }

        let html = apply_replacements(response.body, &self.content_replacements);
        self.validate(&html)?;
        Ok(html)
    }

    fn validate(&self, html: &str) -> Result<()> {
        if let Some(check) = self.positive_checks.iter().find(|c| !html.contains(c.as_str())) {
            return Err(Error::Mail {
                message: format!("check failed due to no positive match: {}", check),
            });
        }
        if let Some(check) = self.negative_checks.iter().find(|c| html.contains(c.as_str())) {
            return Err(Error::Mail {
                message: format!("check failed due to a negative match: {}", check),
            });
        }
        Ok(())
    }
}

/// Reads message fields out of one parsed file.
struct FieldReader<'a> {
    document: &'a XmlDocument,
    root: Node,
}

impl<'a> FieldReader<'a> {
    fn new(document: &'a XmlDocument) -> Result<Self> {
        Ok(Self {
            document,
            root: document.root_element()?,
        })
    }

    fn nodes(&self, selector: &ElementSelector) -> Vec<Node> {
        if selector.as_str().starts_with('/') {
            self.document.select(selector)
        } else {
            selector.select(self.document.xot(), self.root)
        }
    }

    fn value(&self, selector: &ElementSelector) -> String {
        self.nodes(selector)
            .first()
            .map(|node| text_content(self.document.xot(), *node).trim().to_string())
            .unwrap_or_default()
    }

    fn addresses(&self, selector: &ElementSelector) -> Vec<Mailbox> {
        if selector.as_str().contains("//") {
            self.nodes(selector)
                .into_iter()
                .filter_map(|node| Mailbox::parse(&text_content(self.document.xot(), node)))
                .collect()
        } else {
            self.value(selector)
                .split(';')
                .filter_map(Mailbox::parse)
                .collect()
        }
    }
}

/// Emails the content of created and updated files. Deleted paths are
/// ignored, and a file failing to send is logged before the next proceeds.
pub struct EmailProcessor {
    sender: Arc<dyn MailSender>,
    http_client: Arc<dyn HttpClient>,
    match_patterns: Vec<Regex>,
    fields: FieldSelectors,
    default_mail_from: Option<String>,
    preview: Option<PreviewPage>,
}

impl EmailProcessor {
    pub fn new(
        sender: Arc<dyn MailSender>,
        http_client: Arc<dyn HttpClient>,
        settings: EmailSettings,
    ) -> Result<Self> {
        let fields = FieldSelectors {
            to: ElementSelector::parse(&settings.mail_to_path)?,
            cc: ElementSelector::parse(&settings.mail_cc_path)?,
            bcc: ElementSelector::parse(&settings.mail_bcc_path)?,
            from: ElementSelector::parse(&settings.mail_from_path)?,
            reply_to: ElementSelector::parse(&settings.reply_to_path)?,
            title: ElementSelector::parse(&settings.title_path)?,
            text_content: ElementSelector::parse(&settings.text_content_path)?,
            send_flag: ElementSelector::parse(&settings.send_email_flag_path)?,
        };

        let preview = match settings.preview_url {
            Some(base_url) => {
                url::Url::parse(&base_url)?;
                Some(PreviewPage {
                    base_url,
                    component_controller: settings.component_controller,
                    url_replacements: compile_replacements(&settings.url_replacements)?,
                    content_replacements: compile_replacements(&settings.content_replacements)?,
                    positive_checks: settings.positive_checks,
                    negative_checks: settings.negative_checks,
                })
            }
            None => None,
        };

        Ok(Self {
            sender,
            http_client,
            match_patterns: compile_patterns(&settings.match_patterns)?,
            fields,
            default_mail_from: settings.default_mail_from,
            preview,
        })
    }

    /// The preview URL the HTML body of `path` is fetched from, if any.
    pub fn preview_url_for(&self, path: &str, site: &str) -> Option<String> {
        self.preview.as_ref().map(|p| p.url_for(path, site))
    }

    pub fn process(&self, site: &SiteConfig, change_set: &ChangeSet) -> Result<()> {
        for path in change_set.created().iter().chain(change_set.updated()) {
            if matches_any(path, &self.match_patterns) {
                debug!("Processing {}", path);
                if let Err(e) = self.process_file(site, path) {
                    error!("Error while processing {}: {}", path, e);
                }
            } else {
                debug!("{} does not match a pattern.", path);
            }
        }
        Ok(())
    }

    /// Compose the message for one file; `None` when the file asks for no
    /// email or names no recipient.
    fn compose(&self, site: &SiteConfig, path: &str) -> Result<Option<EmailMessage>> {
        let document = XmlDocument::read(&resolve_in_root(&site.local_repo_path, path))?;
        let reader = FieldReader::new(&document)?;

        let flag = reader.value(&self.fields.send_flag);
        if !(flag.is_empty() || flag.eq_ignore_ascii_case("true")) {
            debug!("sendEmailFlag: {}", flag);
            return Ok(None);
        }

        let to = reader.addresses(&self.fields.to);
        let cc = reader.addresses(&self.fields.cc);
        let bcc = reader.addresses(&self.fields.bcc);
        if to.is_empty() && cc.is_empty() && bcc.is_empty() {
            debug!("No recipient is set. Skipping.");
            return Ok(None);
        }

        let from = match reader.value(&self.fields.from) {
            value if !value.is_empty() => Mailbox::parse(&value),
            _ => self.default_mail_from.as_deref().and_then(Mailbox::parse),
        };

        let html_body = match &self.preview {
            Some(preview) => Some(preview.fetch(self.http_client.as_ref(), path, &site.id)?),
            None => None,
        };

        Ok(Some(EmailMessage {
            from,
            reply_to: reader.addresses(&self.fields.reply_to),
            to,
            cc,
            bcc,
            subject: reader.value(&self.fields.title),
            text_body: reader.value(&self.fields.text_content),
            html_body,
        }))
    }

    fn process_file(&self, site: &SiteConfig, path: &str) -> Result<()> {
        let Some(message) = self.compose(site, path)? else {
            return Ok(());
        };

        debug!(
            "Sending email from: {}",
            message
                .from
                .as_ref()
                .map(Mailbox::to_string)
                .unwrap_or_default()
        );
        debug!(
            "to: [{}], cc: [{}], bcc: [{}]",
            join(&message.to),
            join(&message.cc),
            join(&message.bcc)
        );
        debug!("title: {}", message.subject);

        self.sender.send(&message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::testing::site;
    use crate::pipeline::http::HttpResponse;
    use crate::pipeline::testing::strings;
    use std::fs;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<EmailMessage>>,
        fail: bool,
    }

    impl RecordingSender {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn sent(&self) -> Vec<EmailMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl MailSender for RecordingSender {
        fn send(&self, message: &EmailMessage) -> Result<()> {
            self.sent.lock().unwrap().push(message.clone());
            if self.fail {
                return Err(Error::Mail {
                    message: "connection refused".to_string(),
                });
            }
            Ok(())
        }
    }

    struct StubPreview {
        status: u16,
        body: String,
        requests: Mutex<Vec<String>>,
    }

    impl StubPreview {
        fn new(status: u16, body: &str) -> Self {
            Self {
                status,
                body: body.to_string(),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl HttpClient for StubPreview {
        fn execute(&self, method: HttpMethod, url: &str) -> Result<HttpResponse> {
            self.requests
                .lock()
                .unwrap()
                .push(format!("{} {}", method, url));
            Ok(HttpResponse {
                status: self.status,
                body: self.body.clone(),
            })
        }
    }

    fn write(root: &Path, path: &str, content: &str) {
        let file = resolve_in_root(root, path);
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(file, content).unwrap();
    }

    fn settings(patterns: &[&str]) -> EmailSettings {
        EmailSettings {
            match_patterns: strings(patterns),
            ..EmailSettings::default()
        }
    }

    fn processor(sender: &Arc<RecordingSender>, settings: EmailSettings) -> EmailProcessor {
        EmailProcessor::new(
            sender.clone(),
            Arc::new(StubPreview::new(200, "<html/>")),
            settings,
        )
        .unwrap()
    }

    fn created(paths: &[&str]) -> ChangeSet {
        ChangeSet::new(strings(paths), Vec::new(), Vec::new())
    }

    const NEWSLETTER: &str = "<page>\
        <mailTo>Jane Doe &lt;jane@example.com&gt;; ops@example.com</mailTo>\
        <mailCc>cc@example.com</mailCc>\
        <mailFrom>News &lt;news@example.com&gt;</mailFrom>\
        <replyTo>reply@example.com</replyTo>\
        <title>Release notes</title>\
        <textContent>Version 2 is out.</textContent>\
        </page>";

    #[test]
    fn test_mailbox_parsing() {
        assert_eq!(
            Mailbox::parse(" Jane Doe <jane@example.com> "),
            Some(Mailbox {
                name: Some("Jane Doe".to_string()),
                address: "jane@example.com".to_string(),
            })
        );
        assert_eq!(
            Mailbox::parse("ops@example.com").unwrap().to_string(),
            "ops@example.com"
        );
        assert_eq!(
            Mailbox::parse("<ops@example.com>").unwrap().address,
            "ops@example.com"
        );
        assert_eq!(Mailbox::parse("   "), None);
        assert_eq!(Mailbox::parse("not an address"), None);
        assert_eq!(Mailbox::parse("Jane <jane@>"), None);
    }

    #[test]
    fn test_matching_file_is_sent() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "/site/news/a.xml", NEWSLETTER);
        let sender = Arc::new(RecordingSender::default());

        processor(&sender, settings(&["/site/news/.*\\.xml"]))
            .process(&site("s", temp.path()), &created(&["/site/news/a.xml"]))
            .unwrap();

        let sent = sender.sent();
        assert_eq!(sent.len(), 1);
        let message = &sent[0];
        assert_eq!(
            message.from.as_ref().unwrap().to_string(),
            "News <news@example.com>"
        );
        assert_eq!(
            join(&message.to),
            "Jane Doe <jane@example.com>, ops@example.com"
        );
        assert_eq!(join(&message.cc), "cc@example.com");
        assert!(message.bcc.is_empty());
        assert_eq!(join(&message.reply_to), "reply@example.com");
        assert_eq!(message.subject, "Release notes");
        assert_eq!(message.text_body, "Version 2 is out.");
        assert_eq!(message.html_body, None);
    }

    #[test]
    fn test_non_matching_and_deleted_files_are_skipped() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "/site/news/a.xml", NEWSLETTER);
        write(temp.path(), "/site/other/b.xml", NEWSLETTER);
        let sender = Arc::new(RecordingSender::default());
        let change_set = ChangeSet::new(
            strings(&["/site/other/b.xml"]),
            Vec::new(),
            strings(&["/site/news/a.xml"]),
        );

        processor(&sender, settings(&["/site/news/.*"]))
            .process(&site("s", temp.path()), &change_set)
            .unwrap();

        assert!(sender.sent().is_empty());
    }

    #[test]
    fn test_no_patterns_sends_nothing() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "/a.xml", NEWSLETTER);
        let sender = Arc::new(RecordingSender::default());

        processor(&sender, settings(&[]))
            .process(&site("s", temp.path()), &created(&["/a.xml"]))
            .unwrap();

        assert!(sender.sent().is_empty());
    }

    #[test]
    fn test_missing_recipients_skip_the_file() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "/a.xml",
            "<page><mailTo> ; not-an-address </mailTo><title>T</title></page>",
        );
        write(temp.path(), "/b.xml", "<page><title>T</title></page>");
        let sender = Arc::new(RecordingSender::default());

        processor(&sender, settings(&[".*"]))
            .process(&site("s", temp.path()), &created(&["/a.xml", "/b.xml"]))
            .unwrap();

        assert!(sender.sent().is_empty());
    }

    #[test]
    fn test_send_flag_other_than_true_skips_the_file() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "/off.xml",
            "<page><sendEmail>false</sendEmail><mailTo>a@example.com</mailTo></page>",
        );
        write(
            temp.path(),
            "/on.xml",
            "<page><sendEmail>TRUE</sendEmail><mailTo>b@example.com</mailTo></page>",
        );
        let sender = Arc::new(RecordingSender::default());

        processor(&sender, settings(&[".*"]))
            .process(&site("s", temp.path()), &created(&["/off.xml", "/on.xml"]))
            .unwrap();

        let sent = sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(join(&sent[0].to), "b@example.com");
    }

    #[test]
    fn test_default_sender_and_repeated_address_elements() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "/a.xml",
            "<page><recipients><email>a@example.com</email><email>bad</email>\
             <email>Bob &lt;b@example.com&gt;</email></recipients></page>",
        );
        let sender = Arc::new(RecordingSender::default());
        let settings = EmailSettings {
            mail_to_path: "//recipients/email".to_string(),
            default_mail_from: Some("noreply@example.com".to_string()),
            ..settings(&[".*"])
        };

        processor(&sender, settings)
            .process(&site("s", temp.path()), &created(&["/a.xml"]))
            .unwrap();

        let sent = sender.sent();
        assert_eq!(
            sent[0].from.as_ref().unwrap().address,
            "noreply@example.com"
        );
        assert_eq!(join(&sent[0].to), "a@example.com, Bob <b@example.com>");
    }

    #[test]
    fn test_send_error_is_logged_per_file() {
        testing_logger::setup();
        let temp = TempDir::new().unwrap();
        write(temp.path(), "/a.xml", NEWSLETTER);
        write(temp.path(), "/b.xml", NEWSLETTER);
        let sender = Arc::new(RecordingSender::failing());
        let change_set = ChangeSet::new(strings(&["/a.xml"]), strings(&["/b.xml"]), Vec::new());

        let result = processor(&sender, settings(&[".*"])).process(&site("s", temp.path()), &change_set);

        assert!(result.is_ok());
        assert_eq!(sender.sent().len(), 2);
        testing_logger::validate(|captured| {
            let errors: Vec<&str> = captured
                .iter()
                .filter(|l| l.level == log::Level::Error)
                .map(|l| l.body.as_str())
                .collect();
            assert_eq!(errors.len(), 2, "{:?}", errors);
            assert!(errors[0].contains("Error while processing /a.xml"));
            assert!(errors[1].contains("Error while processing /b.xml"));
            assert!(errors[1].contains("connection refused"));
        });
    }

    #[test]
    fn test_unreadable_file_is_logged_and_next_proceeds() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "/broken.xml", "<page><mailTo>");
        write(temp.path(), "/ok.xml", NEWSLETTER);
        let sender = Arc::new(RecordingSender::default());

        processor(&sender, settings(&[".*"]))
            .process(
                &site("s", temp.path()),
                &created(&["/missing.xml", "/broken.xml", "/ok.xml"]),
            )
            .unwrap();

        assert_eq!(sender.sent().len(), 1);
    }

    #[test]
    fn test_html_body_comes_from_preview() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "/site/website/news/index.xml", NEWSLETTER);
        write(temp.path(), "/site/components/banner.xml", NEWSLETTER);
        let sender = Arc::new(RecordingSender::default());
        let preview = Arc::new(StubPreview::new(
            200,
            "<html><img src=\"http://preview/logo.png\"/>READY</html>",
        ));
        let settings = EmailSettings {
            preview_url: Some("http://preview:8080".to_string()),
            component_controller: "/component".to_string(),
            url_replacements: vec![
                ("^/site/website".to_string(), String::new()),
                ("/index\\.xml$".to_string(), String::new()),
            ],
            content_replacements: vec![(
                "http://preview/".to_string(),
                "https://www.example.com/".to_string(),
            )],
            positive_checks: strings(&["READY"]),
            ..settings(&[".*"])
        };
        let processor = EmailProcessor::new(sender.clone(), preview.clone(), settings).unwrap();

        processor
            .process(
                &site("news", temp.path()),
                &created(&["/site/website/news/index.xml", "/site/components/banner.xml"]),
            )
            .unwrap();

        assert_eq!(
            *preview.requests.lock().unwrap(),
            vec![
                "GET http://preview:8080/news?crafterSite=news",
                "GET http://preview:8080/component?path=/site/components/banner.xml&crafterSite=news",
            ]
        );
        let sent = sender.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[0].html_body.as_deref(),
            Some("<html><img src=\"https://www.example.com/logo.png\"/>READY</html>")
        );
    }

    #[test]
    fn test_failed_preview_or_check_skips_the_file() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "/a.xml", NEWSLETTER);
        let site = site("s", temp.path());

        for (status, body, negative) in [
            (500, "<html>READY</html>", Vec::new()),
            (200, "<html>draft</html>", Vec::new()),
            (200, "<html>READY ERROR</html>", strings(&["ERROR"])),
        ] {
            let sender = Arc::new(RecordingSender::default());
            let settings = EmailSettings {
                preview_url: Some("http://preview".to_string()),
                positive_checks: strings(&["READY"]),
                negative_checks: negative,
                ..settings(&[".*"])
            };
            EmailProcessor::new(
                sender.clone(),
                Arc::new(StubPreview::new(status, body)),
                settings,
            )
            .unwrap()
            .process(&site, &created(&["/a.xml"]))
            .unwrap();

            assert!(sender.sent().is_empty(), "{} {}", status, body);
        }
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let sender = Arc::new(RecordingSender::default());
        let client = Arc::new(StubPreview::new(200, ""));

        let bad_selector = EmailSettings {
            mail_to_path: "//a:b".to_string(),
            ..EmailSettings::default()
        };
        assert!(EmailProcessor::new(sender.clone(), client.clone(), bad_selector).is_err());

        let bad_url = EmailSettings {
            preview_url: Some("not a url".to_string()),
            ..EmailSettings::default()
        };
        assert!(EmailProcessor::new(sender, client, bad_url).is_err());
    }
}
