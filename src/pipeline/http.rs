//! Calls an HTTP endpoint once per change set, e.g. to clear a cache.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use log::{error, info};

use crate::changeset::ChangeSet;
use crate::config::SiteConfig;
use crate::error::{Error, Result};

/// Placeholder in the URL replaced by the effective site name.
pub const SITE_NAME_PLACEHOLDER: &str = "{siteName}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Head,
    Options,
    Put,
    Delete,
    Trace,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Trace => "TRACE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "TRACE" => Ok(HttpMethod::Trace),
            other => Err(Error::config(format!("unsupported HTTP method '{}'", other))),
        }
    }
}

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// HTTP client abstraction.
///
/// A response with any status, error statuses included, is `Ok`; `Err` is
/// reserved for requests that never got a response.
pub trait HttpClient: Send + Sync {
    fn execute(&self, method: HttpMethod, url: &str) -> Result<HttpResponse>;
}

/// [`HttpClient`] backed by `ureq`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UreqHttpClient;

impl HttpClient for UreqHttpClient {
    fn execute(&self, method: HttpMethod, url: &str) -> Result<HttpResponse> {
        let response = match ureq::request(method.as_str(), url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(e) => {
                return Err(Error::Http {
                    url: url.to_string(),
                    message: e.to_string(),
                })
            }
        };

        let status = response.status();
        let body = response.into_string().map_err(|e| Error::Http {
            url: url.to_string(),
            message: format!("failed to read response body: {}", e),
        })?;

        Ok(HttpResponse { status, body })
    }
}

/// Issues one request per invocation, regardless of the change set content.
pub struct HttpMethodCallProcessor {
    client: Arc<dyn HttpClient>,
    method: HttpMethod,
    url: String,
    site_name: Option<String>,
}

impl HttpMethodCallProcessor {
    pub fn new(
        client: Arc<dyn HttpClient>,
        method: HttpMethod,
        url: impl Into<String>,
        site_name: Option<String>,
    ) -> Result<Self> {
        let url = url.into();
        // Validate with a placeholder-free URL so `{siteName}` in the host works.
        url::Url::parse(&url.replace(SITE_NAME_PLACEHOLDER, "site"))?;
        Ok(Self {
            client,
            method,
            url,
            site_name,
        })
    }

    /// The URL requested for `site`.
    pub fn url_for(&self, site: &SiteConfig) -> String {
        let site_name = match self.site_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => site.id.as_str(),
        };
        if site_name.is_empty() {
            self.url.clone()
        } else {
            self.url.replace(SITE_NAME_PLACEHOLDER, site_name)
        }
    }

    pub fn process(&self, site: &SiteConfig, _change_set: &ChangeSet) -> Result<()> {
        let url = self.url_for(site);
        let response = self.client.execute(self.method, &url)?;

        let message = format!(
            "{} {} response: status = {}, body = {}",
            self.method, url, response.status, response.body
        );
        if response.status == 200 {
            info!("{}", message);
        } else {
            error!("{}", message);
        }
        Ok(())
    }
}
