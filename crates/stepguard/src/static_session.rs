//! Static-HTML session over plain HTTP
//!
//! Fetches pages with reqwest and keeps cookies between requests. It cannot
//! run scripts or take screenshots, so only the signature scan and markup
//! validation apply to it.

use async_trait::async_trait;
use reqwest::cookie::Jar;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::ValidationConfig;
use crate::error::{GuardError, GuardResult};
use crate::session::{Capabilities, Session};

/// Client used to re-fetch a page's static source
pub(crate) fn static_client(config: &ValidationConfig) -> GuardResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .build()?)
}

/// GET `url` and return its body
pub async fn fetch_static(client: &reqwest::Client, url: &str) -> GuardResult<String> {
    debug!("Fetching static source of {}", url);
    let response = client.get(url).send().await?;
    Ok(response.text().await?)
}

#[derive(Debug, Default)]
struct PageState {
    url: Option<reqwest::Url>,
    html: Option<String>,
}

#[derive(Debug)]
pub struct StaticSession {
    client: reqwest::Client,
    jar: Arc<Jar>,
    base_url: Option<reqwest::Url>,
    page: Mutex<PageState>,
}

impl StaticSession {
    pub fn new(base_url: Option<&str>, config: &ValidationConfig) -> GuardResult<Self> {
        let base_url = base_url
            .map(|b| {
                reqwest::Url::parse(b).map_err(|e| GuardError::InvalidUrl {
                    url: b.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .cookie_provider(Arc::clone(&jar))
            .build()?;

        Ok(Self {
            client,
            jar,
            base_url,
            page: Mutex::new(PageState::default()),
        })
    }

    fn resolve(&self, url: &str, current: Option<&reqwest::Url>) -> GuardResult<reqwest::Url> {
        let parsed = match current.or(self.base_url.as_ref()) {
            Some(base) => base.join(url),
            None => reqwest::Url::parse(url),
        };
        parsed.map_err(|e| GuardError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl Session for StaticSession {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            script_evaluation: false,
            screenshots: false,
            cookies: true,
        }
    }

    async fn current_url(&self) -> GuardResult<Option<String>> {
        Ok(self.page.lock().await.url.as_ref().map(|u| u.to_string()))
    }

    async fn page_html(&self) -> GuardResult<Option<String>> {
        Ok(self.page.lock().await.html.clone())
    }

    async fn visit(&self, url: &str) -> GuardResult<()> {
        let mut page = self.page.lock().await;
        let target = self.resolve(url, page.url.as_ref())?;
        info!("Visiting {}", target);

        let response = self.client.get(target).send().await?;
        let final_url = response.url().clone();
        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or(true, |ct| ct.contains("html"));
        let body = response.text().await?;

        page.url = Some(final_url);
        page.html = is_html.then_some(body);
        Ok(())
    }

    async fn set_cookie(&self, name: &str, value: &str) -> GuardResult<()> {
        let page = self.page.lock().await;
        let Some(target) = page.url.as_ref().or(self.base_url.as_ref()) else {
            return Err(GuardError::Session(
                "cannot set a cookie before any URL is known".to_string(),
            ));
        };
        self.jar.add_cookie_str(&format!("{name}={value}; Path=/"), target);
        Ok(())
    }
}
