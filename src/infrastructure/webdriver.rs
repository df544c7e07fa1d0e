//! WebDriver-backed browser sessions
//!
//! Talks to a running chromedriver (or any W3C WebDriver server) through
//! `thirtyfour`, launching headless Chrome with the configured arguments.

use std::time::Duration;

use async_trait::async_trait;
use thirtyfour::ChromiumLikeCapabilities;
use thirtyfour::error::WebDriverErrorInner;
use thirtyfour::prelude::{
    By, DesiredCapabilities, ElementQueryable, WebDriver, WebDriverError, WebElement,
};
use tracing::debug;

use super::browser::{
    BrowserError, BrowserLauncher, BrowserResult, BrowserSession, Selector, WaitCondition,
};
use super::config::{BrowserConfig, HarvestConfig};

impl From<WebDriverError> for BrowserError {
    fn from(err: WebDriverError) -> Self {
        let message = err.to_string();
        match err.as_inner() {
            WebDriverErrorInner::StaleElementReference(_) => Self::StaleElement(message),
            WebDriverErrorInner::NoSuchElement(_) => Self::NoSuchElement(message),
            WebDriverErrorInner::ElementNotInteractable(_)
            | WebDriverErrorInner::ElementClickIntercepted(_) => Self::NotInteractable(message),
            WebDriverErrorInner::InvalidSessionId(_) | WebDriverErrorInner::SessionNotCreated(_) => {
                Self::Session(message)
            }
            _ => Self::Command(message),
        }
    }
}

fn by(selector: &Selector) -> By {
    match selector {
        Selector::Css(s) => By::Css(s.as_str()),
        Selector::XPath(s) => By::XPath(s.as_str()),
        Selector::Tag(s) => By::Tag(s.as_str()),
    }
}

/// Launches one headless Chrome per session
pub struct WebDriverLauncher {
    browser: BrowserConfig,
    poll_interval: Duration,
}

impl WebDriverLauncher {
    #[must_use]
    pub fn new(browser: BrowserConfig, harvest: &HarvestConfig) -> Self {
        Self {
            browser,
            poll_interval: harvest.poll_interval(),
        }
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    type Session = WebDriverSession;

    async fn launch(&self) -> BrowserResult<WebDriverSession> {
        let mut caps = DesiredCapabilities::chrome();
        for arg in &self.browser.chrome_args {
            caps.add_arg(arg)
                .map_err(|e| BrowserError::Session(format!("Invalid Chrome argument {arg}: {e}")))?;
        }
        if let Some(binary) = &self.browser.chrome_binary {
            caps.set_binary(binary)
                .map_err(|e| BrowserError::Session(format!("Invalid Chrome binary {binary}: {e}")))?;
        }

        let driver = WebDriver::new(self.browser.webdriver_url.as_str(), caps)
            .await
            .map_err(|e| {
                BrowserError::Session(format!(
                    "Failed to start session via {}: {e}",
                    self.browser.webdriver_url
                ))
            })?;

        debug!("WebDriver session started via {}", self.browser.webdriver_url);
        Ok(WebDriverSession {
            driver,
            poll_interval: self.poll_interval,
        })
    }
}

pub struct WebDriverSession {
    driver: WebDriver,
    poll_interval: Duration,
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    type Element = WebElement;

    async fn navigate(&mut self, url: &str) -> BrowserResult<()> {
        self.driver.goto(url).await.map_err(|e| match BrowserError::from(e) {
            // A page that cannot be loaded is a session problem, never a UI glitch
            err if err.is_transient() => BrowserError::Command(err.to_string()),
            err => err,
        })
    }

    async fn wait_for(
        &mut self,
        selector: &Selector,
        condition: WaitCondition,
        timeout: Duration,
    ) -> BrowserResult<Option<WebElement>> {
        let query = self.driver.query(by(selector)).wait(timeout, self.poll_interval);
        let query = match condition {
            WaitCondition::Present => query,
            WaitCondition::Clickable => query.and_clickable(),
        };

        // An expired wait yields an empty match, not an error
        Ok(query.first_opt().await?)
    }

    async fn find(&mut self, selector: &Selector) -> BrowserResult<WebElement> {
        Ok(self.driver.find(by(selector)).await?)
    }

    async fn find_all(&mut self, selector: &Selector) -> BrowserResult<Vec<WebElement>> {
        Ok(self.driver.find_all(by(selector)).await?)
    }

    async fn click(&mut self, element: &WebElement) -> BrowserResult<()> {
        Ok(element.click().await?)
    }

    async fn text(&mut self, element: &WebElement) -> BrowserResult<String> {
        Ok(element.text().await?)
    }

    async fn attribute(&mut self, element: &WebElement, name: &str) -> BrowserResult<Option<String>> {
        Ok(element.attr(name).await?)
    }

    async fn quit(self) -> BrowserResult<()> {
        self.driver
            .quit()
            .await
            .map_err(|e| BrowserError::Session(format!("Failed to quit session: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thirtyfour::error::WebDriverErrorInfo;

    fn server_error(inner: fn(WebDriverErrorInfo) -> WebDriverErrorInner) -> BrowserError {
        WebDriverError::from_inner(inner(WebDriverErrorInfo::new("from server".to_string()))).into()
    }

    #[test]
    fn test_ui_consistency_errors_are_transient() {
        assert!(matches!(
            server_error(WebDriverErrorInner::StaleElementReference),
            BrowserError::StaleElement(_)
        ));
        assert!(matches!(
            server_error(WebDriverErrorInner::NoSuchElement),
            BrowserError::NoSuchElement(_)
        ));
        assert!(matches!(
            server_error(WebDriverErrorInner::ElementClickIntercepted),
            BrowserError::NotInteractable(_)
        ));
        assert!(server_error(WebDriverErrorInner::ElementNotInteractable).is_transient());
    }

    #[test]
    fn test_session_and_other_errors_are_not_transient() {
        let lost = server_error(WebDriverErrorInner::InvalidSessionId);
        assert!(matches!(lost, BrowserError::Session(_)));
        assert!(!lost.is_transient());

        let refused: BrowserError =
            WebDriverError::from_inner(WebDriverErrorInner::RequestFailed("connection refused".into()))
                .into();
        assert!(matches!(refused, BrowserError::Command(_)));
        assert!(!refused.is_transient());
    }
}
