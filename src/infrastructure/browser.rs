//! Browser capability seam
//!
//! The harvester talks to a browser only through [`BrowserLauncher`] and
//! [`BrowserSession`]. Production runs use the WebDriver implementation in
//! `infrastructure::webdriver`; tests drive a scripted in-memory page.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrowserError {
    #[error("Element went stale: {0}")]
    StaleElement(String),

    #[error("Element not found: {0}")]
    NoSuchElement(String),

    #[error("Element not interactable: {0}")]
    NotInteractable(String),

    #[error("Browser session failed: {0}")]
    Session(String),

    #[error("Browser command failed: {0}")]
    Command(String),
}

impl BrowserError {
    /// UI-consistency failures: the page changed under us between read and use
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::StaleElement(_) | Self::NoSuchElement(_) | Self::NotInteractable(_)
        )
    }
}

pub type BrowserResult<T> = Result<T, BrowserError>;

/// Element locator
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Css(String),
    XPath(String),
    Tag(String),
}

impl Selector {
    pub fn css(value: impl Into<String>) -> Self {
        Self::Css(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self::XPath(value.into())
    }

    pub fn tag(value: impl Into<String>) -> Self {
        Self::Tag(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Css(s) | Self::XPath(s) | Self::Tag(s) => s,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css:{s}"),
            Self::XPath(s) => write!(f, "xpath:{s}"),
            Self::Tag(s) => write!(f, "tag:{s}"),
        }
    }
}

/// What a bounded wait is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    Present,
    Clickable,
}

/// One live browser session
#[async_trait]
pub trait BrowserSession: Send {
    type Element: Clone + Send + Sync;

    async fn navigate(&mut self, url: &str) -> BrowserResult<()>;

    /// Poll until an element matching `selector` satisfies `condition`.
    /// `Ok(None)` means the timeout expired.
    async fn wait_for(
        &mut self,
        selector: &Selector,
        condition: WaitCondition,
        timeout: Duration,
    ) -> BrowserResult<Option<Self::Element>>;

    async fn find(&mut self, selector: &Selector) -> BrowserResult<Self::Element>;

    /// Matching elements in document order
    async fn find_all(&mut self, selector: &Selector) -> BrowserResult<Vec<Self::Element>>;

    async fn click(&mut self, element: &Self::Element) -> BrowserResult<()>;

    async fn text(&mut self, element: &Self::Element) -> BrowserResult<String>;

    async fn attribute(&mut self, element: &Self::Element, name: &str)
    -> BrowserResult<Option<String>>;

    /// Dispose of the session; nothing may use it afterwards
    async fn quit(self) -> BrowserResult<()>;
}

/// Creates fresh sessions
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    type Session: BrowserSession;

    async fn launch(&self) -> BrowserResult<Self::Session>;
}
