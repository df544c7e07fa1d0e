//! Test utilities for the harvester
//!
//! A scripted in-memory browser: each catalog page is described up front
//! (does it load, does it have a variation dropdown, what does every option
//! link to) and the fake session plays it back through the same
//! `BrowserLauncher`/`BrowserSession` traits the WebDriver backend implements.
//! Every launch and quit is recorded so tests can check session lifecycle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::application::harvester::{HarvestSettings, SitePlan};
use crate::infrastructure::browser::{
    BrowserError, BrowserLauncher, BrowserResult, BrowserSession, Selector, WaitCondition,
};
use crate::infrastructure::config::{SiteConfig, defaults};

/// One dropdown option on a fake page
#[derive(Debug, Clone)]
pub struct FakeOption {
    pub label: String,
    pub href: Option<String>,
    pub stale_on_select: bool,
}

impl FakeOption {
    pub fn new(label: &str, href: Option<String>) -> Self {
        Self {
            label: label.to_string(),
            href,
            stale_on_select: false,
        }
    }

    /// Selecting this option fails as if the element was re-rendered
    #[must_use]
    pub const fn stale_on_select(mut self) -> Self {
        self.stale_on_select = true;
        self
    }
}

/// Scripted behaviour of one catalog page
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub ready: bool,
    pub options: Option<Vec<FakeOption>>,
    pub navigation_fails: bool,
}

impl FakePage {
    pub fn with_options(options: Vec<FakeOption>) -> Self {
        Self {
            ready: true,
            options: Some(options),
            navigation_fails: false,
        }
    }

    /// The page-ready element never shows up
    pub fn not_ready() -> Self {
        Self::default()
    }

    /// The page loads but has no variation dropdown
    pub fn without_control() -> Self {
        Self {
            ready: true,
            ..Self::default()
        }
    }

    /// Navigation itself errors out
    pub fn failing() -> Self {
        Self {
            navigation_fails: true,
            ..Self::default()
        }
    }
}

/// Pages keyed by zero-padded identifier
#[derive(Debug, Clone, Default)]
pub struct FakeSite {
    pages: HashMap<String, FakePage>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_page(mut self, id: u32, page: FakePage) -> Self {
        self.pages.insert(format!("{id:04}"), page);
        self
    }
}

/// Session lifecycle bookkeeping shared by a launcher and its sessions
#[derive(Debug, Default)]
pub struct FakeLog {
    pub launches: usize,
    pub quits: usize,
    pub live: usize,
    pub max_live: usize,
    pub navigations: Vec<String>,
}

pub struct FakeLauncher {
    site: Arc<FakeSite>,
    log: Arc<Mutex<FakeLog>>,
    launch_limit: Option<usize>,
}

impl FakeLauncher {
    pub fn new(site: FakeSite) -> Self {
        Self {
            site: Arc::new(site),
            log: Arc::new(Mutex::new(FakeLog::default())),
            launch_limit: None,
        }
    }

    /// Allow `launches` successful launches, then refuse every further one
    #[must_use]
    pub const fn failing_after(mut self, launches: usize) -> Self {
        self.launch_limit = Some(launches);
        self
    }

    pub fn log(&self) -> Arc<Mutex<FakeLog>> {
        Arc::clone(&self.log)
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    type Session = FakeSession;

    async fn launch(&self) -> BrowserResult<FakeSession> {
        let mut log = self.log.lock().unwrap();
        if self.launch_limit.is_some_and(|limit| log.launches >= limit) {
            return Err(BrowserError::Session("chromedriver refused connection".into()));
        }
        log.launches += 1;
        log.live += 1;
        log.max_live = log.max_live.max(log.live);
        drop(log);

        Ok(FakeSession {
            site: Arc::clone(&self.site),
            log: Arc::clone(&self.log),
            plan: fake_site_plan(),
            page: None,
            dropdown_open: false,
            selected: None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeElement {
    Body,
    Control,
    Option(usize),
    Link(usize),
}

pub struct FakeSession {
    site: Arc<FakeSite>,
    log: Arc<Mutex<FakeLog>>,
    plan: SitePlan,
    page: Option<FakePage>,
    dropdown_open: bool,
    selected: Option<usize>,
}

impl FakeSession {
    fn options(&self) -> &[FakeOption] {
        self.page
            .as_ref()
            .and_then(|p| p.options.as_deref())
            .unwrap_or_default()
    }

    fn is_ready(&self) -> bool {
        self.page.as_ref().is_some_and(|p| p.ready)
    }

    fn has_control(&self) -> bool {
        self.is_ready() && self.page.as_ref().is_some_and(|p| p.options.is_some())
    }

    fn selected_link(&self) -> Option<usize> {
        self.selected
            .filter(|&i| self.options().get(i).is_some_and(|o| o.href.is_some()))
    }

    fn locate(&self, selector: &Selector) -> Option<FakeElement> {
        if *selector == Selector::tag(defaults::PAGE_READY_TAG) {
            self.is_ready().then_some(FakeElement::Body)
        } else if *selector == Selector::css(defaults::CONTROL_CSS) {
            self.has_control().then_some(FakeElement::Control)
        } else if *selector == Selector::xpath(defaults::DOWNLOAD_LINK_XPATH) {
            self.selected_link().map(FakeElement::Link)
        } else if self.dropdown_open {
            self.options()
                .iter()
                .position(|o| self.plan.option_selector(o.label.trim()) == *selector)
                .map(FakeElement::Option)
        } else {
            None
        }
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    type Element = FakeElement;

    async fn navigate(&mut self, url: &str) -> BrowserResult<()> {
        self.log.lock().unwrap().navigations.push(url.to_string());
        let id = url.rsplit('/').next().unwrap_or_default();
        let page = self.site.pages.get(id).cloned().unwrap_or_default();

        self.dropdown_open = false;
        self.selected = None;
        if page.navigation_fails {
            self.page = None;
            return Err(BrowserError::Command(format!("net::ERR_CONNECTION_RESET at {url}")));
        }
        self.page = Some(page);
        Ok(())
    }

    async fn wait_for(
        &mut self,
        selector: &Selector,
        _condition: WaitCondition,
        _timeout: Duration,
    ) -> BrowserResult<Option<FakeElement>> {
        Ok(self.locate(selector))
    }

    async fn find(&mut self, selector: &Selector) -> BrowserResult<FakeElement> {
        self.locate(selector)
            .ok_or_else(|| BrowserError::NoSuchElement(selector.to_string()))
    }

    async fn find_all(&mut self, selector: &Selector) -> BrowserResult<Vec<FakeElement>> {
        if *selector == Selector::css(defaults::OPTION_CSS) {
            if !self.dropdown_open {
                return Ok(Vec::new());
            }
            return Ok((0..self.options().len()).map(FakeElement::Option).collect());
        }
        Ok(self.locate(selector).into_iter().collect())
    }

    async fn click(&mut self, element: &FakeElement) -> BrowserResult<()> {
        match *element {
            FakeElement::Control => self.dropdown_open = true,
            FakeElement::Body => self.dropdown_open = false,
            FakeElement::Option(i) => {
                self.dropdown_open = false;
                if self.options().get(i).is_some_and(|o| o.stale_on_select) {
                    return Err(BrowserError::StaleElement(format!("option {i} was re-rendered")));
                }
                self.selected = Some(i);
            }
            FakeElement::Link(_) => {}
        }
        Ok(())
    }

    async fn text(&mut self, element: &FakeElement) -> BrowserResult<String> {
        Ok(match *element {
            FakeElement::Option(i) => self
                .options()
                .get(i)
                .map(|o| o.label.clone())
                .unwrap_or_default(),
            _ => String::new(),
        })
    }

    async fn attribute(&mut self, element: &FakeElement, name: &str) -> BrowserResult<Option<String>> {
        Ok(match (*element, name) {
            (FakeElement::Link(i), "href") => self.options().get(i).and_then(|o| o.href.clone()),
            _ => None,
        })
    }

    async fn quit(self) -> BrowserResult<()> {
        let mut log = self.log.lock().unwrap();
        log.quits += 1;
        log.live -= 1;
        Ok(())
    }
}

/// Site plan built from the default selectors the fake understands
pub fn fake_site_plan() -> SitePlan {
    SitePlan::from_config(&SiteConfig::default()).unwrap()
}

/// Settings with every settle and cooldown at zero
pub const fn instant_settings(restart_after: u32) -> HarvestSettings {
    HarvestSettings {
        restart_after,
        page_ready_timeout: Duration::from_millis(15_000),
        control_timeout: Duration::from_millis(10_000),
        download_timeout: Duration::from_millis(5_000),
        page_settle: Duration::ZERO,
        control_settle: Duration::ZERO,
        selection_settle: Duration::ZERO,
        entry_cooldown: Duration::ZERO,
        restart_cooldown: Duration::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_session_lifecycle_is_recorded() {
        let launcher = FakeLauncher::new(FakeSite::new()).failing_after(1);
        let log = launcher.log();

        let session = launcher.launch().await.unwrap();
        assert!(launcher.launch().await.is_err());
        session.quit().await.unwrap();

        let log = log.lock().unwrap();
        assert_eq!((log.launches, log.quits, log.live, log.max_live), (1, 1, 0, 1));
    }

    #[tokio::test]
    async fn test_unknown_page_never_becomes_ready() {
        let mut session = FakeLauncher::new(FakeSite::new()).launch().await.unwrap();
        session.navigate("https://sprites.pmdcollab.org/#/0042").await.unwrap();

        let body = session
            .wait_for(&Selector::tag("body"), WaitCondition::Present, Duration::ZERO)
            .await
            .unwrap();
        assert!(body.is_none());
    }
}
