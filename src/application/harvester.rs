//! Variation harvester
//!
//! Walks the catalog entries one at a time through a single browser session,
//! opening each entry's page, enumerating the variation dropdown and resolving
//! every option to the path fragment of its `sprites.zip` archive.
//!
//! The driver loop owns the session. Each entry produces an [`EntryOutcome`];
//! the loop decides from it (and from how long the session has been in use)
//! whether the session is replaced before the next entry.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};
use url::Url;

use super::errors::{RunError, RunResult};
use crate::domain::{
    CatalogEntry, HarvestMap, Identifier, OptionSkip, SkipReason, Variation, VariationRecord,
    extract_path_fragment,
};
use crate::infrastructure::browser::{
    BrowserError, BrowserLauncher, BrowserResult, BrowserSession, Selector, WaitCondition,
};
use crate::infrastructure::config::{HarvestConfig, SiteConfig};

/// Timeouts, settle delays and restart cadence of one harvest run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestSettings {
    /// Entries processed on one session before it is replaced
    pub restart_after: u32,
    pub page_ready_timeout: Duration,
    pub control_timeout: Duration,
    pub download_timeout: Duration,
    pub page_settle: Duration,
    pub control_settle: Duration,
    pub selection_settle: Duration,
    pub entry_cooldown: Duration,
    pub restart_cooldown: Duration,
}

impl From<&HarvestConfig> for HarvestSettings {
    fn from(config: &HarvestConfig) -> Self {
        Self {
            restart_after: config.restart_after.max(1),
            page_ready_timeout: config.page_ready_timeout(),
            control_timeout: config.control_timeout(),
            download_timeout: config.download_timeout(),
            page_settle: Duration::from_millis(config.page_settle_ms),
            control_settle: Duration::from_millis(config.control_settle_ms),
            selection_settle: Duration::from_millis(config.selection_settle_ms),
            entry_cooldown: Duration::from_millis(config.entry_cooldown_ms),
            restart_cooldown: Duration::from_millis(config.restart_cooldown_ms),
        }
    }
}

/// Where entry pages live and how their variation UI is located
#[derive(Debug, Clone)]
pub struct SitePlan {
    base_url: Url,
    page_ready: Selector,
    control: Selector,
    options: Selector,
    option_xpath_template: String,
    download_links: Selector,
}

impl SitePlan {
    pub fn from_config(config: &SiteConfig) -> Result<Self, url::ParseError> {
        Ok(Self {
            base_url: Url::parse(&config.base_url)?,
            page_ready: Selector::tag(&config.page_ready_tag),
            control: Selector::css(&config.control_css),
            options: Selector::css(&config.option_css),
            option_xpath_template: config.option_xpath_template.clone(),
            download_links: Selector::xpath(&config.download_link_xpath),
        })
    }

    /// `https://sprites.pmdcollab.org/#/0025` for identifier 25
    #[must_use]
    pub fn entry_url(&self, identifier: Identifier) -> String {
        let mut url = self.base_url.clone();
        url.set_fragment(Some(&format!("/{}", identifier.padded())));
        url.to_string()
    }

    /// XPath of the option whose normalised text equals `label`
    #[must_use]
    pub fn option_selector(&self, label: &str) -> Selector {
        Selector::xpath(
            self.option_xpath_template
                .replace("{label}", &xpath_literal(label)),
        )
    }
}

/// Render `value` as an XPath 1.0 string literal.
///
/// XPath has no escape sequences, so a value holding both quote kinds is
/// spliced together with `concat()`.
#[must_use]
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    if !value.contains('"') {
        return format!("\"{value}\"");
    }

    let parts: Vec<String> = value.split('\'').map(|part| format!("'{part}'")).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// Result of processing one catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Success(VariationRecord),
    Skip(SkipReason),

    /// The session is no longer trustworthy; replace it before the next entry
    SessionFailure(BrowserError),
}

/// Result of processing one option label
pub type OptionOutcome = Result<Variation, OptionSkip>;

/// Counters of one harvest run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HarvestStats {
    pub entries_attempted: usize,
    pub entries_harvested: usize,
    pub entries_skipped: usize,
    pub session_failures: usize,
    pub sessions_launched: usize,
    pub options_skipped: usize,
    pub variations_found: usize,

    /// Entry skips keyed by [`SkipReason::kind`]
    pub skips_by_kind: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default)]
pub struct HarvestReport {
    pub records: HarvestMap,
    pub stats: HarvestStats,
}

type SessionElement<L> = <<L as BrowserLauncher>::Session as BrowserSession>::Element;

/// Sequential harvester over a browser launcher
pub struct Harvester<L: BrowserLauncher> {
    launcher: L,
    site: SitePlan,
    settings: HarvestSettings,
}

impl<L: BrowserLauncher> Harvester<L> {
    pub const fn new(launcher: L, site: SitePlan, settings: HarvestSettings) -> Self {
        Self {
            launcher,
            site,
            settings,
        }
    }

    /// Harvest every entry in order.
    ///
    /// Only a session that cannot be created aborts the run; everything else
    /// is logged, counted and skipped.
    pub async fn harvest_all(&self, entries: &[CatalogEntry]) -> RunResult<HarvestReport> {
        let mut report = HarvestReport::default();
        if entries.is_empty() {
            info!("No catalog entries to harvest");
            return Ok(report);
        }

        info!(
            "🚀 Harvesting {} entries (session restart every {} entries)",
            entries.len(),
            self.settings.restart_after
        );

        let mut session = self.launch(&mut report.stats).await?;
        let mut session_age: u32 = 0;
        let mut session_broken = false;

        for (index, entry) in entries.iter().enumerate() {
            if session_broken || session_age >= self.settings.restart_after {
                if session_broken {
                    info!("🔄 Replacing browser session after a failure");
                } else {
                    info!("🔄 Restarting browser session after {} entries", session_age);
                }
                session = self.replace(session, &mut report.stats).await?;
                session_age = 0;
                session_broken = false;
            }

            info!(
                "[{}/{}] Processing {} - {}",
                index + 1,
                entries.len(),
                entry.identifier,
                entry.name
            );
            report.stats.entries_attempted += 1;

            let outcome = self.harvest_entry(&mut session, entry, &mut report.stats).await;
            session_age += 1;

            match outcome {
                EntryOutcome::Success(record) => {
                    info!("  ✅ {} variations found", record.len());
                    report.stats.entries_harvested += 1;
                    report.stats.variations_found += record.len();
                    report.records.insert(entry.identifier, record);
                }
                EntryOutcome::Skip(reason) => {
                    warn!("  ⚠️ Skipping {}: {}", entry.identifier, reason);
                    report.stats.entries_skipped += 1;
                    *report
                        .stats
                        .skips_by_kind
                        .entry(reason.kind().to_string())
                        .or_default() += 1;
                }
                EntryOutcome::SessionFailure(err) => {
                    error!("  ❌ Error processing {}: {}", entry.identifier, err);
                    report.stats.entries_skipped += 1;
                    report.stats.session_failures += 1;
                    session_broken = true;
                }
            }

            pause(self.settings.entry_cooldown).await;
        }

        if let Err(e) = session.quit().await {
            warn!("Failed to close final browser session: {}", e);
        }

        info!(
            "🏁 Harvest finished: {} harvested, {} skipped, {} session failures",
            report.stats.entries_harvested,
            report.stats.entries_skipped,
            report.stats.session_failures
        );
        Ok(report)
    }

    /// Process one entry on `session`
    pub async fn harvest_entry(
        &self,
        session: &mut L::Session,
        entry: &CatalogEntry,
        stats: &mut HarvestStats,
    ) -> EntryOutcome {
        match self.try_harvest_entry(session, entry, stats).await {
            Ok(Ok(record)) if record.is_empty() => EntryOutcome::Skip(SkipReason::NoVariations),
            Ok(Ok(record)) => EntryOutcome::Success(record),
            Ok(Err(reason)) => EntryOutcome::Skip(reason),
            Err(e) => EntryOutcome::SessionFailure(e),
        }
    }

    async fn try_harvest_entry(
        &self,
        session: &mut L::Session,
        entry: &CatalogEntry,
        stats: &mut HarvestStats,
    ) -> BrowserResult<Result<VariationRecord, SkipReason>> {
        let url = self.site.entry_url(entry.identifier);
        debug!("Navigating to {}", url);
        session.navigate(&url).await?;

        let ready = session
            .wait_for(
                &self.site.page_ready,
                WaitCondition::Present,
                self.settings.page_ready_timeout,
            )
            .await?;
        if ready.is_none() {
            return Ok(Err(SkipReason::DiscoveryTimeout {
                timeout_ms: duration_ms(self.settings.page_ready_timeout),
            }));
        }
        pause(self.settings.page_settle).await;

        let Some(control) = session
            .wait_for(
                &self.site.control,
                WaitCondition::Clickable,
                self.settings.control_timeout,
            )
            .await?
        else {
            return Ok(Err(SkipReason::ControlNotFound {
                timeout_ms: duration_ms(self.settings.control_timeout),
            }));
        };

        let labels = self.capture_option_labels(session, &control).await?;
        debug!("  Available options: {:?}", labels);

        let mut record = VariationRecord::new();
        for label in &labels {
            match self.harvest_option(session, label).await? {
                Ok(variation) => {
                    debug!("    ✓ {} -> {}", variation.label, variation.path_fragment);
                    record.push(variation);
                }
                Err(skip) => {
                    warn!("    ⚠️ {}", skip);
                    stats.options_skipped += 1;
                }
            }
        }

        Ok(Ok(record))
    }

    /// Open the control, read every option label in display order, close it
    async fn capture_option_labels(
        &self,
        session: &mut L::Session,
        control: &SessionElement<L>,
    ) -> BrowserResult<Vec<String>> {
        session.click(control).await?;
        pause(self.settings.control_settle).await;

        let options = session.find_all(&self.site.options).await?;
        let mut labels = Vec::with_capacity(options.len());
        for option in &options {
            let label = session.text(option).await?;
            let label = label.trim();
            if label.is_empty() {
                debug!("  Ignoring option without a label");
                continue;
            }
            labels.push(label.to_string());
        }

        let body = session.find(&self.site.page_ready).await?;
        session.click(&body).await?;
        pause(self.settings.control_settle).await;

        Ok(labels)
    }

    /// Select one option and resolve its archive path.
    ///
    /// Transient UI failures become [`OptionSkip::TransientUi`]; any other
    /// browser error is returned and fails the whole entry.
    pub async fn harvest_option(
        &self,
        session: &mut L::Session,
        label: &str,
    ) -> BrowserResult<OptionOutcome> {
        match self.resolve_option(session, label).await {
            Err(e) if e.is_transient() => Ok(Err(OptionSkip::transient_ui(label, e))),
            other => other,
        }
    }

    async fn resolve_option(
        &self,
        session: &mut L::Session,
        label: &str,
    ) -> BrowserResult<OptionOutcome> {
        let control = session.find(&self.site.control).await?;
        session.click(&control).await?;
        pause(self.settings.control_settle).await;

        let option = session.find(&self.site.option_selector(label)).await?;
        session.click(&option).await?;
        pause(self.settings.selection_settle).await;

        let appeared = session
            .wait_for(
                &self.site.download_links,
                WaitCondition::Present,
                self.settings.download_timeout,
            )
            .await?;
        if appeared.is_none() {
            return Ok(Err(OptionSkip::no_download_link(label)));
        }

        let mut href = None;
        for link in session.find_all(&self.site.download_links).await? {
            if let Some(value) = session.attribute(&link, "href").await? {
                if !value.trim().is_empty() {
                    href = Some(value);
                    break;
                }
            }
        }
        let Some(href) = href else {
            return Ok(Err(OptionSkip::no_download_link(label)));
        };
        debug!("    URL found: {}", href);

        Ok(extract_path_fragment(&href)
            .map(|fragment| Variation::new(label, fragment))
            .ok_or_else(|| OptionSkip::pattern_mismatch(label, &href)))
    }

    async fn launch(&self, stats: &mut HarvestStats) -> RunResult<L::Session> {
        let session = self
            .launcher
            .launch()
            .await
            .map_err(RunError::session_unavailable)?;
        stats.sessions_launched += 1;
        pause(self.settings.restart_cooldown).await;
        Ok(session)
    }

    /// Quit `old` first so two sessions never coexist, then launch a new one
    async fn replace(&self, old: L::Session, stats: &mut HarvestStats) -> RunResult<L::Session> {
        if let Err(e) = old.quit().await {
            warn!("Failed to close browser session cleanly: {}", e);
        }
        self.launch(stats).await
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Identifier;
    use crate::test_utils::{
        FakeLauncher, FakeOption, FakePage, FakeSite, fake_site_plan, instant_settings,
    };

    fn entry(id: u32) -> CatalogEntry {
        CatalogEntry::new(Identifier::new(id), format!("Entry {id}"), id as usize)
    }

    fn archive(path: &str) -> String {
        format!("https://spriteserver.pmdcollab.org/assets/{path}/sprites.zip")
    }

    fn harvester(launcher: FakeLauncher, restart_after: u32) -> Harvester<FakeLauncher> {
        Harvester::new(launcher, fake_site_plan(), instant_settings(restart_after))
    }

    #[test]
    fn test_entry_url_pads_identifier() {
        let plan = fake_site_plan();
        assert_eq!(
            plan.entry_url(Identifier::new(25)),
            "https://sprites.pmdcollab.org/#/0025"
        );
    }

    #[test]
    fn test_xpath_literal_quoting() {
        assert_eq!(xpath_literal("Normal"), "'Normal'");
        assert_eq!(xpath_literal("Farfetch'd"), "\"Farfetch'd\"");
        assert_eq!(
            xpath_literal("a'b\"c"),
            "concat('a', \"'\", 'b\"c')"
        );
        assert_eq!(
            fake_site_plan().option_selector("Shiny").as_str(),
            "//*[@role='option' and normalize-space()='Shiny']"
        );
    }

    #[tokio::test]
    async fn test_labels_captured_in_order_and_skips_keep_alignment() {
        let site = FakeSite::new().with_page(
            25,
            FakePage::with_options(vec![
                FakeOption::new(" Normal ", Some(archive("0025"))),
                FakeOption::new("Shiny", None),
                FakeOption::new("Starter", Some("https://example.org/not-an-archive.zip".into())),
                FakeOption::new("Female", Some(archive("0025/0000/0000/0002"))),
            ]),
        );
        let launcher = FakeLauncher::new(site);
        let log = launcher.log();

        let report = harvester(launcher, 1).harvest_all(&[entry(25)]).await.unwrap();

        let record = &report.records[&Identifier::new(25)];
        let pairs: Vec<(&str, &str)> = record
            .iter()
            .map(|v| (v.label.as_str(), v.path_fragment.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![("Normal", "0025/"), ("Female", "0025/0000/0000/0002/")]
        );
        assert_eq!(report.stats.options_skipped, 2);
        assert_eq!(log.lock().unwrap().quits, 1);
    }

    #[tokio::test]
    async fn test_stale_option_is_skipped_without_failing_entry() {
        let site = FakeSite::new().with_page(
            1,
            FakePage::with_options(vec![
                FakeOption::new("Normal", Some(archive("0001"))).stale_on_select(),
                FakeOption::new("Shiny", Some(archive("0001/0000/0001"))),
            ]),
        );

        let report = harvester(FakeLauncher::new(site), 1)
            .harvest_all(&[entry(1)])
            .await
            .unwrap();

        let record = &report.records[&Identifier::new(1)];
        assert_eq!(record.joined_labels(';'), "Shiny");
        assert_eq!(report.stats.session_failures, 0);
    }

    #[tokio::test]
    async fn test_timeouts_and_empty_results_are_skips() {
        let site = FakeSite::new()
            .with_page(1, FakePage::not_ready())
            .with_page(2, FakePage::without_control())
            .with_page(3, FakePage::with_options(vec![FakeOption::new("Normal", None)]));

        let report = harvester(FakeLauncher::new(site), 1)
            .harvest_all(&[entry(1), entry(2), entry(3)])
            .await
            .unwrap();

        assert!(report.records.is_empty());
        assert_eq!(report.stats.entries_skipped, 3);
        assert_eq!(report.stats.skips_by_kind["discovery_timeout"], 1);
        assert_eq!(report.stats.skips_by_kind["control_not_found"], 1);
        assert_eq!(report.stats.skips_by_kind["no_variations"], 1);
        assert_eq!(report.stats.session_failures, 0);
    }

    #[tokio::test]
    async fn test_session_failure_replaces_session_and_continues() {
        let site = FakeSite::new()
            .with_page(1, FakePage::failing())
            .with_page(2, FakePage::with_options(vec![FakeOption::new("Normal", Some(archive("0002")))]));
        let launcher = FakeLauncher::new(site);
        let log = launcher.log();

        let report = harvester(launcher, 10)
            .harvest_all(&[entry(1), entry(2)])
            .await
            .unwrap();

        assert!(!report.records.contains_key(&Identifier::new(1)));
        assert!(report.records.contains_key(&Identifier::new(2)));
        assert_eq!(report.stats.session_failures, 1);

        let log = log.lock().unwrap();
        // the failure forces a replacement even though the cadence is 10
        assert_eq!(log.launches, 2);
        assert_eq!(log.quits, 2);
        assert_eq!(log.max_live, 1);
    }

    #[tokio::test]
    async fn test_restart_cadence_and_single_live_session() {
        let mut site = FakeSite::new();
        for id in 1..=5 {
            site = site.with_page(
                id,
                FakePage::with_options(vec![FakeOption::new("Normal", Some(archive(&format!("{id:04}"))))]),
            );
        }
        let entries: Vec<CatalogEntry> = (1..=5).map(entry).collect();

        let launcher = FakeLauncher::new(site.clone());
        let log = launcher.log();
        let report = harvester(launcher, 2).harvest_all(&entries).await.unwrap();
        assert_eq!(report.records.len(), 5);
        {
            let log = log.lock().unwrap();
            assert_eq!(log.launches, 3);
            assert_eq!(log.quits, 3);
            assert_eq!(log.max_live, 1);
            assert_eq!(log.live, 0);
        }

        let launcher = FakeLauncher::new(site);
        let log = launcher.log();
        harvester(launcher, 1).harvest_all(&entries).await.unwrap();
        assert_eq!(log.lock().unwrap().launches, 5);
    }

    #[tokio::test]
    async fn test_launch_failure_is_fatal() {
        let launcher = FakeLauncher::new(FakeSite::new()).failing_after(0);
        let err = harvester(launcher, 1).harvest_all(&[entry(1)]).await.unwrap_err();
        assert!(matches!(err, RunError::SessionUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_replacement_launch_failure_is_fatal() {
        let site = FakeSite::new()
            .with_page(1, FakePage::with_options(vec![FakeOption::new("Normal", Some(archive("0001")))]))
            .with_page(2, FakePage::with_options(vec![FakeOption::new("Normal", Some(archive("0002")))]));
        let launcher = FakeLauncher::new(site).failing_after(1);
        let log = launcher.log();

        let err = harvester(launcher, 1)
            .harvest_all(&[entry(1), entry(2)])
            .await
            .unwrap_err();

        assert!(matches!(err, RunError::SessionUnavailable { .. }));
        assert_eq!(log.lock().unwrap().live, 0);
    }

    #[tokio::test]
    async fn test_no_entries_never_launches() {
        let launcher = FakeLauncher::new(FakeSite::new());
        let log = launcher.log();
        let report = harvester(launcher, 1).harvest_all(&[]).await.unwrap();
        assert!(report.records.is_empty());
        assert_eq!(log.lock().unwrap().launches, 0);
    }
}
