#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use lopdf::dictionary;
use lopdf::{Document, Object, Stream};

use paycheck_mailer::error::DriverError;
use paycheck_mailer::infrastructure::{Locator, PortalDriver, SelectState};

/// What the fake page was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Navigate(String),
    Fill(Locator, String),
    Click(Locator),
    Select(Locator, String),
    Download(Locator),
    Reset,
    Close,
}

/// Page change caused by a click
#[derive(Debug, Clone, Copy)]
pub enum Effect {
    Show(Locator),
    Hide(Locator),
}

/// Shared view on a [`FakeDriver`] that outlives moving the driver
#[derive(Clone, Default)]
pub struct DriverProbe {
    actions: Arc<Mutex<Vec<Action>>>,
    closed: Arc<AtomicBool>,
}

impl DriverProbe {
    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }

    pub fn selections(&self) -> Vec<(Locator, String)> {
        self.actions()
            .into_iter()
            .filter_map(|a| match a {
                Action::Select(locator, value) => Some((locator, value)),
                _ => None,
            })
            .collect()
    }

    pub fn downloads(&self) -> usize {
        self.actions()
            .iter()
            .filter(|a| matches!(a, Action::Download(_)))
            .count()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Scripted in-memory page
///
/// Everything is present and visible unless hidden. Waits never sleep: they
/// either succeed right away or report a timeout.
#[derive(Default)]
pub struct FakeDriver {
    hidden: HashSet<Locator>,
    selects: HashMap<Locator, SelectState>,
    ignored_selects: HashSet<Locator>,
    on_click: HashMap<Locator, Vec<Effect>>,
    download_files: Vec<(String, Vec<u8>)>,
    probe: DriverProbe,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hide(mut self, locator: Locator) -> Self {
        self.hidden.insert(locator);
        self
    }

    pub fn with_select(mut self, locator: Locator, options: &[&str], selected: Option<&str>) -> Self {
        self.selects.insert(
            locator,
            SelectState {
                selected: selected.map(str::to_string),
                options: options.iter().map(|o| o.to_string()).collect(),
            },
        );
        self
    }

    /// Selecting on `locator` is accepted but never changes the value
    pub fn ignore_selection(mut self, locator: Locator) -> Self {
        self.ignored_selects.insert(locator);
        self
    }

    pub fn on_click(mut self, locator: Locator, effect: Effect) -> Self {
        self.on_click.entry(locator).or_default().push(effect);
        self
    }

    /// Files the browser "downloads" into the target directory
    pub fn downloads(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.download_files.push((name.to_string(), bytes));
        self
    }

    pub fn probe(&self) -> DriverProbe {
        self.probe.clone()
    }

    fn record(&self, action: Action) {
        self.probe.actions.lock().unwrap().push(action);
    }

    fn visible(&self, locator: Locator) -> bool {
        !self.hidden.contains(&locator)
    }

    fn timeout(what: String, after: Duration) -> DriverError {
        DriverError::Timeout { what, after }
    }
}

#[async_trait]
impl PortalDriver for FakeDriver {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.record(Action::Navigate(url.to_string()));
        Ok(())
    }

    async fn fill(&mut self, locator: Locator, text: &str) -> Result<(), DriverError> {
        if !self.visible(locator) {
            return Err(DriverError::NotFound(locator.to_string()));
        }
        self.record(Action::Fill(locator, text.to_string()));
        Ok(())
    }

    async fn click(&mut self, locator: Locator) -> Result<(), DriverError> {
        if !self.visible(locator) {
            return Err(DriverError::NotFound(locator.to_string()));
        }
        self.record(Action::Click(locator));
        for effect in self.on_click.get(&locator).cloned().unwrap_or_default() {
            match effect {
                Effect::Show(target) => {
                    self.hidden.remove(&target);
                }
                Effect::Hide(target) => {
                    self.hidden.insert(target);
                }
            }
        }
        Ok(())
    }

    async fn wait_for(&mut self, locator: Locator, timeout: Duration) -> Result<(), DriverError> {
        if self.visible(locator) {
            Ok(())
        } else {
            Err(Self::timeout(locator.to_string(), timeout))
        }
    }

    async fn wait_for_hidden(&mut self, locator: Locator, timeout: Duration) -> Result<(), DriverError> {
        if self.visible(locator) {
            Err(Self::timeout(format!("{} to disappear", locator), timeout))
        } else {
            Ok(())
        }
    }

    async fn wait_for_network_idle(&mut self, _timeout: Duration) -> Result<(), DriverError> {
        Ok(())
    }

    async fn is_visible(&mut self, locator: Locator) -> Result<bool, DriverError> {
        Ok(self.visible(locator))
    }

    async fn select(&mut self, locator: Locator, value: &str) -> Result<(), DriverError> {
        let ignored = self.ignored_selects.contains(&locator);
        let state = self
            .selects
            .get_mut(&locator)
            .ok_or_else(|| DriverError::NotFound(locator.to_string()))?;
        if !state.options.iter().any(|o| o == value) {
            return Err(DriverError::OptionNotFound {
                locator: locator.to_string(),
                value: value.to_string(),
            });
        }
        if !ignored {
            state.selected = Some(value.to_string());
        }
        self.record(Action::Select(locator, value.to_string()));
        Ok(())
    }

    async fn select_state(&mut self, locator: Locator) -> Result<SelectState, DriverError> {
        self.selects
            .get(&locator)
            .cloned()
            .ok_or_else(|| DriverError::NotFound(locator.to_string()))
    }

    async fn download(
        &mut self,
        trigger: Locator,
        dir: &Path,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        if !self.visible(trigger) {
            return Err(Self::timeout(format!("download triggered by {}", trigger), timeout));
        }
        self.record(Action::Download(trigger));
        for (name, bytes) in &self.download_files {
            std::fs::write(dir.join(name), bytes).map_err(|e| DriverError::Protocol(e.to_string()))?;
        }
        Ok(())
    }

    async fn reset(&mut self) -> Result<(), DriverError> {
        self.record(Action::Reset);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.record(Action::Close);
        self.probe.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// A minimal one-page PDF
pub fn sample_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let content = Stream::new(dictionary! {}, b"BT /F1 12 Tf 72 720 Td (paycheck) Tj ET".to_vec());
    let content_id = doc.add_object(content);

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serialize pdf");
    bytes
}
