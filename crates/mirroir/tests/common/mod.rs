//! Scripted device: an in-memory app the explorers can drive
//!
//! Screens are keyed by id; tapping an element whose text has a scripted
//! transition moves to the destination screen, the back chord pops the
//! history, and swipes reveal pre-scripted element batches.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use mirroir::device::{InputActuator, ScreenDescriber};
use mirroir::errors::ExplorerError;
use mirroir::types::{Icon, ScreenDescription, TapPoint};

/// How close a tap must land to an element to hit it.
const TAP_TOLERANCE: f64 = 2.0;

/// Route explorer logs through `RUST_LOG` when a test needs them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[derive(Default, Clone)]
pub struct FakeScreen {
    pub elements: Vec<TapPoint>,
    pub hints: Vec<String>,
    pub icons: Vec<Icon>,
    /// element text -> destination screen id
    pub transitions: HashMap<String, String>,
    /// element batches revealed by successive swipes
    pub scroll_batches: Vec<Vec<TapPoint>>,
}

impl FakeScreen {
    pub fn new(elements: Vec<TapPoint>) -> Self {
        Self {
            elements,
            ..Default::default()
        }
    }

    pub fn with_transition(mut self, text: &str, destination: &str) -> Self {
        self.transitions
            .insert(text.to_string(), destination.to_string());
        self
    }

    pub fn with_scroll_batch(mut self, batch: Vec<TapPoint>) -> Self {
        self.scroll_batches.push(batch);
        self
    }
}

struct DeviceState {
    screens: HashMap<String, FakeScreen>,
    current: String,
    history: Vec<String>,
    taps: Vec<(f64, f64)>,
    tap_texts: Vec<String>,
    back_presses: usize,
    swipes: usize,
    /// screen id -> how many scroll batches are visible
    scroll_progress: HashMap<String, usize>,
    fail_next_describe: bool,
}

pub struct ScriptedDevice {
    state: Mutex<DeviceState>,
}

impl ScriptedDevice {
    pub fn new(initial: &str, screens: Vec<(&str, FakeScreen)>) -> Self {
        Self {
            state: Mutex::new(DeviceState {
                screens: screens
                    .into_iter()
                    .map(|(id, s)| (id.to_string(), s))
                    .collect(),
                current: initial.to_string(),
                history: Vec::new(),
                taps: Vec::new(),
                tap_texts: Vec::new(),
                back_presses: 0,
                swipes: 0,
                scroll_progress: HashMap::new(),
                fail_next_describe: false,
            }),
        }
    }

    pub fn current_screen(&self) -> String {
        self.lock().current.clone()
    }

    pub fn tap_texts(&self) -> Vec<String> {
        self.lock().tap_texts.clone()
    }

    pub fn back_presses(&self) -> usize {
        self.lock().back_presses
    }

    pub fn swipes(&self) -> usize {
        self.lock().swipes
    }

    pub fn fail_next_describe(&self) {
        self.lock().fail_next_describe = true;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap()
    }
}

impl DeviceState {
    fn visible_elements(&self) -> Vec<TapPoint> {
        let screen = match self.screens.get(&self.current) {
            Some(screen) => screen,
            None => return Vec::new(),
        };
        let mut elements = screen.elements.clone();
        let revealed = self.scroll_progress.get(&self.current).copied().unwrap_or(0);
        for batch in screen.scroll_batches.iter().take(revealed) {
            elements.extend(batch.iter().cloned());
        }
        elements
    }
}

#[async_trait]
impl ScreenDescriber for ScriptedDevice {
    async fn describe(&self, _skip_ocr: bool) -> Result<ScreenDescription, ExplorerError> {
        let mut state = self.lock();
        if state.fail_next_describe {
            state.fail_next_describe = false;
            return Err(ExplorerError::OcrFailed("scripted failure".to_string()));
        }
        let screen = state
            .screens
            .get(&state.current)
            .cloned()
            .unwrap_or_default();
        Ok(ScreenDescription {
            elements: state.visible_elements(),
            hints: screen.hints,
            icons: screen.icons,
            screenshot_base64: String::new(),
        })
    }
}

#[async_trait]
impl InputActuator for ScriptedDevice {
    async fn tap(&self, x: f64, y: f64) -> Result<(), ExplorerError> {
        let mut state = self.lock();
        state.taps.push((x, y));
        let hit = state
            .visible_elements()
            .into_iter()
            .find(|e| (e.x - x).abs() <= TAP_TOLERANCE && (e.y - y).abs() <= TAP_TOLERANCE);
        if let Some(element) = hit {
            state.tap_texts.push(element.text.clone());
            let destination = state
                .screens
                .get(&state.current)
                .and_then(|s| s.transitions.get(&element.text).cloned());
            if let Some(destination) = destination {
                let from = state.current.clone();
                state.history.push(from);
                state.current = destination;
            }
        }
        Ok(())
    }

    async fn swipe(
        &self,
        _from_x: f64,
        _from_y: f64,
        _to_x: f64,
        _to_y: f64,
        _duration_ms: u64,
    ) -> Result<(), ExplorerError> {
        let mut state = self.lock();
        state.swipes += 1;
        let current = state.current.clone();
        let batches = state
            .screens
            .get(&current)
            .map(|s| s.scroll_batches.len())
            .unwrap_or(0);
        let progress = state.scroll_progress.entry(current).or_insert(0);
        if *progress < batches {
            *progress += 1;
        }
        Ok(())
    }

    async fn double_tap(&self, x: f64, y: f64) -> Result<(), ExplorerError> {
        self.tap(x, y).await
    }

    async fn long_press(&self, x: f64, y: f64) -> Result<(), ExplorerError> {
        self.tap(x, y).await
    }

    async fn press_key(&self, key: &str, _modifiers: &[String]) -> Result<(), ExplorerError> {
        let mut state = self.lock();
        if key == "[" {
            state.back_presses += 1;
        }
        if let Some(previous) = state.history.pop() {
            state.current = previous;
        }
        Ok(())
    }

    async fn type_text(&self, _text: &str) -> Result<(), ExplorerError> {
        Ok(())
    }

    async fn shake(&self) -> Result<(), ExplorerError> {
        Ok(())
    }

    async fn launch_app(&self, _name: &str) -> Result<(), ExplorerError> {
        Ok(())
    }

    async fn open_url(&self, _url: &str) -> Result<(), ExplorerError> {
        Ok(())
    }
}
