//! Headless trace replay
//!
//! A trace is a JSON list of input steps applied to a sheet on a virtual
//! clock. Pointer and key events are stamped with the clock time, so the
//! velocity of a drag depends on the `wait` steps between its moves.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use snapsheet::{
    BottomSheet, Event, EventDispatcher, FrameScheduler, KeyCode, PointerPhase, PointerSource,
    RecordingRenderer, SheetConfig, SheetSurfaces, SnapPoint, SurfaceId,
};

use crate::config::ReplayConfig;

pub const SHEET_SURFACE: SurfaceId = SurfaceId(1);
pub const HANDLE_SURFACE: SurfaceId = SurfaceId(2);

/// Recorded input session
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Trace {
    /// Overrides the configured container height
    #[serde(default)]
    pub container_height: Option<f32>,
    /// Overrides the configured initial snap point
    #[serde(default)]
    pub initial_snap_point: Option<SnapPoint>,
    pub steps: Vec<Step>,
}

impl Trace {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse trace {}", path.display()))
    }

    /// Apply the trace's overrides on top of `config`
    pub fn sheet_config(&self, mut config: SheetConfig) -> SheetConfig {
        if let Some(height) = self.container_height {
            config.container_height = height;
        }
        if let Some(point) = self.initial_snap_point {
            config.initial_snap_point = point;
        }
        config
    }
}

/// One input step
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    /// Press on the handle
    Press {
        y: f32,
        #[serde(default)]
        source: Source,
    },
    /// Move the pressed pointer
    Move { y: f32 },
    Release,
    /// Key press by DOM key name (`"Escape"`, `"ArrowUp"`, `"Enter"`, `" "`)
    Key {
        key: String,
        #[serde(default)]
        target: KeyTarget,
    },
    Resize { height: u32 },
    /// Programmatic `snap_to`
    Snap { point: SnapPoint },
    /// Advance the clock, running every frame that falls due
    Wait { ms: f64 },
    /// Run frames until the sheet is at rest
    Settle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    #[default]
    Touch,
    Mouse,
}

impl From<Source> for PointerSource {
    fn from(source: Source) -> Self {
        match source {
            Source::Touch => PointerSource::Touch,
            Source::Mouse => PointerSource::Mouse,
        }
    }
}

/// Where a key event is addressed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyTarget {
    #[default]
    Document,
    Handle,
    Sheet,
}

impl KeyTarget {
    fn surface(self) -> Option<SurfaceId> {
        match self {
            KeyTarget::Document => None,
            KeyTarget::Handle => Some(HANDLE_SURFACE),
            KeyTarget::Sheet => Some(SHEET_SURFACE),
        }
    }
}

/// Something observable that happened during replay
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplayEvent {
    Frame {
        time_ms: f64,
        offset: f32,
        progress: f32,
        snap_point: SnapPoint,
    },
    SnapChange {
        time_ms: f64,
        point: SnapPoint,
    },
}

impl fmt::Display for ReplayEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayEvent::Frame {
                time_ms,
                offset,
                progress,
                snap_point,
            } => write!(
                f,
                "{time_ms:>9.1}ms  offset {offset:>9.2}  progress {progress:.3}  [{snap_point}]"
            ),
            ReplayEvent::SnapChange { time_ms, point } => {
                write!(f, "{time_ms:>9.1}ms  snap -> {point}")
            }
        }
    }
}

/// Drives one sheet from trace steps
pub struct Replayer {
    dispatcher: EventDispatcher,
    scheduler: FrameScheduler,
    sheet: BottomSheet,
    renderer: RecordingRenderer,
    events: Rc<RefCell<Vec<ReplayEvent>>>,
    clock: Rc<Cell<f64>>,
    settings: ReplayConfig,
    /// Renderer frames already turned into events
    rendered: usize,
    source: PointerSource,
    last_y: f32,
}

impl Replayer {
    pub fn new(config: SheetConfig, settings: ReplayConfig) -> Result<Self> {
        config.validate().context("Invalid sheet configuration")?;
        if !(settings.frame_ms.is_finite() && settings.frame_ms > 0.0) {
            anyhow::bail!("frame interval must be positive, got {}", settings.frame_ms);
        }

        let dispatcher = EventDispatcher::new();
        let scheduler = FrameScheduler::new();
        let renderer = RecordingRenderer::new();
        let events = Rc::new(RefCell::new(Vec::new()));
        let clock = Rc::new(Cell::new(0.0));

        let sheet = BottomSheet::builder()
            .config(config)
            .surfaces(SheetSurfaces::new(SHEET_SURFACE, HANDLE_SURFACE))
            .renderer(renderer.clone())
            .on_snap_change({
                let events = events.clone();
                let clock = clock.clone();
                move |point| {
                    events.borrow_mut().push(ReplayEvent::SnapChange {
                        time_ms: clock.get(),
                        point,
                    })
                }
            })
            .build(&dispatcher, &scheduler);

        Ok(Self {
            dispatcher,
            scheduler,
            sheet,
            renderer,
            events,
            clock,
            settings,
            rendered: 0,
            source: PointerSource::Touch,
            last_y: 0.0,
        })
    }

    pub fn sheet(&self) -> &BottomSheet {
        &self.sheet
    }

    /// Virtual time in milliseconds
    pub fn now(&self) -> f64 {
        self.clock.get()
    }

    /// Apply every step, then settle
    pub fn run(&mut self, trace: &Trace) -> Result<()> {
        for (index, step) in trace.steps.iter().enumerate() {
            self.apply(step)
                .with_context(|| format!("Step {} ({:?}) failed", index + 1, step))?;
        }
        self.settle()?;
        Ok(())
    }

    pub fn apply(&mut self, step: &Step) -> Result<()> {
        tracing::debug!(time_ms = self.now(), ?step, "step");
        match step {
            Step::Press { y, source } => {
                self.source = (*source).into();
                self.pointer(PointerPhase::Down, *y);
            }
            Step::Move { y } => self.pointer(PointerPhase::Move, *y),
            Step::Release => self.pointer(PointerPhase::Up, self.last_y),
            Step::Key { key, target } => {
                let code = KeyCode::from_name(key);
                if code == KeyCode::UNKNOWN {
                    tracing::warn!(key = %key, "unmapped key, event has no effect");
                }
                let mut event = Event::key_down(target.surface(), code, self.timestamp());
                self.dispatcher.dispatch(&mut event);
            }
            Step::Resize { height } => {
                let mut event = Event::resize(0, *height, self.timestamp());
                self.dispatcher.dispatch(&mut event);
            }
            Step::Snap { point } => self.sheet.snap_to(*point),
            Step::Wait { ms } => {
                if !(ms.is_finite() && *ms >= 0.0) {
                    anyhow::bail!("wait must be a non-negative duration, got {ms}");
                }
                self.advance(*ms);
            }
            Step::Settle => {
                self.settle()?;
            }
        }
        self.collect_frames();
        Ok(())
    }

    /// Advance the clock by `ms`, ticking at every frame boundary passed
    pub fn advance(&mut self, ms: f64) {
        let end = self.now() + ms;
        while self.now() + self.settings.frame_ms <= end {
            self.tick();
        }
        self.clock.set(end);
    }

    /// Tick until nothing is scheduled; returns the number of frames run
    pub fn settle(&mut self) -> Result<usize> {
        let mut frames = 0;
        while self.scheduler.has_pending_frames() {
            if frames >= self.settings.max_frames {
                anyhow::bail!(
                    "sheet did not come to rest within {} frames",
                    self.settings.max_frames
                );
            }
            self.tick();
            frames += 1;
        }
        Ok(frames)
    }

    /// Drain every event observed so far
    pub fn take_events(&mut self) -> Vec<ReplayEvent> {
        self.collect_frames();
        std::mem::take(&mut *self.events.borrow_mut())
    }

    fn tick(&mut self) {
        self.clock.set(self.now() + self.settings.frame_ms);
        self.scheduler.tick(self.now());
        self.collect_frames();
    }

    fn timestamp(&self) -> u64 {
        self.now().round() as u64
    }

    fn pointer(&mut self, phase: PointerPhase, y: f32) {
        let target = (phase == PointerPhase::Down).then_some(HANDLE_SURFACE);
        let mut event = Event::pointer(phase, self.source, target, 0.0, y, self.timestamp());
        self.dispatcher.dispatch(&mut event);
        self.last_y = y;
    }

    fn collect_frames(&mut self) {
        let frames = self.renderer.frames();
        let Some(fresh) = frames.get(self.rendered..) else {
            return;
        };
        let table = self.sheet.snap_table();
        let mut events = self.events.borrow_mut();
        for &offset in fresh {
            events.push(ReplayEvent::Frame {
                time_ms: self.clock.get(),
                offset,
                progress: table.progress(offset).unwrap_or_else(|| self.sheet.progress()),
                snap_point: self.sheet.snap_point(),
            });
        }
        self.rendered = frames.len();
    }
}
