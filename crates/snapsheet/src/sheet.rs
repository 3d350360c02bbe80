//! Snap coordinator
//!
//! [`BottomSheet`] owns the current [`SnapPoint`], the pixel table for the
//! measured container, a [`SpringIntegrator`] and a [`GestureTracker`]. It
//! decides who writes the sheet offset at any moment:
//!
//! - while idle or settling, the integrator drives the offset
//! - while dragging, the drag position does, and the integrator is stopped
//! - on release, the integrator is seeded at the release position and animates
//!   to the resolved snap point
//!
//! # Example
//!
//! ```rust
//! use snapsheet::{BottomSheet, SnapPoint};
//! use snapsheet_animation::FrameScheduler;
//! use snapsheet_core::EventDispatcher;
//!
//! let dispatcher = EventDispatcher::new();
//! let scheduler = FrameScheduler::new();
//! let sheet = BottomSheet::builder()
//!     .container_height(800.0)
//!     .build(&dispatcher, &scheduler);
//!
//! sheet.snap_to(SnapPoint::Full);
//! let mut now = 0.0;
//! while scheduler.has_pending_frames() {
//!     now += 16.0;
//!     scheduler.tick(now);
//! }
//! assert_eq!(sheet.offset(), 40.0);
//! assert_eq!(sheet.progress(), 1.0);
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use smallvec::SmallVec;
use snapsheet_animation::{FrameScheduler, SpringConfig, SpringIntegrator};
use snapsheet_core::events::event_types;
use snapsheet_core::fsm::StateTransitions;
use snapsheet_core::{
    EventData, EventDispatcher, KeyCode, ListenerOptions, ListenerTarget, Subscription,
};

use crate::config::SheetConfig;
use crate::error::ConfigError;
use crate::gesture::{GestureHandlers, GestureTracker};
use crate::keyboard::{self, KeyAction};
use crate::snap::{resolve_release, SnapPoint, SnapTable};
use crate::surface::{NullRenderer, SheetRenderer, SheetSurfaces};

/// Backdrop opacity when the sheet is fully open
pub const BACKDROP_MAX_OPACITY: f32 = 0.5;

/// Callback invoked on every `snap_to`, including repeated points
pub type SnapChangeCallback = Rc<dyn Fn(SnapPoint)>;

/// State shared between the coordinator and the integrator's update callback
struct SheetView {
    snap_point: Cell<SnapPoint>,
    table: Cell<SnapTable>,
    /// Last offset written to the renderer
    offset: Cell<f32>,
    progress: Cell<f32>,
    dragging: Cell<bool>,
    renderer: RefCell<Box<dyn SheetRenderer>>,
}

impl SheetView {
    fn render(&self, offset: f32) {
        self.offset.set(offset);
        if let Some(progress) = self.table.get().progress(offset) {
            self.progress.set(progress);
        }
        self.renderer.borrow_mut().translate_y(offset);
    }
}

struct SheetCore {
    view: Rc<SheetView>,
    integrator: SpringIntegrator,
    on_snap_change: Option<SnapChangeCallback>,
}

impl SheetCore {
    fn snap_to(&self, point: SnapPoint) {
        self.view.snap_point.set(point);
        let target = self.view.table.get().offset(point);
        tracing::debug!(%point, target, "snap");
        self.integrator.start(target, 0.0);
        if let Some(callback) = &self.on_snap_change {
            callback(point);
        }
    }

    fn drag_start(&self) {
        self.integrator.stop();
        self.view.dragging.set(true);
    }

    fn drag(&self, y: f32) {
        let offset = self.view.table.get().clamp_drag(y);
        self.view.render(offset);
    }

    fn drag_end(&self, velocity: f32, y: f32) {
        self.view.dragging.set(false);
        let current = self.view.snap_point.get();
        let next = resolve_release(current, velocity, y, &self.view.table.get());
        tracing::debug!(%current, %next, velocity, y, "release");
        self.integrator.set_value(self.view.offset.get());
        self.snap_to(next);
    }

    fn resize(&self, container_height: f32) {
        let previous = self.view.table.get();
        let table = SnapTable::new(container_height);
        if table == previous {
            return;
        }
        self.view.table.set(table);
        tracing::debug!(
            container_height = table.container_height(),
            dragging = self.view.dragging.get(),
            "resize"
        );
        if self.view.dragging.get() {
            // The release resolves against the new table
            return;
        }
        let target = table.offset(self.view.snap_point.get());
        if previous.container_height() == 0.0 {
            // First measurement, nothing meaningful has been shown yet
            self.integrator.set_value(target);
        }
        self.integrator.start(target, 0.0);
    }

    fn key_action(&self, action: KeyAction) -> bool {
        match self.view.snap_point.get().on_event(action.snap_event()) {
            Some(next) => {
                self.snap_to(next);
                true
            }
            None => false,
        }
    }
}

/// Builder for [`BottomSheet`]
pub struct BottomSheetBuilder {
    config: SheetConfig,
    surfaces: SheetSurfaces,
    renderer: Option<Box<dyn SheetRenderer>>,
    on_snap_change: Option<SnapChangeCallback>,
}

impl BottomSheetBuilder {
    pub fn new() -> Self {
        Self {
            config: SheetConfig::default(),
            surfaces: SheetSurfaces::default(),
            renderer: None,
            on_snap_change: None,
        }
    }

    /// Replace every configurable option at once
    pub fn config(mut self, config: SheetConfig) -> Self {
        self.config = config;
        self
    }

    pub fn initial_snap_point(mut self, point: SnapPoint) -> Self {
        self.config.initial_snap_point = point;
        self
    }

    pub fn spring_config(mut self, spring: SpringConfig) -> Self {
        self.config.spring = spring;
        self
    }

    pub fn container_height(mut self, height: f32) -> Self {
        self.config.container_height = height;
        self
    }

    pub fn enable_drag(mut self, enabled: bool) -> Self {
        self.config.enable_drag = enabled;
        self
    }

    pub fn enable_keyboard(mut self, enabled: bool) -> Self {
        self.config.enable_keyboard = enabled;
        self
    }

    pub fn surfaces(mut self, surfaces: SheetSurfaces) -> Self {
        self.surfaces = surfaces;
        self
    }

    pub fn renderer<R: SheetRenderer + 'static>(mut self, renderer: R) -> Self {
        self.renderer = Some(Box::new(renderer));
        self
    }

    pub fn on_snap_change<F: Fn(SnapPoint) + 'static>(mut self, callback: F) -> Self {
        self.on_snap_change = Some(Rc::new(callback));
        self
    }

    /// Validate the configuration, then [`build`](Self::build)
    pub fn try_build(
        self,
        dispatcher: &EventDispatcher,
        scheduler: &FrameScheduler,
    ) -> Result<BottomSheet, ConfigError> {
        self.config.validate()?;
        Ok(self.build(dispatcher, scheduler))
    }

    /// Attach the sheet to `dispatcher` and drive it from `scheduler`
    ///
    /// The integrator is started toward the initial snap point right away, so
    /// the first rendered offset comes from the spring like every later one.
    pub fn build(self, dispatcher: &EventDispatcher, scheduler: &FrameScheduler) -> BottomSheet {
        let config = self.config;
        let table = SnapTable::new(config.container_height);
        let initial_offset = table.offset(config.initial_snap_point);

        let view = Rc::new(SheetView {
            snap_point: Cell::new(config.initial_snap_point),
            table: Cell::new(table),
            offset: Cell::new(initial_offset),
            progress: Cell::new(table.progress(initial_offset).unwrap_or(0.0)),
            dragging: Cell::new(false),
            renderer: RefCell::new(self.renderer.unwrap_or_else(|| Box::new(NullRenderer))),
        });

        let integrator = SpringIntegrator::new(scheduler, initial_offset, config.spring)
            .on_update({
                let view = view.clone();
                move |value| view.render(value)
            })
            .on_complete({
                let view = view.clone();
                move || tracing::trace!(point = %view.snap_point.get(), "sheet settled")
            });
        integrator.start(initial_offset, 0.0);

        let core = Rc::new(SheetCore {
            view,
            integrator,
            on_snap_change: self.on_snap_change,
        });

        let weak = Rc::downgrade(&core);
        let handlers = GestureHandlers::new()
            .on_drag_start({
                let weak = weak.clone();
                move || {
                    if let Some(core) = weak.upgrade() {
                        core.drag_start();
                    }
                }
            })
            .on_drag({
                let weak = weak.clone();
                move |y| {
                    if let Some(core) = weak.upgrade() {
                        core.drag(y);
                    }
                }
            })
            .on_drag_end({
                let weak = weak.clone();
                move |velocity, y| {
                    if let Some(core) = weak.upgrade() {
                        core.drag_end(velocity, y);
                    }
                }
            });
        let tracker = GestureTracker::new(
            dispatcher,
            self.surfaces.drag_surface(),
            handlers,
            config.enable_drag,
        );

        let resize = dispatcher.subscribe(
            ListenerTarget::Document,
            event_types::RESIZE,
            ListenerOptions::PASSIVE,
            move |event| {
                let EventData::Resize { height, .. } = event.data else {
                    return;
                };
                if let Some(core) = weak.upgrade() {
                    core.resize(height as f32);
                }
            },
        );

        let sheet = BottomSheet {
            core,
            tracker,
            surfaces: self.surfaces,
            dispatcher: dispatcher.clone(),
            keyboard: RefCell::new(SmallVec::new()),
            _resize: resize,
        };
        sheet.set_keyboard_enabled(config.enable_keyboard);
        tracing::debug!(
            initial = %config.initial_snap_point,
            container_height = table.container_height(),
            drag = config.enable_drag,
            keyboard = config.enable_keyboard,
            "bottom sheet attached"
        );
        sheet
    }
}

impl Default for BottomSheetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A draggable sheet resting at one of three snap points
///
/// Dropping the sheet removes all of its listeners and cancels its pending frame.
pub struct BottomSheet {
    core: Rc<SheetCore>,
    tracker: GestureTracker,
    surfaces: SheetSurfaces,
    dispatcher: EventDispatcher,
    keyboard: RefCell<SmallVec<[Subscription; 2]>>,
    _resize: Subscription,
}

impl BottomSheet {
    pub fn builder() -> BottomSheetBuilder {
        BottomSheetBuilder::new()
    }

    pub fn snap_point(&self) -> SnapPoint {
        self.core.view.snap_point.get()
    }

    /// Move to `point` and animate there
    ///
    /// Always starts the spring and notifies, even if `point` is current.
    pub fn snap_to(&self, point: SnapPoint) {
        self.core.snap_to(point);
    }

    pub fn dismiss(&self) {
        self.snap_to(SnapPoint::Closed);
    }

    /// Advance Closed -> Half -> Full -> Closed
    pub fn cycle(&self) {
        self.core.key_action(KeyAction::Cycle);
    }

    /// How open the sheet is, from 0 (closed) to 1 (full)
    pub fn progress(&self) -> f32 {
        self.core.view.progress.get()
    }

    pub fn backdrop_opacity(&self) -> f32 {
        self.progress() * BACKDROP_MAX_OPACITY
    }

    pub fn is_open(&self) -> bool {
        self.snap_point() != SnapPoint::Closed
    }

    pub fn is_dragging(&self) -> bool {
        self.core.view.dragging.get()
    }

    pub fn is_animating(&self) -> bool {
        self.core.integrator.is_animating()
    }

    /// Last offset handed to the renderer
    pub fn offset(&self) -> f32 {
        self.core.view.offset.get()
    }

    pub fn container_height(&self) -> f32 {
        self.core.view.table.get().container_height()
    }

    pub fn snap_table(&self) -> SnapTable {
        self.core.view.table.get()
    }

    pub fn surfaces(&self) -> SheetSurfaces {
        self.surfaces
    }

    /// Apply a new container height
    ///
    /// Unless a drag is in progress, the spring is retargeted to the current
    /// snap point's new offset. The snap point itself is unchanged and no
    /// change is reported.
    pub fn resize(&self, container_height: f32) {
        self.core.resize(container_height);
    }

    /// Handle a document-level key press. Returns whether it changed the target.
    pub fn handle_key(&self, key: KeyCode) -> bool {
        KeyAction::for_document_key(key).is_some_and(|action| self.core.key_action(action))
    }

    pub fn spring_config(&self) -> SpringConfig {
        self.core.integrator.config()
    }

    /// Used from the next frame on; a running animation keeps its target
    pub fn set_spring_config(&self, config: SpringConfig) {
        self.core.integrator.set_config(config);
    }

    pub fn drag_enabled(&self) -> bool {
        self.tracker.is_enabled()
    }

    pub fn set_drag_enabled(&self, enabled: bool) {
        self.tracker.set_enabled(enabled);
    }

    pub fn keyboard_enabled(&self) -> bool {
        !self.keyboard.borrow().is_empty()
    }

    pub fn set_keyboard_enabled(&self, enabled: bool) {
        if enabled == self.keyboard_enabled() {
            return;
        }
        if !enabled {
            let released = std::mem::take(&mut *self.keyboard.borrow_mut());
            drop(released);
            return;
        }
        let weak = Rc::downgrade(&self.core);
        let subscriptions =
            keyboard::subscribe(&self.dispatcher, self.surfaces.handle, move |action| {
                if let Some(core) = weak.upgrade() {
                    core.key_action(action);
                }
            });
        *self.keyboard.borrow_mut() = subscriptions;
    }
}

impl std::fmt::Debug for BottomSheet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BottomSheet")
            .field("snap_point", &self.snap_point())
            .field("offset", &self.offset())
            .field("progress", &self.progress())
            .field("dragging", &self.is_dragging())
            .field("integrator", &self.core.integrator)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::RecordingRenderer;
    use pretty_assertions::assert_eq;
    use snapsheet_core::{Event, PointerPhase, PointerSource, SurfaceId};

    const SHEET: SurfaceId = SurfaceId(1);
    const HANDLE: SurfaceId = SurfaceId(2);

    struct Harness {
        dispatcher: EventDispatcher,
        scheduler: FrameScheduler,
        renderer: RecordingRenderer,
        changes: Rc<RefCell<Vec<SnapPoint>>>,
        now: f64,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                dispatcher: EventDispatcher::new(),
                scheduler: FrameScheduler::new(),
                renderer: RecordingRenderer::new(),
                changes: Rc::new(RefCell::new(Vec::new())),
                now: 0.0,
            }
        }

        fn sheet(&self, initial: SnapPoint) -> BottomSheet {
            let changes = self.changes.clone();
            BottomSheet::builder()
                .initial_snap_point(initial)
                .container_height(800.0)
                .surfaces(SheetSurfaces::new(SHEET, HANDLE))
                .renderer(self.renderer.clone())
                .on_snap_change(move |point| changes.borrow_mut().push(point))
                .build(&self.dispatcher, &self.scheduler)
        }

        fn settle(&mut self) {
            let mut frames = 0;
            while self.scheduler.has_pending_frames() && frames < 1_000 {
                self.now += 16.0;
                self.scheduler.tick(self.now);
                frames += 1;
            }
        }

        fn key(&self, target: Option<SurfaceId>, key: KeyCode) -> Event {
            let mut event = Event::key_down(target, key, self.now as u64);
            self.dispatcher.dispatch(&mut event);
            event
        }
    }

    #[test]
    fn test_initial_point_is_rendered() {
        let mut h = Harness::new();
        let sheet = h.sheet(SnapPoint::Half);
        assert_eq!(sheet.offset(), 400.0);
        assert_eq!(sheet.progress(), 0.5);
        h.settle();
        assert_eq!(h.renderer.frames(), vec![400.0]);
        assert!(h.changes.borrow().is_empty());
    }

    #[test]
    fn test_snap_to_same_point_still_notifies() {
        let mut h = Harness::new();
        let sheet = h.sheet(SnapPoint::Half);
        h.settle();
        sheet.snap_to(SnapPoint::Half);
        assert!(sheet.is_animating());
        h.settle();
        assert_eq!(*h.changes.borrow(), vec![SnapPoint::Half]);
    }

    #[test]
    fn test_keyboard_steps_and_clamps() {
        let mut h = Harness::new();
        let sheet = h.sheet(SnapPoint::Closed);

        h.key(None, KeyCode::UP);
        h.key(None, KeyCode::UP);
        h.key(None, KeyCode::UP);
        assert_eq!(sheet.snap_point(), SnapPoint::Full);
        assert_eq!(*h.changes.borrow(), vec![SnapPoint::Half, SnapPoint::Full]);

        h.key(None, KeyCode::DOWN);
        assert_eq!(sheet.snap_point(), SnapPoint::Half);
        h.settle();
        assert_eq!(sheet.offset(), 400.0);
    }

    #[test]
    fn test_escape_always_closes() {
        let h = Harness::new();
        let sheet = h.sheet(SnapPoint::Closed);
        h.key(None, KeyCode::ESCAPE);
        assert_eq!(sheet.snap_point(), SnapPoint::Closed);
        assert_eq!(*h.changes.borrow(), vec![SnapPoint::Closed]);
    }

    #[test]
    fn test_handle_activation_cycles() {
        let h = Harness::new();
        let sheet = h.sheet(SnapPoint::Full);

        let event = h.key(Some(HANDLE), KeyCode::SPACE);
        assert!(event.default_prevented);
        assert_eq!(sheet.snap_point(), SnapPoint::Closed);

        // Enter on the sheet body is not an activation
        h.key(Some(SHEET), KeyCode::ENTER);
        assert_eq!(sheet.snap_point(), SnapPoint::Closed);

        h.key(Some(HANDLE), KeyCode::ENTER);
        assert_eq!(sheet.snap_point(), SnapPoint::Half);
    }

    #[test]
    fn test_keyboard_can_be_disabled() {
        let h = Harness::new();
        let sheet = h.sheet(SnapPoint::Closed);
        sheet.set_keyboard_enabled(false);
        h.key(None, KeyCode::UP);
        assert_eq!(sheet.snap_point(), SnapPoint::Closed);

        // Direct calls still work
        assert!(sheet.handle_key(KeyCode::UP));
        assert!(!sheet.handle_key(KeyCode::ENTER));
        assert_eq!(sheet.snap_point(), SnapPoint::Half);

        // Toggling works through a shared handle
        let shared = Rc::new(sheet);
        shared.set_keyboard_enabled(true);
        assert!(shared.keyboard_enabled());
        h.key(None, KeyCode::UP);
        assert_eq!(shared.snap_point(), SnapPoint::Full);
    }

    #[test]
    fn test_drag_is_clamped() {
        let mut h = Harness::new();
        let sheet = h.sheet(SnapPoint::Half);
        h.settle();

        let touch = |phase, target, y, t| {
            let mut event = Event::pointer(phase, PointerSource::Touch, target, 0.0, y, t);
            h.dispatcher.dispatch(&mut event);
        };
        touch(PointerPhase::Down, Some(HANDLE), 400.0, 0);
        touch(PointerPhase::Move, None, -50.0, 16);

        assert!(sheet.is_dragging());
        assert_eq!(sheet.offset(), 40.0);
        assert_eq!(h.renderer.last(), Some(40.0));
        assert_eq!(sheet.progress(), 1.0);
    }

    #[test]
    fn test_first_measurement_jumps() {
        let mut h = Harness::new();
        let sheet = BottomSheet::builder()
            .initial_snap_point(SnapPoint::Half)
            .renderer(h.renderer.clone())
            .build(&h.dispatcher, &h.scheduler);
        h.settle();
        assert_eq!(sheet.offset(), 0.0);

        let mut resize = Event::resize(400, 800, 0);
        h.dispatcher.dispatch(&mut resize);
        h.settle();

        // Nothing between the unmeasured and measured offsets is rendered
        assert_eq!(h.renderer.frames(), vec![0.0, 400.0]);
        assert_eq!(sheet.container_height(), 800.0);
    }

    #[test]
    fn test_try_build_rejects_bad_config() {
        let h = Harness::new();
        let result = BottomSheet::builder()
            .container_height(f32::NAN)
            .try_build(&h.dispatcher, &h.scheduler);
        assert!(matches!(result, Err(ConfigError::ContainerHeight(_))));
    }

    #[test]
    fn test_drop_releases_everything() {
        let h = Harness::new();
        let sheet = h.sheet(SnapPoint::Half);
        assert!(h.dispatcher.listener_count() > 0);
        assert!(h.scheduler.has_pending_frames());
        drop(sheet);
        assert_eq!(h.dispatcher.listener_count(), 0);
        assert!(!h.scheduler.has_pending_frames());
    }

    #[test]
    fn test_backdrop_follows_progress() {
        let mut h = Harness::new();
        let sheet = h.sheet(SnapPoint::Closed);
        assert!(!sheet.is_open());
        assert_eq!(sheet.backdrop_opacity(), 0.0);
        sheet.snap_to(SnapPoint::Full);
        h.settle();
        assert!(sheet.is_open());
        assert_eq!(sheet.backdrop_opacity(), 0.5);
        sheet.dismiss();
        h.settle();
        assert_eq!(sheet.backdrop_opacity(), 0.0);
    }
}
