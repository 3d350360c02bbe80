//! Host surfaces the sheet is attached to and the sink its offset is written to

use std::cell::RefCell;
use std::rc::Rc;

use snapsheet_core::SurfaceId;

/// Surfaces owned by one sheet
///
/// Either may be missing while the host has not mounted it yet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SheetSurfaces {
    /// The sheet body that gets translated
    pub sheet: Option<SurfaceId>,
    /// The grab handle, also the keyboard focus target
    pub handle: Option<SurfaceId>,
}

impl SheetSurfaces {
    pub fn new(sheet: SurfaceId, handle: SurfaceId) -> Self {
        Self {
            sheet: Some(sheet),
            handle: Some(handle),
        }
    }

    /// Surface drags start from: the handle when present, otherwise the sheet
    pub fn drag_surface(&self) -> Option<SurfaceId> {
        self.handle.or(self.sheet)
    }
}

/// Receives the sheet's vertical offset every time it changes
pub trait SheetRenderer {
    fn translate_y(&mut self, offset: f32);
}

impl<F: FnMut(f32)> SheetRenderer for F {
    fn translate_y(&mut self, offset: f32) {
        self(offset)
    }
}

/// Discards every offset
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl SheetRenderer for NullRenderer {
    fn translate_y(&mut self, _offset: f32) {}
}

/// Keeps every written offset, shared between clones
#[derive(Debug, Default, Clone)]
pub struct RecordingRenderer {
    frames: Rc<RefCell<Vec<f32>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<f32> {
        self.frames.borrow().clone()
    }

    pub fn last(&self) -> Option<f32> {
        self.frames.borrow().last().copied()
    }

    pub fn len(&self) -> usize {
        self.frames.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.frames.borrow_mut().clear();
    }
}

impl SheetRenderer for RecordingRenderer {
    fn translate_y(&mut self, offset: f32) {
        self.frames.borrow_mut().push(offset);
    }
}
