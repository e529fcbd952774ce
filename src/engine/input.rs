// Input state tracking for the pointer and window
// Abstracts winit events into a queryable per-frame snapshot

use glam::Vec2;
use winit::event::{ElementState, MouseButton, WindowEvent};

pub struct InputState {
    // Pointer: None while the cursor is outside the window
    pub pointer_position: Option<Vec2>,
    pointer_changed: bool,

    // Left-button presses this frame, in screen space, reset in end_frame()
    clicks: Vec<Vec2>,

    // Window dimensions; `resized` flags frames where a resize arrived
    pub window_size: Vec2,
    resized: bool,
}

impl InputState {
    pub fn new(window_size: Vec2) -> Self {
        Self {
            pointer_position: None,
            pointer_changed: false,
            clicks: Vec::new(),
            window_size,
            resized: false,
        }
    }

    /// Feed a winit WindowEvent into the input state.
    /// Call this once per event before the game's own event handling.
    pub fn process_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.pointer_moved(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::CursorLeft { .. } => {
                self.pointer_position = None;
                self.pointer_changed = true;
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => self.pointer_pressed(),
            WindowEvent::Resized(size) => {
                self.resized_to(Vec2::new(size.width as f32, size.height as f32));
            }
            _ => {}
        }
    }

    pub fn pointer_moved(&mut self, position: Vec2) {
        self.pointer_position = Some(position);
        self.pointer_changed = true;
    }

    /// Whether the pointer moved, entered or left since the last end_frame().
    pub fn pointer_changed(&self) -> bool {
        self.pointer_changed
    }

    /// Record a click at the current pointer position.
    pub fn pointer_pressed(&mut self) {
        if let Some(p) = self.pointer_position {
            self.clicks.push(p);
        }
    }

    pub fn resized_to(&mut self, size: Vec2) {
        if size.x > 0.0 && size.y > 0.0 {
            self.window_size = size;
            self.resized = true;
        }
    }

    /// Clicks recorded since the last end_frame(), oldest first.
    pub fn clicks(&self) -> &[Vec2] {
        &self.clicks
    }

    /// New window size if a resize arrived this frame.
    pub fn resize(&self) -> Option<Vec2> {
        self.resized.then_some(self.window_size)
    }

    /// Call once per frame after the scene has consumed input.
    /// Resets per-frame accumulators.
    pub fn end_frame(&mut self) {
        self.clicks.clear();
        self.pointer_changed = false;
        self.resized = false;
    }
}
