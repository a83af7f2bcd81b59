use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent};

/// Tracks pointer state and tells clicks apart from drags.
///
/// A press followed by a release counts as a click only if the cursor
/// travelled less than [`Input::CLICK_SLOP`] pixels in between. Anything
/// further is a drag, which the orbit camera consumes instead.
///
/// A single finger behaves like the left button, so a tap is a click.
#[derive(Default)]
pub struct Input {
    buttons_down: HashSet<MouseButton>,
    clicks: HashSet<MouseButton>,
    /// Last reported cursor position, `None` until the first report and
    /// after the cursor leaves the window.
    cursor: Option<Vec2>,
    /// Finger currently standing in for the left button.
    touch: Option<u64>,
    mouse_delta: Vec2,
    scroll_delta: Vec2,
    /// Cursor travel since the left button went down.
    drag_travel: f32,
}

impl Input {
    /// Cursor travel in pixels below which a press and release is a click.
    pub const CLICK_SLOP: f32 = 4.0;

    pub fn new() -> Self {
        Self::default()
    }

    /// Call at the start of each frame to reset per-frame state.
    pub fn begin_frame(&mut self) {
        self.clicks.clear();
        self.mouse_delta = Vec2::ZERO;
        self.scroll_delta = Vec2::ZERO;
    }

    /// Process a window event and update input state.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => self.press(*button),
                ElementState::Released => self.release(*button),
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.move_cursor(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::CursorLeft { .. } => self.leave(),
            WindowEvent::MouseWheel { delta, .. } => {
                let d = match delta {
                    MouseScrollDelta::LineDelta(x, y) => Vec2::new(*x, *y),
                    MouseScrollDelta::PixelDelta(pos) => {
                        Vec2::new(pos.x as f32, pos.y as f32) / 120.0
                    }
                };
                self.scroll(d);
            }
            WindowEvent::Touch(touch) => {
                let at = Vec2::new(touch.location.x as f32, touch.location.y as f32);
                self.touch(touch.id, touch.phase, at);
            }
            WindowEvent::Focused(false) => {
                self.buttons_down.clear();
                self.touch = None;
            }
            _ => {}
        }
    }

    pub fn press(&mut self, button: MouseButton) {
        if self.buttons_down.insert(button) && button == MouseButton::Left {
            self.drag_travel = 0.0;
        }
    }

    pub fn release(&mut self, button: MouseButton) {
        // A release without a matching press (focus came back mid-drag) is not a click
        if self.buttons_down.remove(&button)
            && (button != MouseButton::Left || self.drag_travel < Self::CLICK_SLOP)
        {
            self.clicks.insert(button);
        }
    }

    pub fn move_cursor(&mut self, position: Vec2) {
        let Some(last) = self.cursor.replace(position) else {
            return;
        };
        let delta = position - last;
        self.mouse_delta += delta;
        if self.mouse_down(MouseButton::Left) {
            self.drag_travel += delta.length();
        }
    }

    /// The cursor left the window; its next report starts fresh.
    pub fn leave(&mut self) {
        self.cursor = None;
    }

    /// Feed one touch event. Only the first finger down is tracked.
    pub fn touch(&mut self, id: u64, phase: TouchPhase, position: Vec2) {
        match phase {
            TouchPhase::Started if self.touch.is_none() => {
                self.touch = Some(id);
                self.cursor = Some(position);
                self.press(MouseButton::Left);
            }
            TouchPhase::Moved if self.touch == Some(id) => self.move_cursor(position),
            TouchPhase::Ended if self.touch == Some(id) => {
                self.move_cursor(position);
                self.release(MouseButton::Left);
                self.touch = None;
                self.cursor = None;
            }
            TouchPhase::Cancelled if self.touch == Some(id) => {
                self.buttons_down.remove(&MouseButton::Left);
                self.touch = None;
                self.cursor = None;
            }
            _ => {}
        }
    }

    pub fn scroll(&mut self, delta: Vec2) {
        self.scroll_delta += delta;
    }

    /// Returns true if the mouse button is currently held down.
    pub fn mouse_down(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }

    /// Returns true if the button completed a click this frame.
    pub fn clicked(&self, button: MouseButton) -> bool {
        self.clicks.contains(&button)
    }

    /// Mouse movement delta this frame.
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    /// Scroll wheel delta this frame (in "lines").
    pub fn scroll_delta(&self) -> Vec2 {
        self.scroll_delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_and_release_in_place_is_a_click() {
        let mut input = Input::new();
        input.move_cursor(Vec2::new(100.0, 100.0));
        input.begin_frame();

        input.press(MouseButton::Left);
        input.move_cursor(Vec2::new(102.0, 101.0));
        input.release(MouseButton::Left);

        assert!(input.clicked(MouseButton::Left));
        assert!(!input.mouse_down(MouseButton::Left));
        input.begin_frame();
        assert!(!input.clicked(MouseButton::Left));
    }

    #[test]
    fn first_cursor_report_is_not_travel() {
        let mut input = Input::new();
        input.press(MouseButton::Left);
        input.move_cursor(Vec2::new(640.0, 360.0));
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
        input.release(MouseButton::Left);
        assert!(input.clicked(MouseButton::Left));
    }

    #[test]
    fn reentering_the_window_is_not_travel() {
        let mut input = Input::new();
        input.move_cursor(Vec2::new(10.0, 10.0));
        input.leave();
        input.begin_frame();

        input.press(MouseButton::Left);
        input.move_cursor(Vec2::new(500.0, 300.0));
        input.release(MouseButton::Left);

        assert!(input.clicked(MouseButton::Left));
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
    }

    #[test]
    fn dragging_is_not_a_click() {
        let mut input = Input::new();
        input.press(MouseButton::Left);
        for x in 1..=10 {
            input.move_cursor(Vec2::new(x as f32 * 3.0, 0.0));
        }
        input.release(MouseButton::Left);
        assert!(!input.clicked(MouseButton::Left));
    }

    #[test]
    fn small_jitter_that_returns_home_still_counts_as_travel() {
        let mut input = Input::new();
        input.move_cursor(Vec2::ZERO);
        input.press(MouseButton::Left);
        input.move_cursor(Vec2::new(3.0, 0.0));
        input.move_cursor(Vec2::new(0.0, 0.0));
        input.release(MouseButton::Left);
        assert!(!input.clicked(MouseButton::Left));
    }

    #[test]
    fn stray_release_is_ignored() {
        let mut input = Input::new();
        input.release(MouseButton::Left);
        assert!(!input.clicked(MouseButton::Left));
    }

    #[test]
    fn tap_is_a_click() {
        let mut input = Input::new();
        input.touch(1, TouchPhase::Started, Vec2::new(300.0, 200.0));
        assert!(input.mouse_down(MouseButton::Left));
        input.touch(1, TouchPhase::Moved, Vec2::new(301.0, 201.0));
        input.touch(1, TouchPhase::Ended, Vec2::new(301.0, 201.0));
        assert!(input.clicked(MouseButton::Left));
        assert!(!input.mouse_down(MouseButton::Left));
    }

    #[test]
    fn swipe_and_cancelled_touch_are_not_clicks() {
        let mut input = Input::new();
        input.touch(4, TouchPhase::Started, Vec2::ZERO);
        input.touch(4, TouchPhase::Moved, Vec2::new(40.0, 0.0));
        assert_eq!(input.mouse_delta(), Vec2::new(40.0, 0.0));
        input.touch(4, TouchPhase::Ended, Vec2::new(40.0, 0.0));
        assert!(!input.clicked(MouseButton::Left));

        input.touch(5, TouchPhase::Started, Vec2::new(10.0, 10.0));
        input.touch(5, TouchPhase::Cancelled, Vec2::new(10.0, 10.0));
        assert!(!input.clicked(MouseButton::Left));
        assert!(!input.mouse_down(MouseButton::Left));
    }

    #[test]
    fn second_finger_is_ignored() {
        let mut input = Input::new();
        input.touch(1, TouchPhase::Started, Vec2::ZERO);
        input.touch(2, TouchPhase::Started, Vec2::new(200.0, 0.0));
        input.touch(2, TouchPhase::Ended, Vec2::new(200.0, 0.0));
        assert!(input.mouse_down(MouseButton::Left));
        input.touch(1, TouchPhase::Ended, Vec2::ZERO);
        assert!(input.clicked(MouseButton::Left));
    }

    #[test]
    fn motion_and_scroll_accumulate_per_frame() {
        let mut input = Input::new();
        input.move_cursor(Vec2::new(5.0, 5.0));
        input.move_cursor(Vec2::new(8.0, 1.0));
        input.move_cursor(Vec2::new(9.0, 3.0));
        input.scroll(Vec2::new(0.0, 1.0));
        input.scroll(Vec2::new(0.0, 0.5));
        assert_eq!(input.mouse_delta(), Vec2::new(4.0, -2.0));
        assert_eq!(input.scroll_delta(), Vec2::new(0.0, 1.5));
        input.begin_frame();
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
    }
}
