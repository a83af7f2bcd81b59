//! The 2D text overlay: a greeting in the top left and a pulsing prompt pill
//! at the bottom that tells the viewer what a click will do.
//!
//! [`layout`] is pure so it can be checked without a GPU; [`Overlay`] feeds
//! its result to [`Draw2d`] each frame.

use glam::Vec2;

use crate::animation::AnimationState;
use crate::assets::{Assets, FontError, FontId};
use crate::color::Color;
use crate::draw2d::Draw2d;
use crate::gpu::GpuContext;

pub const TITLE: &str = "Miss Iong wishes you a Merry Christmas!";
pub const TITLE_FROM: Color = Color::hex(0xF9A8D4);
pub const TITLE_TO: Color = Color::hex(0xC084FC);

pub const TITLE_SIZE: f32 = 36.0;
pub const PROMPT_SIZE: f32 = 15.0;

const MARGIN: f32 = 32.0;
const PILL_PAD: Vec2 = Vec2::new(24.0, 12.0);
const PULSE_PERIOD: f32 = 2.0;

pub const PROMPT_COLOR: Color = Color::hex(0xF9A8D4);
pub const PILL_FILL: Color = Color::BLACK.with_alpha(0.2);
pub const PILL_BORDER: Color = Color::hex(0xEC4899).with_alpha(0.3);
const BORDER_WIDTH: f32 = 1.0;
/// Opacity of the whole prompt before the pulse dims it further.
const PROMPT_OPACITY: f32 = 0.8;

/// The prompt shown for a state: what clicking will do next.
pub fn prompt(state: AnimationState) -> &'static str {
    state.select("CLICK ANYWHERE TO DETONATE", "CLICK ANYWHERE TO ASSEMBLE")
}

/// Pulse factor on the prompt's opacity, 1.0 at the start of each cycle and
/// 0.5 halfway through.
pub fn pulse(time: f32) -> f32 {
    let phase = time / PULSE_PERIOD * std::f32::consts::TAU;
    0.75 + 0.25 * phase.cos()
}

/// An axis-aligned rectangle in pixels, origin top left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.w, self.h)
    }
}

/// Where everything goes this frame.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayLayout {
    pub title: Vec2,
    pub prompt: &'static str,
    pub prompt_pos: Vec2,
    pub pill: Rect,
    pub opacity: f32,
}

/// Lays out the overlay for a surface of `size` pixels.
///
/// `measure` returns the pixel width of the prompt text at [`PROMPT_SIZE`].
pub fn layout(
    size: Vec2,
    state: AnimationState,
    time: f32,
    measure: impl Fn(&str) -> f32,
) -> OverlayLayout {
    let text = prompt(state);
    let text_width = measure(text);

    let pill_size = Vec2::new(text_width, PROMPT_SIZE) + PILL_PAD * 2.0;
    let pill = Rect {
        x: (size.x - pill_size.x) * 0.5,
        y: size.y - MARGIN - pill_size.y,
        w: pill_size.x,
        h: pill_size.y,
    };

    // Glyphs hang from `y + size`; nudge up so caps sit centered
    let prompt_pos = Vec2::new(pill.x + PILL_PAD.x, pill.y + PILL_PAD.y - PROMPT_SIZE * 0.15);

    OverlayLayout {
        title: Vec2::new(MARGIN, MARGIN),
        prompt: text,
        prompt_pos,
        pill,
        opacity: PROMPT_OPACITY * pulse(time),
    }
}

/// GPU side of the overlay.
pub struct Overlay {
    draw: Draw2d,
    assets: Assets,
    title_font: FontId,
    prompt_font: FontId,
}

impl Overlay {
    /// Loads the overlay fonts from the system.
    pub fn new(gpu: &GpuContext) -> Result<Self, FontError> {
        let mut assets = Assets::new();
        let title_font = assets.system_font(gpu, TITLE_SIZE)?;
        let prompt_font = assets.system_font(gpu, PROMPT_SIZE)?;

        let draw = Draw2d::new(gpu, &assets);

        Ok(Self {
            draw,
            assets,
            title_font,
            prompt_font,
        })
    }

    /// Rebuilds this frame's draw list.
    pub fn prepare(&mut self, gpu: &GpuContext, state: AnimationState, time: f32) {
        let size = Vec2::new(gpu.width() as f32, gpu.height() as f32);
        let prompt_font = self.assets.font(self.prompt_font);
        let layout = layout(size, state, time, |text| {
            prompt_font
                .as_ref()
                .map(|font| font.measure(text))
                .unwrap_or(0.0)
        });

        self.draw.clear();
        self.draw.text_gradient(
            &self.assets,
            self.title_font,
            layout.title,
            TITLE,
            TITLE_FROM,
            TITLE_TO,
        );

        let fade = |c: Color| c.with_alpha(c.a * layout.opacity);
        let (origin, size) = (layout.pill.origin(), layout.pill.size());
        self.draw.pill(origin, size, fade(PILL_FILL));
        self.draw
            .pill_border(origin, size, BORDER_WIDTH, fade(PILL_BORDER));
        self.draw.text(
            &self.assets,
            self.prompt_font,
            layout.prompt_pos,
            layout.prompt,
            fade(PROMPT_COLOR),
        );
    }

    pub fn render(&self, gpu: &GpuContext, pass: &mut wgpu::RenderPass) {
        self.draw.render(gpu, pass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_width(text: &str) -> f32 {
        text.len() as f32 * 10.0
    }

    #[test]
    fn prompt_names_the_next_action() {
        assert_eq!(prompt(AnimationState::Tree), "CLICK ANYWHERE TO DETONATE");
        assert_eq!(prompt(AnimationState::Explode), "CLICK ANYWHERE TO ASSEMBLE");
    }

    #[test]
    fn pulse_swings_between_full_and_half() {
        assert!((pulse(0.0) - 1.0).abs() < 1e-6);
        assert!((pulse(1.0) - 0.5).abs() < 1e-6);
        assert!((pulse(2.0) - 1.0).abs() < 1e-5);
        for i in 0..100 {
            let o = pulse(i as f32 * 0.037);
            assert!((0.5 - 1e-6..=1.0 + 1e-6).contains(&o));
        }
    }

    #[test]
    fn pill_is_centered_at_the_bottom() {
        let size = Vec2::new(1280.0, 720.0);
        let l = layout(size, AnimationState::Tree, 0.0, fixed_width);
        let center = l.pill.x + l.pill.w * 0.5;
        assert!((center - 640.0).abs() < 1e-3);
        assert!((l.pill.y + l.pill.h - (720.0 - MARGIN)).abs() < 1e-3);
        assert!(l.prompt_pos.x > l.pill.x);
        assert!(l.prompt_pos.y >= l.pill.y);
        assert_eq!(l.title, Vec2::new(MARGIN, MARGIN));
    }

    #[test]
    fn layout_tracks_state_and_time() {
        let size = Vec2::new(800.0, 600.0);
        let tree = layout(size, AnimationState::Tree, 0.0, fixed_width);
        let explode = layout(size, AnimationState::Explode, 1.0, fixed_width);
        assert_eq!(explode.prompt, "CLICK ANYWHERE TO ASSEMBLE");
        assert!((tree.opacity - 0.8).abs() < 1e-6);
        assert!((explode.opacity - 0.4).abs() < 1e-6);
        // Same inputs, same layout
        assert_eq!(tree, layout(size, AnimationState::Tree, 0.0, fixed_width));
    }

    #[test]
    fn prompt_pill_uses_the_pink_palette() {
        assert_eq!(PROMPT_COLOR, Color::hex(0xF9A8D4));
        assert_eq!(PILL_FILL, Color::rgba(0.0, 0.0, 0.0, 0.2));
        assert_eq!(PILL_BORDER.a, 0.3);
        assert_eq!(PILL_BORDER.with_alpha(1.0), Color::hex(0xEC4899));
    }
}
