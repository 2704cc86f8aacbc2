#[cfg(feature = "window")]
use raylib::prelude::*;

use crate::constants::*;

/// Scale that fits an image into 90% of the screen, never enlarging it.
pub fn fit_scale(image_width: i32, image_height: i32, screen_width: i32, screen_height: i32) -> f32 {
    if image_width <= 0 || image_height <= 0 {
        return 1.0;
    }
    let max_width = screen_width as f32 * 0.9;
    let max_height = screen_height as f32 * 0.9;
    let scale = (max_width / image_width as f32).min(max_height / image_height as f32);
    scale.min(1.0)
}

/// On-screen opacity easing towards whatever the surface asks for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fade {
    pub opacity: f32,
    pub target: f32,
}

impl Default for Fade {
    fn default() -> Self {
        Self { opacity: 0.0, target: 1.0 }
    }
}

impl Fade {
    pub fn update(&mut self, dt: f32) {
        let step = FADE_SPEED * dt;
        if self.opacity < self.target {
            self.opacity = (self.opacity + step).min(self.target);
        } else {
            self.opacity = (self.opacity - step).max(self.target);
        }
    }

    #[cfg(test)]
    pub fn is_animating(&self) -> bool {
        self.opacity != self.target
    }
}

/// The image currently on screen.
#[cfg(feature = "window")]
pub struct Slide {
    pub reference: String,
    image: Texture2D,
}

#[cfg(feature = "window")]
impl Slide {
    pub fn new(reference: String, image: Texture2D) -> Self {
        Self { reference, image }
    }

    pub fn draw(&self, d: &mut RaylibDrawHandle, opacity: f32) {
        let screen_width = d.get_screen_width();
        let screen_height = d.get_screen_height();

        let tex_width = self.image.width() as f32;
        let tex_height = self.image.height() as f32;

        let scale = fit_scale(self.image.width(), self.image.height(), screen_width, screen_height);
        let scaled_width = tex_width * scale;
        let scaled_height = tex_height * scale;

        let draw_pos = Vector2::new(
            (screen_width as f32 - scaled_width) * 0.5,
            (screen_height as f32 - scaled_height) * 0.5,
        );

        d.draw_texture_pro(
            &self.image,
            Rectangle::new(0.0, 0.0, tex_width, tex_height), // Source rect uses original texture size
            Rectangle::new(draw_pos.x, draw_pos.y, scaled_width, scaled_height),
            Vector2::new(0.0, 0.0),
            0.0,
            Color::WHITE.fade(opacity.clamp(0.0, 1.0)),
        );
    }
}
