mod readings;

pub use readings::ReadingsRenderer;

use aq_core::render::Screen;
use il0373::FrameBuffer;

pub trait FrameRenderer {
    fn render(&mut self, screen: &Screen, frame: &mut FrameBuffer);
}
