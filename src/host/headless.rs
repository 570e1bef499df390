use crate::error::HostError;
use crate::gl::HeadlessSurface;

use super::HostSurface;

/// Native stand-in for the widget's canvas element.
#[derive(Debug)]
pub struct HeadlessCanvas {
    surface: Option<HeadlessSurface>,
    offscreen: bool,
    attached: bool,
}

impl HeadlessCanvas {
    pub fn new(surface: HeadlessSurface) -> Self {
        Self {
            surface: Some(surface),
            offscreen: true,
            attached: true,
        }
    }

    /// Simulates an environment without canvas transfer.
    pub fn without_offscreen(mut self) -> Self {
        self.offscreen = false;
        self
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn is_transferred(&self) -> bool {
        self.surface.is_none()
    }
}

impl HostSurface for HeadlessCanvas {
    type Transfer = HeadlessSurface;

    fn supports_offscreen(&self) -> bool {
        self.offscreen
    }

    fn transfer_control(&mut self) -> Result<HeadlessSurface, HostError> {
        self.surface.take().ok_or(HostError::AlreadyTransferred)
    }

    fn remove(&mut self) -> Result<(), HostError> {
        self.attached = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_is_one_shot() {
        let mut canvas = HeadlessCanvas::new(HeadlessSurface::new(4, 4));
        assert!(canvas.transfer_control().is_ok());
        assert!(canvas.is_transferred());
        assert_eq!(
            canvas.transfer_control().unwrap_err(),
            HostError::AlreadyTransferred
        );
        canvas.remove().unwrap();
        canvas.remove().unwrap();
        assert!(!canvas.is_attached());
    }
}
