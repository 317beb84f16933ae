//! Control panel rendering seam.
//!
//! The panel state machine decides *what* is on screen; a [`PanelRenderer`]
//! draws it.  One container exists per playback session: `mount` replaces
//! any existing container, `unmount` removes it entirely.

use super::notice::Notice;

/// Button glyph derived from the panel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    /// Audio is playing; the button offers pause.
    Pause,
    /// Audio is paused; the button offers play.
    Play,
}

impl Glyph {
    pub fn symbol(&self) -> &'static str {
        match self {
            Glyph::Pause => "⏸",
            Glyph::Play => "▶",
        }
    }
}

pub trait PanelRenderer {
    /// Create the session container, replacing any existing one.
    fn mount(&mut self, glyph: Glyph, speed: f32);
    fn set_glyph(&mut self, glyph: Glyph);
    fn set_speed(&mut self, speed: f32);
    /// Remove the container entirely.
    fn unmount(&mut self);
    fn show_notice(&mut self, notice: &Notice);
    fn clear_notice(&mut self);
}

// ---------------------------------------------------------------------------
// LogRenderer
// ---------------------------------------------------------------------------

/// Renders the panel as log lines.  Used by the demo binary.
#[derive(Debug, Default)]
pub struct LogRenderer {
    mounted: bool,
}

impl PanelRenderer for LogRenderer {
    fn mount(&mut self, glyph: Glyph, speed: f32) {
        if self.mounted {
            log::info!("surface: [panel replaced]");
        }
        self.mounted = true;
        log::info!("surface: [{}  ■  {speed:.2}x]", glyph.symbol());
    }

    fn set_glyph(&mut self, glyph: Glyph) {
        log::info!("surface: [{}  ■]", glyph.symbol());
    }

    fn set_speed(&mut self, speed: f32) {
        log::info!("surface: [speed {speed:.2}x]");
    }

    fn unmount(&mut self) {
        if std::mem::take(&mut self.mounted) {
            log::info!("surface: [panel closed]");
        }
    }

    fn show_notice(&mut self, notice: &Notice) {
        match notice {
            Notice::Autoplay => log::info!("surface: ▶ Click to start listening"),
            Notice::Failure { title, message, .. } => {
                log::warn!("surface: {title}: {message}")
            }
        }
    }

    fn clear_notice(&mut self) {
        log::debug!("surface: notice cleared");
    }
}

// ---------------------------------------------------------------------------
// RecordingRenderer (test double)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod recording {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug, Default)]
    pub struct Screen {
        pub containers: usize,
        pub mounts: usize,
        pub glyph: Option<Glyph>,
        pub speed: Option<f32>,
        pub notice: Option<Notice>,
    }

    /// Renderer that keeps what would be on screen in a shared struct.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingRenderer {
        pub screen: Arc<Mutex<Screen>>,
    }

    impl RecordingRenderer {
        pub fn containers(&self) -> usize {
            self.screen.lock().unwrap().containers
        }

        pub fn glyph(&self) -> Option<Glyph> {
            self.screen.lock().unwrap().glyph
        }

        pub fn notice(&self) -> Option<Notice> {
            self.screen.lock().unwrap().notice.clone()
        }
    }

    impl PanelRenderer for RecordingRenderer {
        fn mount(&mut self, glyph: Glyph, speed: f32) {
            let mut s = self.screen.lock().unwrap();
            s.containers = 1;
            s.mounts += 1;
            s.glyph = Some(glyph);
            s.speed = Some(speed);
        }

        fn set_glyph(&mut self, glyph: Glyph) {
            self.screen.lock().unwrap().glyph = Some(glyph);
        }

        fn set_speed(&mut self, speed: f32) {
            self.screen.lock().unwrap().speed = Some(speed);
        }

        fn unmount(&mut self) {
            let mut s = self.screen.lock().unwrap();
            s.containers = 0;
            s.glyph = None;
        }

        fn show_notice(&mut self, notice: &Notice) {
            self.screen.lock().unwrap().notice = Some(notice.clone());
        }

        fn clear_notice(&mut self) {
            self.screen.lock().unwrap().notice = None;
        }
    }
}
