// clipboard.rs - System clipboard behind the + and * registers

#[cfg(feature = "clipboard")]
use arboard::Clipboard as ArboardClipboard;
use log::warn;

#[cfg(feature = "clipboard")]
enum State {
    Untried,
    Ready(ArboardClipboard),
    Unavailable,
}

/// Lazily connected system clipboard.
///
/// Connection happens on first use; a failed connection is remembered and
/// the registers fall back to their in-process slot.
pub struct SystemClipboard {
    #[cfg(feature = "clipboard")]
    state: State,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "clipboard")]
            state: State::Untried,
        }
    }

    #[cfg(feature = "clipboard")]
    fn inner(&mut self) -> Option<&mut ArboardClipboard> {
        if matches!(self.state, State::Untried) {
            self.state = match ArboardClipboard::new() {
                Ok(clipboard) => State::Ready(clipboard),
                Err(e) => {
                    warn!("System clipboard unavailable: {}", e);
                    State::Unavailable
                }
            };
        }
        match &mut self.state {
            State::Ready(clipboard) => Some(clipboard),
            _ => None,
        }
    }

    /// Get text content from clipboard
    #[cfg(feature = "clipboard")]
    pub fn get_text(&mut self) -> Option<String> {
        self.inner()?.get_text().ok()
    }

    #[cfg(not(feature = "clipboard"))]
    pub fn get_text(&mut self) -> Option<String> {
        None
    }

    /// Set text content to clipboard
    #[cfg(feature = "clipboard")]
    pub fn set_text(&mut self, text: &str) {
        if let Some(clipboard) = self.inner()
            && let Err(e) = clipboard.set_text(text)
        {
            warn!("Failed to set clipboard text: {}", e);
        }
    }

    #[cfg(not(feature = "clipboard"))]
    pub fn set_text(&mut self, _text: &str) {}

    pub fn is_available(&mut self) -> bool {
        #[cfg(feature = "clipboard")]
        {
            self.inner().is_some()
        }
        #[cfg(not(feature = "clipboard"))]
        {
            warn!("Built without clipboard support");
            false
        }
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SystemClipboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemClipboard").finish_non_exhaustive()
    }
}
