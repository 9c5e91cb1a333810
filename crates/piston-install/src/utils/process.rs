#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Extension for commands the installer spawns in the background.
pub trait QuietCommandExt {
    /// Hides the console window on Windows. No-op on other platforms.
    fn suppress_console(&mut self) -> &mut Self;
}

impl QuietCommandExt for tokio::process::Command {
    fn suppress_console(&mut self) -> &mut Self {
        #[cfg(windows)]
        {
            self.creation_flags(CREATE_NO_WINDOW);
        }
        self
    }
}
