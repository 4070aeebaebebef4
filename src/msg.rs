use std::path::PathBuf;

/// All possible messages that drive a skin's state transitions.
#[derive(Debug)]
pub enum Msg {
    /// Update every measure once.
    Tick,
    /// A file next to (or being) the skin changed on disk.
    SkinChanged(PathBuf),
    Quit,
}
