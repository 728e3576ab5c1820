pub mod cli;
pub mod terminal_surface;

pub use cli::Cli;
pub use terminal_surface::TerminalSurface;
