mod app;
mod widgets;

pub use app::TuiApp;
