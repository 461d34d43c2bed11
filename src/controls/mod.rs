//! Map controls: layer visibility, active filter and address search.

mod layers;
pub mod search;

pub use layers::{ActiveOnlyToggle, LayerEntry, LayerSwitcher};
pub use search::SearchControl;
