pub mod layer_panel;
pub mod map_view;
pub mod popup;
pub mod search_box;
