mod canvas;
mod layer;
mod popup;

pub use canvas::{
    create_canvas, BaseDetail, Canvas, ClickOutcome, Cursor, FeatureHit, View, HIT_TOLERANCE,
};
pub use layer::{Feature, Geometry, PopupContent, SharedLayer, VectorLayer};
pub use popup::{OpenPopup, PixelRect, Popup};
