mod document;
mod font;
mod image;
mod overlay;
mod page_index;

pub use document::{ImageHandle, PageSize, StampDocument, TextStyle};
pub use font::{FontHandle, encode_win_ansi, string_width, wrap_text};
pub use image::ImageFormat;
pub use overlay::TextColor;
pub use page_index::{PageIndex, PageSelector};
