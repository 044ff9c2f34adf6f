pub mod images;
pub mod list;

pub use images::{GetSearchImagesError, GetSearchImagesQuery, SearchImagesResponse};
pub use list::{ListSearchesError, ListSearchesQuery};
