pub mod commands;
pub mod queries;
pub mod routes;

pub use commands::{
    RecordDownloadCommand, RecordDownloadError, RecordDownloadResponse, RunSearchCommand,
    RunSearchError,
};

pub use queries::{
    GetSearchImagesError, GetSearchImagesQuery, ListSearchesError, ListSearchesQuery,
    SearchImagesResponse,
};

pub use routes::searches_routes;
