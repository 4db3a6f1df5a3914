pub mod library_api;

pub use library_api::LocalLibraryApi;
