mod url;

pub use url::{ErrorResponse, ShortenRequest, ShortenResponse};
