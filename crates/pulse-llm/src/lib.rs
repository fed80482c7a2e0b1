pub mod command;
pub mod http;
pub mod mock;

pub use command::CommandClient;
pub use http::HttpChatClient;
pub use mock::{MockClient, MockResponse};
