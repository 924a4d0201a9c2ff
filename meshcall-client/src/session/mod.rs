mod chat_log;
mod command;
mod handle;
mod local_media;
mod meeting_session;
mod view;

pub use chat_log::*;
pub use command::*;
pub use handle::*;
pub use local_media::*;
pub use meeting_session::*;
pub use view::*;
