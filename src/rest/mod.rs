use serde::Serialize;

pub mod error;
pub mod goals;
pub mod semaforo;
pub mod status;
pub mod sync;

#[derive(Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Message {
        Message {
            message: message.into(),
        }
    }
}
