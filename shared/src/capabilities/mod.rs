mod kv;
mod timer;

pub use self::kv::{decode_text, encode_text, KeyNamespace, KvError, KvKey, MAX_KEY_LENGTH, MAX_VALUE_SIZE};
pub use self::timer::{Timer, TimerOperation, TimerOutput};

pub use crux_core::render::Render;
pub use crux_kv::KeyValue;

use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub key_value: KeyValue<Event>,
    pub render: Render<Event>,
    pub timer: Timer<Event>,
}
