use std::any::Any;

pub mod cancel;
pub mod frame;
pub mod tracker;

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        String::from(*message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("task panicked")
    }
}
