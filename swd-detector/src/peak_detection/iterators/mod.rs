pub(crate) mod event;

pub(crate) use event::EventFilter;
