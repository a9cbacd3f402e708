pub(crate) mod common;

mod identity;
