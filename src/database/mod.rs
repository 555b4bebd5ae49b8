pub(crate) mod connection;
pub(crate) mod payment_store;
