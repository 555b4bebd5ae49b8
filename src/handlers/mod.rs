pub(crate) mod extract;
pub(crate) mod payment_handlers;
