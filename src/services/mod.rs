pub(crate) mod payu;
